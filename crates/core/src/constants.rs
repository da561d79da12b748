//! Configuration keys and defaults shared by the connector crates

// Property names, as accepted in configuration files
pub const CLUSTER_NAME_PROP: &str = "lab.mage.connector.clustername";
pub const CONTACT_POINTS_PROP: &str = "lab.mage.connector.contactpoints";
pub const PORT_PROP: &str = "lab.mage.connector.port";
pub const KEYSPACE_PROP: &str = "lab.mage.connector.keyspace";
pub const CONSISTENCY_LEVEL_READ_PROP: &str = "lab.mage.connector.cl.read";
pub const CONSISTENCY_LEVEL_WRITE_PROP: &str = "lab.mage.connector.cl.write";
pub const CONSISTENCY_LEVEL_DELETE_PROP: &str = "lab.mage.connector.cl.delete";

// Environment variable names
pub const CONFIG_FILE_VAR: &str = "MAGE_CONNECTOR_CONFIG";
pub const CLUSTER_NAME_VAR: &str = "MAGE_CONNECTOR_CLUSTER_NAME";
pub const CONTACT_POINTS_VAR: &str = "MAGE_CONNECTOR_CONTACT_POINTS";
pub const PORT_VAR: &str = "MAGE_CONNECTOR_PORT";
pub const KEYSPACE_VAR: &str = "MAGE_CONNECTOR_KEYSPACE";
pub const CONSISTENCY_LEVEL_READ_VAR: &str = "MAGE_CONNECTOR_CL_READ";
pub const CONSISTENCY_LEVEL_WRITE_VAR: &str = "MAGE_CONNECTOR_CL_WRITE";
pub const CONSISTENCY_LEVEL_DELETE_VAR: &str = "MAGE_CONNECTOR_CL_DELETE";

// Defaults
pub const CLUSTER_NAME_DEFAULT: &str = "mage_staging_cluster";
pub const CONTACT_POINTS_DEFAULT: &str = "127.0.0.1,127.0.0.2,127.0.0.3";
pub const PORT_DEFAULT: u16 = 9042;
pub const KEYSPACE_DEFAULT: &str = "mage_system";
pub const CONSISTENCY_LEVEL_DEFAULT: &str = "LOCAL_QUORUM";

// Admin keyspace layout
pub const TENANTS_TABLE: &str = "tenants";
