//! Connector settings
//!
//! Values are kept as configured. Admin route fields are validated when the
//! route is requested; consistency level names are parsed by the option
//! cache so that a bad name surfaces the first time an option is needed.

use mage_core::constants::{
    CLUSTER_NAME_DEFAULT, CONSISTENCY_LEVEL_DEFAULT, CONTACT_POINTS_DEFAULT, KEYSPACE_DEFAULT,
    PORT_DEFAULT,
};
use mage_core::{ClusterName, ContactPoints, Keyspace, Port, Result};
use serde::{Deserialize, Serialize};

/// All settings consumed by the connector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    pub admin: AdminSettings,
    pub consistency: ConsistencySettings,
}

/// Where the admin keyspace holding the tenant registry lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub cluster_name: String,
    pub contact_points: String,
    pub port: u16,
    pub keyspace: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            cluster_name: CLUSTER_NAME_DEFAULT.to_string(),
            contact_points: CONTACT_POINTS_DEFAULT.to_string(),
            port: PORT_DEFAULT,
            keyspace: KEYSPACE_DEFAULT.to_string(),
        }
    }
}

impl AdminSettings {
    pub fn cluster_name(&self) -> Result<ClusterName> {
        ClusterName::new(self.cluster_name.clone())
    }

    pub fn contact_points(&self) -> Result<ContactPoints> {
        ContactPoints::new(self.contact_points.clone())
    }

    pub fn port(&self) -> Result<Port> {
        Port::new(self.port)
    }

    pub fn keyspace(&self) -> Result<Keyspace> {
        Keyspace::new(self.keyspace.clone())
    }
}

/// Consistency level names per operation kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencySettings {
    pub read: String,
    pub write: String,
    pub delete: String,
}

impl Default for ConsistencySettings {
    fn default() -> Self {
        Self {
            read: CONSISTENCY_LEVEL_DEFAULT.to_string(),
            write: CONSISTENCY_LEVEL_DEFAULT.to_string(),
            delete: CONSISTENCY_LEVEL_DEFAULT.to_string(),
        }
    }
}

impl ConsistencySettings {
    /// The same level for every operation kind
    pub fn uniform(level: impl Into<String>) -> Self {
        let level = level.into();
        Self {
            read: level.clone(),
            write: level.clone(),
            delete: level,
        }
    }
}
