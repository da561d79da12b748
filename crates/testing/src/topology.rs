//! Declarative seed data for a [`MemoryDriver`]

use crate::driver::MemoryDriver;
use mage_core::{
    ClusterName, ContactPoints, Error, Keyspace, Result, Row, TenantId, TenantRecord,
    CLUSTER_NAME_DEFAULT, CONTACT_POINTS_DEFAULT, KEYSPACE_DEFAULT, TENANTS_TABLE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Keyspaces, tables, rows and tenants to load into a driver.
///
/// ```json
/// {
///   "admin_keyspace": "mage_system",
///   "tenants": [
///     { "identifier": "test", "cluster_name": "mage_staging_cluster",
///       "contact_points": "127.0.0.1", "keyspace_name": "mage_test" }
///   ],
///   "keyspaces": { "mage_test": { "samples": {} } },
///   "unreachable": ["10.0.0.1"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topology {
    pub admin_keyspace: String,
    pub tenants: Vec<TenantRecord>,
    /// keyspace -> table -> primary key -> row
    pub keyspaces: BTreeMap<String, BTreeMap<String, BTreeMap<String, Row>>>,
    pub unreachable: Vec<String>,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            admin_keyspace: KEYSPACE_DEFAULT.to_string(),
            tenants: Vec::new(),
            keyspaces: BTreeMap::new(),
            unreachable: Vec::new(),
        }
    }
}

impl Topology {
    /// Read a topology from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("failed to read topology {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid topology {}: {e}", path.display()))
        })
    }

    /// The admin keyspace with one tenant `test` whose keyspace `mage_test`
    /// holds an empty `samples` table
    pub fn standard() -> Result<Self> {
        let test = TenantRecord::new(
            TenantId::new("test")?,
            ClusterName::new(CLUSTER_NAME_DEFAULT)?,
            ContactPoints::new(CONTACT_POINTS_DEFAULT)?,
            Keyspace::new("mage_test")?,
        );

        let mut keyspaces = BTreeMap::new();
        keyspaces.insert(
            "mage_test".to_string(),
            BTreeMap::from([("samples".to_string(), BTreeMap::new())]),
        );

        Ok(Self {
            tenants: vec![test],
            keyspaces,
            ..Self::default()
        })
    }

    /// Load everything into `driver`
    pub fn apply(&self, driver: &MemoryDriver) -> Result<()> {
        driver.create_table(&self.admin_keyspace, TENANTS_TABLE);
        for tenant in &self.tenants {
            driver.add_tenant(&self.admin_keyspace, tenant)?;
        }
        for (keyspace, tables) in &self.keyspaces {
            driver.create_keyspace(keyspace);
            for (table, rows) in tables {
                driver.create_table(keyspace, table);
                for (key, row) in rows {
                    driver.insert_row(keyspace, table, key, row.clone());
                }
            }
        }
        for host in &self.unreachable {
            driver.set_unreachable(host);
        }

        tracing::debug!(
            admin_keyspace = %self.admin_keyspace,
            tenants = self.tenants.len(),
            keyspaces = self.keyspaces.len(),
            "seeded in-memory driver"
        );
        Ok(())
    }

    /// A fresh driver holding this topology
    pub fn build_driver(&self) -> Result<MemoryDriver> {
        let driver = MemoryDriver::new();
        self.apply(&driver)?;
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_standard_topology() {
        let driver = Topology::standard().unwrap().build_driver().unwrap();

        let tenant = driver.row("mage_system", TENANTS_TABLE, "test").unwrap();
        assert_eq!(tenant["cluster_name"], "mage_staging_cluster");
        assert!(driver.row("mage_test", "samples", "missing").is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "tenants": [{{
                    "identifier": "acme",
                    "cluster_name": "prod",
                    "contact_points": "10.0.0.1,10.0.0.2",
                    "keyspace_name": "acme_data"
                }}],
                "keyspaces": {{"acme_data": {{"samples": {{"1": {{"identifier": "1", "content": "x"}}}}}}}},
                "unreachable": ["10.0.0.1"]
            }}"#
        )
        .unwrap();

        let topology = Topology::from_file(file.path()).unwrap();
        assert_eq!(topology.admin_keyspace, "mage_system");
        assert_eq!(topology.tenants[0].keyspace.as_str(), "acme_data");

        let driver = topology.build_driver().unwrap();
        assert_eq!(driver.row("acme_data", "samples", "1").unwrap()["content"], "x");
        assert!(driver.row("mage_system", TENANTS_TABLE, "acme").is_some());
    }

    #[test]
    fn test_invalid_file_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = Topology::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
