//! Tenant routing records

use super::newtypes::{ClusterName, ContactPoints, Keyspace, TenantId};
use serde::{Deserialize, Serialize};

/// Where a tenant's data lives.
///
/// A read-only projection of one row of the admin `tenants` table. The field
/// names match the table's column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub identifier: TenantId,
    pub cluster_name: ClusterName,
    pub contact_points: ContactPoints,
    #[serde(rename = "keyspace_name")]
    pub keyspace: Keyspace,
}

impl TenantRecord {
    pub fn new(
        identifier: TenantId,
        cluster_name: ClusterName,
        contact_points: ContactPoints,
        keyspace: Keyspace,
    ) -> Self {
        Self {
            identifier,
            cluster_name,
            contact_points,
            keyspace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_uses_column_names() {
        let record: TenantRecord = serde_json::from_value(json!({
            "identifier": "test",
            "cluster_name": "mage_staging_cluster",
            "contact_points": "127.0.0.1,127.0.0.2,127.0.0.3",
            "keyspace_name": "mage_test",
        }))
        .unwrap();

        assert_eq!(record.keyspace.as_str(), "mage_test");
        assert_eq!(record.contact_points.hosts().len(), 3);
    }

    #[test]
    fn test_record_with_blank_keyspace_is_rejected() {
        let parsed = serde_json::from_value::<TenantRecord>(json!({
            "identifier": "test",
            "cluster_name": "mage_staging_cluster",
            "contact_points": "127.0.0.1",
            "keyspace_name": " ",
        }));
        assert!(parsed.is_err());
    }
}
