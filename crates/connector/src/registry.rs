//! Tenant identifier to route lookup

use crate::mapping::{Entity, Mapper, MappingManager};
use async_trait::async_trait;
use mage_core::{
    ClusterName, ContactPoints, Error, Keyspace, MapperOption, Result, TenantId, TenantRecord,
    TENANTS_TABLE,
};
use serde::{Deserialize, Serialize};

/// Resolves a tenant to the cluster and keyspace holding its data
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// The route for `identifier`, or [`Error::UnknownTenant`]
    async fn lookup(&self, identifier: &TenantId) -> Result<TenantRecord>;
}

/// Stored shape of a `tenants` row.
///
/// Kept as plain strings so that blank columns surface as validation errors
/// naming the column rather than as a generic mapping failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TenantRow {
    identifier: String,
    cluster_name: String,
    contact_points: String,
    keyspace_name: String,
}

impl Entity for TenantRow {
    const TABLE: &'static str = TENANTS_TABLE;

    fn primary_key(&self) -> String {
        self.identifier.clone()
    }

    fn entity_name() -> &'static str {
        "TenantRecord"
    }
}

impl TenantRow {
    fn into_record(self) -> Result<TenantRecord> {
        Ok(TenantRecord::new(
            TenantId::new(self.identifier)?,
            ClusterName::new(self.cluster_name)?,
            ContactPoints::new(self.contact_points)?,
            Keyspace::new(self.keyspace_name)?,
        ))
    }
}

/// Registry backed by the `tenants` table of the admin keyspace
#[derive(Debug, Clone)]
pub struct AdminTenantRegistry {
    tenants: Mapper<TenantRow>,
}

impl AdminTenantRegistry {
    /// Bind to the admin keyspace; reads use `read_option`
    pub async fn new(admin: &MappingManager, read_option: MapperOption) -> Result<Self> {
        let tenants = admin
            .mapper::<TenantRow>()
            .await?
            .with_get_options(read_option);
        Ok(Self { tenants })
    }
}

#[async_trait]
impl TenantRegistry for AdminTenantRegistry {
    async fn lookup(&self, identifier: &TenantId) -> Result<TenantRecord> {
        let row = self
            .tenants
            .get(identifier.as_str())
            .await?
            .ok_or_else(|| Error::unknown_tenant(identifier.as_str()))?;

        let record = row.into_record()?;
        tracing::debug!(
            tenant = %identifier,
            cluster = %record.cluster_name,
            keyspace = %record.keyspace,
            "resolved tenant"
        );
        Ok(record)
    }
}
