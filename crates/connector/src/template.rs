//! Entity operations for the current tenant

use crate::mapper_cache::MapperCache;
use crate::mapping::Entity;
use mage_core::Result;
use std::sync::Arc;

/// Saves, finds and deletes entities of the tenant in the current
/// [`mage_core::TenantContext`]
#[derive(Clone)]
pub struct EntityTemplate {
    mappers: Arc<MapperCache>,
}

impl EntityTemplate {
    pub fn new(mappers: Arc<MapperCache>) -> Self {
        Self { mappers }
    }

    pub async fn save<T: Entity>(&self, entity: &T) -> Result<()> {
        self.mappers.get::<T>().await?.save(entity).await
    }

    pub async fn find_by_id<T: Entity>(&self, key: &str) -> Result<Option<T>> {
        self.mappers.get::<T>().await?.get(key).await
    }

    /// Delete `entity`, returning whether a row was removed
    pub async fn delete<T: Entity>(&self, entity: &T) -> Result<bool> {
        self.mappers.get::<T>().await?.delete(entity).await
    }
}
