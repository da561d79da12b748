//! Per tenant and entity type mapper cache

use crate::mapping::{Entity, Mapper, MappingManager};
use crate::provider::SessionProvider;
use mage_cache::{ConsistencyOptionCache, OnceMap, StatsSnapshot};
use mage_core::{Error, Result, TenantContext, TenantId};
use std::any::{Any, TypeId};
use std::sync::Arc;

type AnyMapper = Arc<dyn Any + Send + Sync>;

/// Exactly one mapper per (tenant, entity type).
///
/// Mappers carry the configured read, write and delete options. Each tenant's
/// [`MappingManager`] is cached once and shared by all of its mappers.
pub struct MapperCache {
    provider: Arc<SessionProvider>,
    consistency: Arc<ConsistencyOptionCache>,
    managers: OnceMap<TenantId, MappingManager>,
    mappers: OnceMap<(TenantId, TypeId), AnyMapper>,
}

impl MapperCache {
    pub fn new(provider: Arc<SessionProvider>, consistency: Arc<ConsistencyOptionCache>) -> Self {
        Self {
            provider,
            consistency,
            managers: OnceMap::new(),
            mappers: OnceMap::new(),
        }
    }

    /// The mapper for `T` and the tenant of the current [`TenantContext`]
    pub async fn get<T: Entity>(&self) -> Result<Arc<Mapper<T>>> {
        let identifier = TenantContext::require()?;
        self.mapper_for(&identifier).await
    }

    /// The mapper for `T` and `identifier`
    pub async fn get_for<T: Entity>(&self, identifier: &str) -> Result<Arc<Mapper<T>>> {
        let identifier = TenantId::new(identifier)?;
        self.mapper_for(&identifier).await
    }

    pub async fn mapper_for<T: Entity>(&self, identifier: &TenantId) -> Result<Arc<Mapper<T>>> {
        let key = (identifier.clone(), TypeId::of::<T>());
        let mapper = self
            .mappers
            .get_or_try_init(&key, || async {
                let options = self.consistency.options()?;
                let manager = self.manager(identifier).await?;

                tracing::info!(
                    tenant = %identifier,
                    entity = T::entity_name(),
                    keyspace = %manager.session().keyspace(),
                    "creating mapper"
                );
                let mapper = manager
                    .mapper::<T>()
                    .await?
                    .with_get_options(options.read)
                    .with_save_options(options.write)
                    .with_delete_options(options.delete);
                Ok(Arc::new(mapper) as AnyMapper)
            })
            .await?;

        mapper.downcast::<Mapper<T>>().map_err(|_| {
            Error::mapping(T::entity_name(), "cached mapper has a different entity type")
        })
    }

    async fn manager(&self, identifier: &TenantId) -> Result<MappingManager> {
        self.managers
            .get_or_try_init(identifier, || async {
                let session = self.provider.session_for(identifier).await?;
                Ok(MappingManager::new(session))
            })
            .await
    }

    /// Number of cached mappers
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Number of cached per-tenant mapping managers
    pub fn managers(&self) -> usize {
        self.managers.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.mappers.stats().snapshot()
    }

    /// Forget every mapper and mapping manager
    pub fn clear(&self) {
        let mappers = self.mappers.drain().len();
        let managers = self.managers.drain().len();
        tracing::debug!(mappers, managers, "mapper cache cleared");
    }
}
