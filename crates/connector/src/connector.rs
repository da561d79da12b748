//! Wiring of caches, provider and template

use crate::mapper_cache::MapperCache;
use crate::provider::{AdminRoute, SessionProvider};
use crate::registry::TenantRegistry;
use crate::template::EntityTemplate;
use mage_cache::{ClusterConnectionCache, ConsistencyOptionCache, SessionCache};
use mage_config::ConnectorSettings;
use mage_core::{ClusterDriver, Error, Result};
use std::sync::Arc;

/// Builds a [`Connector`] from settings and a driver
pub struct ConnectorBuilder {
    settings: ConnectorSettings,
    driver: Option<Arc<dyn ClusterDriver>>,
    registry: Option<Arc<dyn TenantRegistry>>,
    touch_admin_session: bool,
}

impl ConnectorBuilder {
    pub fn driver(mut self, driver: Arc<dyn ClusterDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Resolve tenants through `registry` instead of the admin keyspace
    pub fn registry(mut self, registry: Arc<dyn TenantRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Open the admin session while building. On by default.
    pub fn touch_admin_session(mut self, touch: bool) -> Self {
        self.touch_admin_session = touch;
        self
    }

    pub async fn build(self) -> Result<Connector> {
        let driver = self
            .driver
            .ok_or_else(|| Error::configuration("a cluster driver must be given"))?;
        let admin = AdminRoute::from_settings(&self.settings.admin)?;

        let clusters = Arc::new(ClusterConnectionCache::new(driver));
        let sessions = Arc::new(SessionCache::new(clusters));
        let consistency = Arc::new(ConsistencyOptionCache::new(
            self.settings.consistency.clone(),
        ));

        let mut provider = SessionProvider::new(sessions, Arc::clone(&consistency), admin);
        if let Some(registry) = self.registry {
            provider = provider.with_registry(registry);
        }
        let provider = Arc::new(provider);
        let mappers = Arc::new(MapperCache::new(
            Arc::clone(&provider),
            Arc::clone(&consistency),
        ));

        let connector = Connector {
            settings: self.settings,
            consistency,
            template: EntityTemplate::new(Arc::clone(&mappers)),
            provider,
            mappers,
        };

        if self.touch_admin_session {
            connector.provider.touch_admin_session().await?;
        }
        tracing::info!(
            cluster = %connector.settings.admin.cluster_name,
            keyspace = %connector.settings.admin.keyspace,
            "connector ready"
        );
        Ok(connector)
    }
}

/// Entry point owning every cache of one connector instance
pub struct Connector {
    settings: ConnectorSettings,
    consistency: Arc<ConsistencyOptionCache>,
    provider: Arc<SessionProvider>,
    mappers: Arc<MapperCache>,
    template: EntityTemplate,
}

impl Connector {
    pub fn builder(settings: ConnectorSettings) -> ConnectorBuilder {
        ConnectorBuilder {
            settings,
            driver: None,
            registry: None,
            touch_admin_session: true,
        }
    }

    pub fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    pub fn consistency(&self) -> &Arc<ConsistencyOptionCache> {
        &self.consistency
    }

    pub fn provider(&self) -> &Arc<SessionProvider> {
        &self.provider
    }

    pub fn mappers(&self) -> &Arc<MapperCache> {
        &self.mappers
    }

    pub fn template(&self) -> &EntityTemplate {
        &self.template
    }

    /// Close sessions, then clusters, then forget every cached value.
    ///
    /// Safe to call more than once; the connector rebuilds lazily if used
    /// afterwards.
    pub async fn shutdown(&self) {
        self.provider.shutdown().await;
        self.mappers.clear();
    }
}
