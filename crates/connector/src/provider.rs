//! Admin and tenant session access
//!
//! [`SessionProvider`] resolves where a session should point and leaves the
//! building to the [`SessionCache`]. The admin route comes from settings; a
//! tenant route comes from the [`TenantRegistry`], which by default reads the
//! admin keyspace.

use crate::mapping::MappingManager;
use crate::registry::{AdminTenantRegistry, TenantRegistry};
use mage_cache::{ConsistencyOptionCache, SessionCache};
use mage_config::AdminSettings;
use mage_core::{
    ClusterName, ContactPoints, Error, Keyspace, Port, Result, Session, TenantContext, TenantId,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Where the admin keyspace lives. Unset parts make admin access fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminRoute {
    pub cluster_name: Option<ClusterName>,
    pub contact_points: Option<ContactPoints>,
    pub port: Port,
    pub keyspace: Option<Keyspace>,
}

impl AdminRoute {
    /// Blank settings count as unset; malformed ones are rejected
    pub fn from_settings(settings: &AdminSettings) -> Result<Self> {
        fn optional<T>(raw: &str, parse: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
            if raw.trim().is_empty() {
                Ok(None)
            } else {
                parse().map(Some)
            }
        }

        Ok(Self {
            cluster_name: optional(&settings.cluster_name, || settings.cluster_name())?,
            contact_points: optional(&settings.contact_points, || settings.contact_points())?,
            port: settings.port()?,
            keyspace: optional(&settings.keyspace, || settings.keyspace())?,
        })
    }

    fn require(&self) -> Result<(&ClusterName, &ContactPoints, &Keyspace)> {
        match (&self.cluster_name, &self.contact_points, &self.keyspace) {
            (Some(cluster), Some(points), Some(keyspace)) => Ok((cluster, points, keyspace)),
            _ => Err(Error::configuration(
                "cluster name, contact points and keyspace must be set to open the admin session",
            )),
        }
    }
}

/// A lazily built value that shutdown can forget
struct ResettableCell<T> {
    cell: Mutex<Arc<OnceCell<T>>>,
}

impl<T: Clone> ResettableCell<T> {
    fn new() -> Self {
        Self {
            cell: Mutex::new(Arc::new(OnceCell::new())),
        }
    }

    async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cell = Arc::clone(&self.cell.lock());
        cell.get_or_try_init(init).await.cloned()
    }

    fn reset(&self) -> bool {
        let previous = std::mem::replace(&mut *self.cell.lock(), Arc::new(OnceCell::new()));
        previous.initialized()
    }
}

/// Hands out admin and tenant sessions
pub struct SessionProvider {
    sessions: Arc<SessionCache>,
    consistency: Arc<ConsistencyOptionCache>,
    admin: AdminRoute,
    admin_manager: ResettableCell<MappingManager>,
    registry: Option<Arc<dyn TenantRegistry>>,
    admin_registry: ResettableCell<Arc<AdminTenantRegistry>>,
}

impl SessionProvider {
    pub fn new(
        sessions: Arc<SessionCache>,
        consistency: Arc<ConsistencyOptionCache>,
        admin: AdminRoute,
    ) -> Self {
        Self {
            sessions,
            consistency,
            admin,
            admin_manager: ResettableCell::new(),
            registry: None,
            admin_registry: ResettableCell::new(),
        }
    }

    /// Resolve tenants through `registry` instead of the admin keyspace
    pub fn with_registry(mut self, registry: Arc<dyn TenantRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionCache> {
        &self.sessions
    }

    /// The session on the admin keyspace
    pub async fn admin_session(&self) -> Result<Arc<dyn Session>> {
        let (cluster, points, keyspace) = self.admin.require()?;
        self.sessions
            .get_or_create(cluster, points, self.admin.port, keyspace)
            .await
    }

    /// Open the admin session now, so misconfiguration shows at startup
    pub async fn touch_admin_session(&self) -> Result<()> {
        let session = self.admin_session().await?;
        tracing::info!(keyspace = %session.keyspace(), "admin session ready");
        Ok(())
    }

    /// The mapping manager on the admin session, built once
    pub async fn admin_mapping_manager(&self) -> Result<MappingManager> {
        self.admin_manager
            .get_or_try_init(|| async {
                let session = self.admin_session().await?;
                Ok(MappingManager::new(session))
            })
            .await
    }

    /// The session for the tenant set in the current [`TenantContext`]
    pub async fn current_tenant_session(&self) -> Result<Arc<dyn Session>> {
        let identifier = TenantContext::require()?;
        self.session_for(&identifier).await
    }

    /// The session for `identifier`
    pub async fn tenant_session(&self, identifier: &str) -> Result<Arc<dyn Session>> {
        let identifier = TenantId::new(identifier)?;
        self.session_for(&identifier).await
    }

    /// The session for an already validated tenant.
    ///
    /// Tenant routes carry no port; the admin port is used.
    pub async fn session_for(&self, identifier: &TenantId) -> Result<Arc<dyn Session>> {
        let record = self.lookup(identifier).await?;
        self.sessions
            .get_or_create(
                &record.cluster_name,
                &record.contact_points,
                self.admin.port,
                &record.keyspace,
            )
            .await
    }

    /// A session from raw, unvalidated route parts
    pub async fn get_session(
        &self,
        cluster_name: &str,
        contact_points: &str,
        keyspace: &str,
    ) -> Result<Arc<dyn Session>> {
        let cluster_name = ClusterName::new(cluster_name)?;
        let contact_points = ContactPoints::new(contact_points)?;
        let keyspace = Keyspace::new(keyspace)?;
        self.sessions
            .get_or_create(&cluster_name, &contact_points, self.admin.port, &keyspace)
            .await
    }

    async fn lookup(&self, identifier: &TenantId) -> Result<mage_core::TenantRecord> {
        if let Some(registry) = &self.registry {
            return registry.lookup(identifier).await;
        }

        let registry = self
            .admin_registry
            .get_or_try_init(|| async {
                let manager = self.admin_mapping_manager().await?;
                let read = self.consistency.read_option()?;
                AdminTenantRegistry::new(&manager, read).await.map(Arc::new)
            })
            .await?;
        registry.lookup(identifier).await
    }

    /// Close every session, then every cluster handle, and forget them.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        tracing::info!("closing cluster connections");
        let sessions = self.sessions.close_all().await;
        let clusters = self.sessions.clusters().close_all().await;
        self.admin_registry.reset();
        let manager = self.admin_manager.reset();
        tracing::info!(
            sessions,
            clusters,
            admin_manager = manager,
            "session provider shut down"
        );
    }
}
