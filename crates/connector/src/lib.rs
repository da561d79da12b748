//! Tenant-aware access to a clustered database
//!
//! Every tenant is routed to its own cluster and keyspace through the
//! `tenants` table of an admin keyspace. Cluster handles, sessions and typed
//! mappers are built on first use and shared afterwards.
//!
//! ```no_run
//! # async fn demo(driver: std::sync::Arc<dyn mage_core::ClusterDriver>) -> mage_core::Result<()> {
//! use mage_config::ConnectorSettings;
//! use mage_connector::Connector;
//! use mage_core::TenantContext;
//!
//! let connector = Connector::builder(ConnectorSettings::default())
//!     .driver(driver)
//!     .build()
//!     .await?;
//!
//! TenantContext::with_tenant("test".parse()?, async {
//!     let session = connector.provider().current_tenant_session().await?;
//!     println!("{}", session.keyspace());
//!     Ok::<_, mage_core::Error>(())
//! })
//! .await?;
//!
//! connector.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod connector;
pub mod mapper_cache;
pub mod mapping;
pub mod provider;
pub mod registry;
pub mod template;

pub use connector::{Connector, ConnectorBuilder};
pub use mapper_cache::MapperCache;
pub use mapping::{Entity, Mapper, MapperOptions, MappingManager};
pub use provider::{AdminRoute, SessionProvider};
pub use registry::{AdminTenantRegistry, TenantRegistry};
pub use template::EntityTemplate;
