//! Lazy caches for the mage tenant connector
//!
//! Every cache here builds a value the first time a key is asked for and
//! hands the same value to every later caller:
//!
//! - [`ClusterConnectionCache`]: cluster name to cluster handle
//! - [`SessionCache`]: keyspace to session, opened through the cluster cache
//! - [`ConsistencyOptionCache`]: read/write/delete mapper options
//!
//! The keyed caches are built on [`OnceMap`], which runs at most one
//! construction per key and never caches a failure.

pub mod cluster;
pub mod consistency;
pub mod once_map;
pub mod session;
pub mod stats;

pub use cluster::ClusterConnectionCache;
pub use consistency::{ConsistencyOptionCache, ConsistencyOptions};
pub use once_map::{Init, OnceMap};
pub use session::SessionCache;
pub use stats::{CacheStats, StatsSnapshot};
