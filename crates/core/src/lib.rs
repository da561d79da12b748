//! Core domain types, errors and collaborator contracts for the mage
//! tenant connector.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every crate.
//! - **`types`**: validated names used as cache keys, tenant records and
//!   consistency levels.
//! - **`driver`**: the traits a clustered database driver implements.
//! - **`context`**: the task-scoped current tenant.
//! - **`constants`**: configuration keys and defaults.

pub mod constants;
pub mod context;
pub mod driver;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    context::TenantContext,
    driver::{Cluster, ClusterDriver, ClusterSpec, Row, Session},
    errors::{Error, Result, ResultExt, SharedSource, Validate},
    types::*,
};
