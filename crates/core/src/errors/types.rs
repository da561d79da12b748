//! Core error type definitions

use std::sync::Arc;

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Underlying driver failure, shareable between every caller waiting on the
/// same construction attempt.
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Core error type for connector operations
///
/// The type is `Clone` so that a single failed construction can be reported
/// to every caller that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Required settings missing or malformed
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Blank identifiers, cluster names, contact points or keyspaces
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The tenant registry holds no record for this identifier
    #[error("tenant '{identifier}' unknown")]
    UnknownTenant { identifier: String },

    /// An ambient lookup was used but no tenant identifier is set
    #[error("missing tenant context: {message}")]
    MissingTenantContext { message: String },

    /// Building a cluster handle failed
    #[error("could not connect to cluster '{target}': {message}")]
    Connectivity {
        target: String,
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    /// Connecting a session to a keyspace failed
    #[error("keyspace '{keyspace}' unavailable: {message}")]
    KeyspaceUnavailable {
        keyspace: String,
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    /// The entity's table does not exist in the session keyspace
    #[error("entity '{entity}' is not mapped in keyspace '{keyspace}'")]
    UnmappedEntity { entity: String, keyspace: String },

    /// Row to entity conversion failed
    #[error("failed to map entity '{entity}': {message}")]
    Mapping { entity: String, message: String },

    /// A fetch, save or delete failed inside the driver
    #[error("{operation} failed: {message}")]
    Query { operation: String, message: String },
}
