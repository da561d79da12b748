//! Builder methods for creating errors with context

use super::types::{Error, SharedSource};

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error for a named field
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create an unknown tenant error
    #[must_use]
    pub fn unknown_tenant(identifier: impl Into<String>) -> Self {
        Error::UnknownTenant {
            identifier: identifier.into(),
        }
    }

    /// Create a missing tenant context error
    #[must_use]
    pub fn missing_tenant_context(message: impl Into<String>) -> Self {
        Error::MissingTenantContext {
            message: message.into(),
        }
    }

    /// Create a connectivity error
    #[must_use]
    pub fn connectivity(target: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Connectivity {
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a connectivity error wrapping a driver failure
    #[must_use]
    pub fn connectivity_with_source(
        target: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connectivity {
            target: target.into(),
            message: message.into(),
            source: Some(SharedSource::from(source.into())),
        }
    }

    /// Create a keyspace unavailable error
    #[must_use]
    pub fn keyspace_unavailable(keyspace: impl Into<String>, message: impl Into<String>) -> Self {
        Error::KeyspaceUnavailable {
            keyspace: keyspace.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a keyspace unavailable error wrapping a driver failure
    #[must_use]
    pub fn keyspace_unavailable_with_source(
        keyspace: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::KeyspaceUnavailable {
            keyspace: keyspace.into(),
            message: message.into(),
            source: Some(SharedSource::from(source.into())),
        }
    }

    /// Create an unmapped entity error
    #[must_use]
    pub fn unmapped_entity(entity: impl Into<String>, keyspace: impl Into<String>) -> Self {
        Error::UnmappedEntity {
            entity: entity.into(),
            keyspace: keyspace.into(),
        }
    }

    /// Create a mapping error
    #[must_use]
    pub fn mapping(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Mapping {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a query error
    #[must_use]
    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether a later call with the same input may succeed.
    ///
    /// Only driver-side failures qualify; the core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Connectivity { .. } | Error::KeyspaceUnavailable { .. } | Error::Query { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::unknown_tenant("acme").to_string(),
            "tenant 'acme' unknown"
        );
        assert_eq!(
            Error::validation("keyspace", "must not be blank").to_string(),
            "invalid keyspace: must not be blank"
        );
        assert_eq!(
            Error::keyspace_unavailable("unknown_keyspace", "does not exist").to_string(),
            "keyspace 'unknown_keyspace' unavailable: does not exist"
        );
    }

    #[test]
    fn test_source_is_preserved_across_clones() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::connectivity_with_source("mage_staging_cluster", "build failed", io);
        let cloned = err.clone();

        let source = cloned.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("refused"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::connectivity("c", "down").is_retryable());
        assert!(Error::keyspace_unavailable("k", "missing").is_retryable());
        assert!(!Error::configuration("unset").is_retryable());
        assert!(!Error::unknown_tenant("t").is_retryable());
        assert!(!Error::missing_tenant_context("unset").is_retryable());
    }
}
