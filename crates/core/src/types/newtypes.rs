//! Validated newtypes for every value used as a cache key
//!
//! Blank names never reach a cache: each wrapper trims surrounding
//! whitespace and rejects empty or whitespace-only input on construction,
//! so `" mage_test"` and `"mage_test"` are the same key.

use crate::errors::{Error, Result, Validate};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::str::FromStr;

macro_rules! validated_name {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new value, trimmed, rejecting blank input
            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                let trimmed = value.trim();
                Validate::not_blank(trimmed, $field)?;
                if trimmed.len() == value.len() {
                    Ok(Self(value))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Get the inner string
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert to String
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(s: String) -> Result<Self> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

validated_name!(
    /// Identifier of a tenant in the admin registry
    TenantId,
    "tenant identifier"
);

validated_name!(
    /// Logical name of a database cluster
    ClusterName,
    "cluster name"
);

validated_name!(
    /// Name of a keyspace a session is bound to
    Keyspace,
    "keyspace"
);

/// Comma-separated list of cluster contact points.
///
/// Entries are trimmed; a list with an empty entry (`"a,,b"`) is rejected.
/// Equality and hashing look at the trimmed hosts only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContactPoints {
    raw: String,
    hosts: Vec<String>,
}

impl ContactPoints {
    /// Parse a comma-separated contact point list
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let raw = value.into();
        Validate::not_blank(&raw, "contact points")?;

        let hosts = raw
            .split(',')
            .map(str::trim)
            .map(|host| {
                Validate::not_blank(host, "contact points").map(|()| host.to_string())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { raw, hosts })
    }

    /// Trimmed host entries in declaration order
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// The list exactly as configured
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for ContactPoints {
    fn eq(&self, other: &Self) -> bool {
        self.hosts == other.hosts
    }
}

impl Eq for ContactPoints {}

impl Hash for ContactPoints {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hosts.hash(state);
    }
}

impl Display for ContactPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hosts.join(","))
    }
}

impl FromStr for ContactPoints {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContactPoints {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ContactPoints> for String {
    fn from(value: ContactPoints) -> Self {
        value.raw
    }
}

/// A port number with validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// The driver's native protocol port
    pub const DEFAULT: Port = Port(crate::constants::PORT_DEFAULT);

    /// Create a new Port with validation
    pub fn new(port: u16) -> Result<Self> {
        Validate::with_predicate(port, |p| *p > 0, "port", "must be positive").map(Port)
    }

    /// Get the inner value
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl Default for Port {
    fn default() -> Self {
        Port::DEFAULT
    }
}

impl Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Port {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u16>()
            .map_err(|e| Error::validation("port", format!("invalid port number: {e}")))
            .and_then(Self::new)
    }
}

impl TryFrom<u16> for Port {
    type Error = Error;

    fn try_from(port: u16) -> Result<Self> {
        Self::new(port)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}
