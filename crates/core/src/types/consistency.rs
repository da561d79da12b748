//! Consistency levels and per-operation mapper options

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Level used when no level is configured
pub const DEFAULT_CONSISTENCY_LEVEL: ConsistencyLevel = ConsistencyLevel::LocalQuorum;

/// Durability and visibility guarantee applied to a single operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    LocalOne,
}

impl ConsistencyLevel {
    pub const ALL_LEVELS: [ConsistencyLevel; 11] = [
        ConsistencyLevel::Any,
        ConsistencyLevel::One,
        ConsistencyLevel::Two,
        ConsistencyLevel::Three,
        ConsistencyLevel::Quorum,
        ConsistencyLevel::All,
        ConsistencyLevel::LocalQuorum,
        ConsistencyLevel::EachQuorum,
        ConsistencyLevel::Serial,
        ConsistencyLevel::LocalSerial,
        ConsistencyLevel::LocalOne,
    ];

    /// The configuration name of this level, e.g. `LOCAL_QUORUM`
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::All => "ALL",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::Serial => "SERIAL",
            ConsistencyLevel::LocalSerial => "LOCAL_SERIAL",
            ConsistencyLevel::LocalOne => "LOCAL_ONE",
        }
    }
}

impl Default for ConsistencyLevel {
    fn default() -> Self {
        DEFAULT_CONSISTENCY_LEVEL
    }
}

impl Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL_LEVELS
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                Error::configuration(format!("unknown consistency level '{wanted}'"))
            })
    }
}

/// A default option attached to a mapper for one operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapperOption {
    ConsistencyLevel(ConsistencyLevel),
}

impl MapperOption {
    pub fn consistency_level(level: ConsistencyLevel) -> Self {
        MapperOption::ConsistencyLevel(level)
    }

    /// Fold this option into statement options handed to the driver
    pub fn apply(&self, options: StatementOptions) -> StatementOptions {
        match self {
            MapperOption::ConsistencyLevel(level) => options.with_consistency(*level),
        }
    }
}

/// Per-statement options passed to the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementOptions {
    pub consistency: Option<ConsistencyLevel>,
}

impl StatementOptions {
    pub fn with_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency = Some(level);
        self
    }

    /// The effective level, falling back to the connector default
    pub fn consistency_or_default(&self) -> ConsistencyLevel {
        self.consistency.unwrap_or(DEFAULT_CONSISTENCY_LEVEL)
    }
}
