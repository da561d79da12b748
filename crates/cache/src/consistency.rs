//! Consistency options resolved once from settings

use mage_config::ConsistencySettings;
use mage_core::{ConsistencyLevel, MapperOption, Result, ResultExt};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Read, write and delete options for mappers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyOptions {
    pub read: MapperOption,
    pub write: MapperOption,
    pub delete: MapperOption,
}

impl ConsistencyOptions {
    /// The same level for every operation kind
    pub fn uniform(level: ConsistencyLevel) -> Self {
        let option = MapperOption::consistency_level(level);
        Self {
            read: option,
            write: option,
            delete: option,
        }
    }
}

/// Resolves the configured level names on first use and keeps the result.
///
/// A name that is not a known level fails every accessor with
/// `Error::Configuration`; the failure is not stored, so each call re-parses
/// and fails the same way.
#[derive(Debug)]
pub struct ConsistencyOptionCache {
    settings: ConsistencySettings,
    options: OnceCell<ConsistencyOptions>,
    resolutions: AtomicU64,
}

impl ConsistencyOptionCache {
    pub fn new(settings: ConsistencySettings) -> Self {
        Self {
            settings,
            options: OnceCell::new(),
            resolutions: AtomicU64::new(0),
        }
    }

    pub fn read_option(&self) -> Result<MapperOption> {
        self.options().map(|o| o.read)
    }

    pub fn write_option(&self) -> Result<MapperOption> {
        self.options().map(|o| o.write)
    }

    pub fn delete_option(&self) -> Result<MapperOption> {
        self.options().map(|o| o.delete)
    }

    /// All three options, resolving them if needed
    pub fn options(&self) -> Result<ConsistencyOptions> {
        self.options.get_or_try_init(|| self.resolve()).copied()
    }

    /// How many resolution passes completed successfully
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    fn resolve(&self) -> Result<ConsistencyOptions> {
        let parse = |kind: &str, name: &str| {
            name.parse::<ConsistencyLevel>()
                .map(MapperOption::consistency_level)
                .context(format!("{kind} consistency level"))
        };

        let options = ConsistencyOptions {
            read: parse("read", &self.settings.read)?,
            write: parse("write", &self.settings.write)?,
            delete: parse("delete", &self.settings.delete)?,
        };
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            read = %self.settings.read,
            write = %self.settings.write,
            delete = %self.settings.delete,
            "resolved consistency options"
        );
        Ok(options)
    }
}
