//! Configuration for the mage tenant connector
//!
//! Settings are immutable once loaded. [`ConfigLoader`] layers them as
//! defaults, then a JSON file, then environment variables, then explicit
//! overrides.

pub mod loader;
pub mod settings;

pub use loader::{ConfigLoader, ConfigSource, LoadedSettings, SettingsOverrides};
pub use settings::{AdminSettings, ConnectorSettings, ConsistencySettings};
