//! Layered settings loader
//!
//! Precedence, lowest first: built-in defaults, JSON configuration file,
//! `MAGE_CONNECTOR_*` environment variables, explicit overrides.

use crate::settings::ConnectorSettings;
use mage_core::constants::{
    CLUSTER_NAME_PROP, CLUSTER_NAME_VAR, CONFIG_FILE_VAR, CONSISTENCY_LEVEL_DELETE_PROP,
    CONSISTENCY_LEVEL_DELETE_VAR, CONSISTENCY_LEVEL_READ_PROP, CONSISTENCY_LEVEL_READ_VAR,
    CONSISTENCY_LEVEL_WRITE_PROP, CONSISTENCY_LEVEL_WRITE_VAR, CONTACT_POINTS_PROP,
    CONTACT_POINTS_VAR, KEYSPACE_PROP, KEYSPACE_VAR, PORT_PROP, PORT_VAR,
};
use mage_core::{Error, Port, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Source of a configuration layer, for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in defaults
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
    /// Explicit overrides, e.g. command line arguments
    Overrides,
}

/// Settings together with the layers that contributed to them
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: ConnectorSettings,
    pub sources: Vec<ConfigSource>,
}

/// Highest-precedence values, usually from the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub cluster_name: Option<String>,
    pub contact_points: Option<String>,
    pub port: Option<u16>,
    pub keyspace: Option<String>,
    /// Applied to read, write and delete alike
    pub consistency: Option<String>,
}

impl SettingsOverrides {
    fn is_empty(&self) -> bool {
        self.cluster_name.is_none()
            && self.contact_points.is_none()
            && self.port.is_none()
            && self.keyspace.is_none()
            && self.consistency.is_none()
    }

    fn apply(&self, settings: &mut ConnectorSettings) {
        if let Some(cluster_name) = &self.cluster_name {
            settings.admin.cluster_name = cluster_name.clone();
        }
        if let Some(contact_points) = &self.contact_points {
            settings.admin.contact_points = contact_points.clone();
        }
        if let Some(port) = self.port {
            settings.admin.port = port;
        }
        if let Some(keyspace) = &self.keyspace {
            settings.admin.keyspace = keyspace.clone();
        }
        if let Some(level) = &self.consistency {
            settings.consistency.read = level.clone();
            settings.consistency.write = level.clone();
            settings.consistency.delete = level.clone();
        }
    }
}

/// Loads [`ConnectorSettings`] from every configured layer
pub struct ConfigLoader {
    file: Option<PathBuf>,
    read_env: bool,
    overrides: SettingsOverrides,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader that reads the environment and no explicit file
    pub fn new() -> Self {
        Self {
            file: None,
            read_env: true,
            overrides: SettingsOverrides::default(),
        }
    }

    /// Read this configuration file instead of `MAGE_CONNECTOR_CONFIG`
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Ignore environment variables
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Apply overrides on top of every other layer
    pub fn overrides(mut self, overrides: SettingsOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load the settings
    pub fn load(self) -> Result<LoadedSettings> {
        self.load_with(|name| std::env::var(name).ok())
    }

    fn load_with<F>(self, lookup: F) -> Result<LoadedSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = ConnectorSettings::default();
        let mut sources = vec![ConfigSource::Default];

        let file = self
            .file
            .clone()
            .or_else(|| self.read_env.then(|| lookup(CONFIG_FILE_VAR)).flatten().map(PathBuf::from));

        if let Some(path) = file {
            Self::apply_file(&mut settings, &path)?;
            tracing::debug!(path = %path.display(), "applied connector configuration file");
            sources.push(ConfigSource::ConfigFile(path));
        }

        if self.read_env {
            let applied = Self::apply_env(&mut settings, &lookup)?;
            if !applied.is_empty() {
                tracing::debug!(variables = ?applied, "applied connector environment overrides");
                sources.extend(applied.into_iter().map(ConfigSource::EnvironmentVariable));
            }
        }

        if !self.overrides.is_empty() {
            self.overrides.apply(&mut settings);
            sources.push(ConfigSource::Overrides);
        }

        Ok(LoadedSettings { settings, sources })
    }

    /// Merge a JSON file into `settings`.
    ///
    /// Both the structured form (`{"admin": {..}, "consistency": {..}}`) and
    /// flat property keys (`"lab.mage.connector.keyspace"`) are accepted.
    fn apply_file(settings: &mut ConnectorSettings, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "could not read configuration file '{}': {e}",
                path.display()
            ))
        })?;

        let file_config: Value = serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!(
                "invalid configuration file '{}': {e}",
                path.display()
            ))
        })?;

        let root = file_config.as_object().ok_or_else(|| {
            Error::configuration(format!(
                "configuration file '{}' must contain a JSON object",
                path.display()
            ))
        })?;

        if let Some(admin) = root.get("admin").and_then(|v| v.as_object()) {
            if let Some(v) = admin.get("cluster_name").and_then(|v| v.as_str()) {
                settings.admin.cluster_name = v.to_string();
            }
            if let Some(v) = admin.get("contact_points").and_then(|v| v.as_str()) {
                settings.admin.contact_points = v.to_string();
            }
            if let Some(v) = admin.get("port") {
                settings.admin.port = port_from_json(v, "admin.port")?;
            }
            if let Some(v) = admin.get("keyspace").and_then(|v| v.as_str()) {
                settings.admin.keyspace = v.to_string();
            }
        }

        if let Some(consistency) = root.get("consistency").and_then(|v| v.as_object()) {
            if let Some(v) = consistency.get("read").and_then(|v| v.as_str()) {
                settings.consistency.read = v.to_string();
            }
            if let Some(v) = consistency.get("write").and_then(|v| v.as_str()) {
                settings.consistency.write = v.to_string();
            }
            if let Some(v) = consistency.get("delete").and_then(|v| v.as_str()) {
                settings.consistency.delete = v.to_string();
            }
        }

        if let Some(v) = root.get(CLUSTER_NAME_PROP).and_then(|v| v.as_str()) {
            settings.admin.cluster_name = v.to_string();
        }
        if let Some(v) = root.get(CONTACT_POINTS_PROP).and_then(|v| v.as_str()) {
            settings.admin.contact_points = v.to_string();
        }
        if let Some(v) = root.get(PORT_PROP) {
            settings.admin.port = port_from_json(v, PORT_PROP)?;
        }
        if let Some(v) = root.get(KEYSPACE_PROP).and_then(|v| v.as_str()) {
            settings.admin.keyspace = v.to_string();
        }
        if let Some(v) = root.get(CONSISTENCY_LEVEL_READ_PROP).and_then(|v| v.as_str()) {
            settings.consistency.read = v.to_string();
        }
        if let Some(v) = root.get(CONSISTENCY_LEVEL_WRITE_PROP).and_then(|v| v.as_str()) {
            settings.consistency.write = v.to_string();
        }
        if let Some(v) = root.get(CONSISTENCY_LEVEL_DELETE_PROP).and_then(|v| v.as_str()) {
            settings.consistency.delete = v.to_string();
        }

        Ok(())
    }

    /// Merge `MAGE_CONNECTOR_*` variables, returning the names that were set
    fn apply_env<F>(settings: &mut ConnectorSettings, lookup: &F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(v) = lookup(CLUSTER_NAME_VAR) {
            settings.admin.cluster_name = v;
            applied.push(CLUSTER_NAME_VAR.to_string());
        }
        if let Some(v) = lookup(CONTACT_POINTS_VAR) {
            settings.admin.contact_points = v;
            applied.push(CONTACT_POINTS_VAR.to_string());
        }
        if let Some(v) = lookup(PORT_VAR) {
            settings.admin.port = v
                .parse::<Port>()
                .map_err(|e| Error::configuration(format!("{PORT_VAR}: {e}")))?
                .get();
            applied.push(PORT_VAR.to_string());
        }
        if let Some(v) = lookup(KEYSPACE_VAR) {
            settings.admin.keyspace = v;
            applied.push(KEYSPACE_VAR.to_string());
        }
        if let Some(v) = lookup(CONSISTENCY_LEVEL_READ_VAR) {
            settings.consistency.read = v;
            applied.push(CONSISTENCY_LEVEL_READ_VAR.to_string());
        }
        if let Some(v) = lookup(CONSISTENCY_LEVEL_WRITE_VAR) {
            settings.consistency.write = v;
            applied.push(CONSISTENCY_LEVEL_WRITE_VAR.to_string());
        }
        if let Some(v) = lookup(CONSISTENCY_LEVEL_DELETE_VAR) {
            settings.consistency.delete = v;
            applied.push(CONSISTENCY_LEVEL_DELETE_VAR.to_string());
        }

        Ok(applied)
    }
}

fn port_from_json(value: &Value, key: &str) -> Result<u16> {
    let port = match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| Error::configuration(format!("{key}: {n} is not a valid port")))?,
        Value::String(s) => s
            .parse::<Port>()
            .map_err(|e| Error::configuration(format!("{key}: {e}")))?
            .get(),
        other => {
            return Err(Error::configuration(format!(
                "{key}: expected a port number, found {other}"
            )))
        }
    };
    Port::new(port)
        .map(|p| p.get())
        .map_err(|e| Error::configuration(format!("{key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_only() {
        let loaded = ConfigLoader::new().without_env().load().unwrap();
        assert_eq!(loaded.settings, ConnectorSettings::default());
        assert_eq!(loaded.sources, vec![ConfigSource::Default]);
    }

    #[test]
    fn test_structured_file() {
        let file = write_config(
            r#"{
                "admin": {"cluster_name": "eu_cluster", "port": 9142},
                "consistency": {"read": "ONE"}
            }"#,
        );

        let loaded = ConfigLoader::new().without_env().file(file.path()).load().unwrap();
        assert_eq!(loaded.settings.admin.cluster_name, "eu_cluster");
        assert_eq!(loaded.settings.admin.port, 9142);
        assert_eq!(loaded.settings.admin.keyspace, "mage_system");
        assert_eq!(loaded.settings.consistency.read, "ONE");
        assert_eq!(loaded.settings.consistency.write, "LOCAL_QUORUM");
        assert_eq!(
            loaded.sources.last(),
            Some(&ConfigSource::ConfigFile(file.path().to_path_buf()))
        );
    }

    #[test]
    fn test_property_keys_in_file() {
        let file = write_config(
            r#"{
                "lab.mage.connector.keyspace": "legacy_system",
                "lab.mage.connector.port": "9142",
                "lab.mage.connector.cl.delete": "ALL"
            }"#,
        );

        let loaded = ConfigLoader::new().without_env().file(file.path()).load().unwrap();
        assert_eq!(loaded.settings.admin.keyspace, "legacy_system");
        assert_eq!(loaded.settings.admin.port, 9142);
        assert_eq!(loaded.settings.consistency.delete, "ALL");
    }

    #[test]
    fn test_invalid_file_is_a_configuration_error() {
        let file = write_config("{ not json");
        let err = ConfigLoader::new().without_env().file(file.path()).load().unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let file = write_config(r#"{"admin": {"port": 0}}"#);
        assert!(ConfigLoader::new().without_env().file(file.path()).load().is_err());
    }

    #[test]
    fn test_missing_file_is_a_configuration_error() {
        let err = ConfigLoader::new()
            .without_env()
            .file("/nonexistent/mage/connector.json")
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(r#"{"admin": {"keyspace": "from_file", "cluster_name": "file_cluster"}}"#);
        let lookup = lookup_from(&[(KEYSPACE_VAR, "from_env"), (CONSISTENCY_LEVEL_WRITE_VAR, "TWO")]);

        let loaded = ConfigLoader::new().file(file.path()).load_with(lookup).unwrap();
        assert_eq!(loaded.settings.admin.keyspace, "from_env");
        assert_eq!(loaded.settings.admin.cluster_name, "file_cluster");
        assert_eq!(loaded.settings.consistency.write, "TWO");
        assert!(loaded
            .sources
            .contains(&ConfigSource::EnvironmentVariable(KEYSPACE_VAR.to_string())));
    }

    #[test]
    fn test_config_file_from_env() {
        let file = write_config(r#"{"admin": {"keyspace": "pointed_at"}}"#);
        let path = file.path().to_string_lossy().to_string();
        let lookup = lookup_from(&[(CONFIG_FILE_VAR, path.as_str())]);

        let loaded = ConfigLoader::new().load_with(lookup).unwrap();
        assert_eq!(loaded.settings.admin.keyspace, "pointed_at");
    }

    #[test]
    fn test_invalid_env_port() {
        let lookup = lookup_from(&[(PORT_VAR, "ninety")]);
        assert!(ConfigLoader::new().load_with(lookup).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let lookup = lookup_from(&[(KEYSPACE_VAR, "from_env")]);
        let overrides = SettingsOverrides {
            keyspace: Some("from_cli".to_string()),
            consistency: Some("ONE".to_string()),
            ..SettingsOverrides::default()
        };

        let loaded = ConfigLoader::new().overrides(overrides).load_with(lookup).unwrap();
        assert_eq!(loaded.settings.admin.keyspace, "from_cli");
        assert_eq!(loaded.settings.consistency.read, "ONE");
        assert_eq!(loaded.settings.consistency.delete, "ONE");
        assert_eq!(loaded.sources.last(), Some(&ConfigSource::Overrides));
    }

    #[test]
    #[serial]
    fn test_process_environment() {
        std::env::set_var(CLUSTER_NAME_VAR, "env_cluster");
        let loaded = ConfigLoader::new().load();
        std::env::remove_var(CLUSTER_NAME_VAR);

        assert_eq!(loaded.unwrap().settings.admin.cluster_name, "env_cluster");
    }
}
