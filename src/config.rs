//! Configuration for the script engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (botc-scripts.toml)
//! - Environment variables (BOTC_SCRIPTS__*)
//!
//! ## Example config file (botc-scripts.toml):
//! ```toml
//! [registry]
//! roster_path = "./data/official_roles.json"
//!
//! [remote]
//! enabled = true
//! roles_url = "https://script.bloodontheclocktower.com/data/roles.json"
//! timeout_ms = 2000
//!
//! [logging]
//! filter = "botc_scripts=info"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::remote::DEFAULT_ROLES_URL;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Character registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Released role lookup settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Character registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Official roles JSON file; the bundled roster is used when unset
    #[serde(default)]
    pub roster_path: Option<PathBuf>,
}

/// Released role lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Ask the publisher about unknown characters
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_roles_url")]
    pub roles_url: String,

    /// Upper bound on one lookup
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_roles_url() -> String {
    DEFAULT_ROLES_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_filter() -> String {
    "botc_scripts=info".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            roles_url: default_roles_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "botc-scripts.toml",
            ".botc-scripts.toml",
            "config/botc-scripts.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "botc", "botc-scripts") {
            let xdg_config = config_dir.config_dir().join("botc-scripts.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // BOTC_SCRIPTS__REMOTE__ENABLED=true and friends
        builder = builder.add_source(
            Environment::with_prefix("BOTC_SCRIPTS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.remote.enabled);
        assert_eq!(config.remote.timeout(), Duration::from_secs(2));
        assert!(config.registry.roster_path.is_none());
    }

    #[test]
    fn test_serialize_config() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[remote]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            "[remote]\nenabled = true\ntimeout_ms = 500\n\n[registry]\nroster_path = \"roles.json\"\n",
        )
        .unwrap();

        let config = EngineConfig::load_from(path.to_str()).unwrap();
        assert!(config.remote.enabled);
        assert_eq!(config.remote.timeout(), Duration::from_millis(500));
        assert_eq!(config.remote.roles_url, DEFAULT_ROLES_URL);
        assert_eq!(config.registry.roster_path, Some(PathBuf::from("roles.json")));
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = EngineConfig::default();
        config.logging.filter = "debug".into();
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = EngineConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.logging.filter, "debug");
    }
}
