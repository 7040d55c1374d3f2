//! compsync Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.compsync/config.toml`
//! - Local config: `.compsync/config.toml` (in the theme)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.
//!
//! # Example TOML
//!
//! ```toml
//! [map]
//! ignore_conflicts = false
//! components = "*"
//!
//! [scan]
//! parallelism = 4
//!
//! [collections.kit]
//! path = "../component-kit"
//! components = "card,drawer"
//! ```

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Log levels accepted by `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration for compsync.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Default map policy
    pub map: MapConfig,

    /// Scanner configuration
    pub scan: ScanSettings,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Registered collections (name → settings)
    pub collections: BTreeMap<String, CollectionEntry>,
}

/// Where compsync keeps its state inside a theme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// State directory (default: `.compsync`, relative to the theme)
    pub state_dir: PathBuf,

    /// Manifest file name inside the state directory
    pub manifest_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".compsync"),
            manifest_file: "manifest.json".to_string(),
        }
    }
}

/// Default policy for map runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MapConfig {
    /// Let collections claim theme files with colliding names
    pub ignore_conflicts: bool,

    /// Reassign files owned by other collections
    pub ignore_overrides: bool,

    /// Component selector (`*` or comma-separated names)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<String>,
}

/// Scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanSettings {
    /// Directory holding components inside a collection
    pub components_dir: String,

    /// Worker threads for scanning (0 = auto-detect)
    pub parallelism: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            components_dir: "components".to_string(),
            parallelism: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// A collection registered by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionEntry {
    /// Collection root (relative paths resolve against the theme)
    pub path: PathBuf,

    /// Component selector used when mapping this collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<String>,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override state directory
    pub state_dir: Option<PathBuf>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override parallelism
    pub parallelism: Option<usize>,

    /// Force conflict handling
    pub ignore_conflicts: Option<bool>,

    /// Force override handling
    pub ignore_overrides: Option<bool>,

    /// Override component selector
    pub components: Option<String>,
}

impl SyncConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.state_dir {
            self.storage.state_dir = dir.clone();
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(parallelism) = overrides.parallelism {
            self.scan.parallelism = parallelism;
        }

        if let Some(ignore) = overrides.ignore_conflicts {
            self.map.ignore_conflicts = ignore;
        }

        if let Some(ignore) = overrides.ignore_overrides {
            self.map.ignore_overrides = ignore;
        }

        if let Some(ref components) = overrides.components {
            self.map.components = Some(components.clone());
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!(
                    "unknown level '{}'. Valid values: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        if self.scan.components_dir.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "scan.components_dir",
                "must not be empty",
            ));
        }

        if self.storage.manifest_file.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "storage.manifest_file",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// Get the effective state directory for a theme.
    pub fn state_dir(&self, theme_root: &Path) -> PathBuf {
        if self.storage.state_dir.is_absolute() {
            self.storage.state_dir.clone()
        } else {
            theme_root.join(&self.storage.state_dir)
        }
    }

    /// Get the manifest file path for a theme.
    pub fn manifest_path(&self, theme_root: &Path) -> PathBuf {
        self.state_dir(theme_root).join(&self.storage.manifest_file)
    }

    /// Look up a registered collection.
    pub fn collection(&self, name: &str) -> Result<&CollectionEntry, ConfigError> {
        self.collections
            .get(name)
            .ok_or_else(|| ConfigError::collection_not_found(name))
    }

    /// Selector for a collection: its own setting, else the `[map]` default.
    pub fn selector_for(&self, collection: Option<&str>) -> Option<String> {
        collection
            .and_then(|name| self.collections.get(name))
            .and_then(|entry| entry.components.clone())
            .or_else(|| self.map.components.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.storage.state_dir, PathBuf::from(".compsync"));
        assert_eq!(config.storage.manifest_file, "manifest.json");
        assert_eq!(config.scan.components_dir, "components");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(!config.map.ignore_conflicts);
        assert!(config.collections.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = SyncConfig::default();
        let overrides = ConfigOverrides {
            state_dir: Some(PathBuf::from("/custom/state")),
            log_level: Some("debug".to_string()),
            ignore_overrides: Some(true),
            components: Some("card".to_string()),
            ..Default::default()
        };

        config.apply_overrides(&overrides);

        assert_eq!(config.storage.state_dir, PathBuf::from("/custom/state"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.map.ignore_overrides);
        assert!(!config.map.ignore_conflicts);
        assert_eq!(config.map.components.as_deref(), Some("card"));
    }

    #[test]
    fn test_manifest_path_resolution() {
        let config = SyncConfig::default();
        let theme = PathBuf::from("/home/user/theme");

        assert_eq!(
            config.manifest_path(&theme),
            PathBuf::from("/home/user/theme/.compsync/manifest.json")
        );
    }

    #[test]
    fn test_state_dir_absolute() {
        let mut config = SyncConfig::default();
        config.storage.state_dir = PathBuf::from("/var/compsync");

        assert_eq!(
            config.state_dir(Path::new("/theme")),
            PathBuf::from("/var/compsync")
        );
    }

    #[test]
    fn test_selector_for_prefers_collection_setting() {
        let mut config = SyncConfig::default();
        config.map.components = Some("*".to_string());
        config.collections.insert(
            "kit".to_string(),
            CollectionEntry {
                path: PathBuf::from("../kit"),
                components: Some("card".to_string()),
            },
        );

        assert_eq!(config.selector_for(Some("kit")).as_deref(), Some("card"));
        assert_eq!(config.selector_for(Some("other")).as_deref(), Some("*"));
        assert_eq!(config.selector_for(None).as_deref(), Some("*"));
    }

    #[test]
    fn test_unknown_collection() {
        let config = SyncConfig::default();
        let err = config.collection("kit").unwrap_err();
        assert!(matches!(err, ConfigError::CollectionNotFound { .. }));
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let mut config = SyncConfig::default();
        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let mut config = SyncConfig::default();
        config.logging.format = LogFormat::Json;
        config.collections.insert(
            "kit".to_string(),
            CollectionEntry {
                path: PathBuf::from("../kit"),
                components: None,
            },
        );

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: SyncConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, config);
    }
}
