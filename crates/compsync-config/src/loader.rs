//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.compsync/config.toml`
//! 2. Local config: `.compsync/config.toml` (in the theme)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{ConfigOverrides, SyncConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".compsync";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".compsync";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.compsync`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<SyncConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.compsync`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a theme.
    pub fn local_config_path(&self, theme_root: &Path) -> PathBuf {
        theme_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a theme with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides, then validates.
    pub fn load(
        &mut self,
        theme_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SyncConfig, ConfigError> {
        let mut config = SyncConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(theme_root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from one explicit file, then apply overrides.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SyncConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = merge_configs(SyncConfig::default(), load_config_file(path)?);

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<SyncConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a theme.
    pub fn load_local(&self, theme_root: &Path) -> Result<Option<SyncConfig>, ConfigError> {
        let local_path = self.local_config_path(theme_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the local config file for a theme.
    pub fn save_local(&self, theme_root: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(theme_root);
        save_config_file(&local_path, config)
    }

    /// Initialize local configuration for a theme.
    ///
    /// Creates `.compsync/config.toml` with default configuration unless it
    /// already exists.
    pub fn init_local(&self, theme_root: &Path) -> Result<PathBuf, ConfigError> {
        let local_dir = theme_root.join(LOCAL_CONFIG_DIR);

        if !local_dir.exists() {
            std::fs::create_dir_all(&local_dir)
                .map_err(|e| ConfigError::create_dir(&local_dir, e))?;
        }

        let config_path = local_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            save_config_file(&config_path, &SyncConfig::default())?;
        }

        Ok(config_path)
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<SyncConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// Values equal to their default in `overlay` are treated as unset, so a
/// partial local file only changes what it mentions.
fn merge_configs(base: SyncConfig, overlay: SyncConfig) -> SyncConfig {
    SyncConfig {
        storage: merge_storage(base.storage, overlay.storage),
        map: merge_map(base.map, overlay.map),
        scan: merge_scan(base.scan, overlay.scan),
        logging: merge_logging(base.logging, overlay.logging),
        collections: {
            let mut collections = base.collections;
            collections.extend(overlay.collections);
            collections
        },
    }
}

fn merge_storage(
    base: crate::StorageConfig,
    overlay: crate::StorageConfig,
) -> crate::StorageConfig {
    let defaults = crate::StorageConfig::default();
    crate::StorageConfig {
        state_dir: if overlay.state_dir != defaults.state_dir {
            overlay.state_dir
        } else {
            base.state_dir
        },
        manifest_file: if overlay.manifest_file != defaults.manifest_file {
            overlay.manifest_file
        } else {
            base.manifest_file
        },
    }
}

fn merge_map(base: crate::MapConfig, overlay: crate::MapConfig) -> crate::MapConfig {
    crate::MapConfig {
        ignore_conflicts: overlay.ignore_conflicts || base.ignore_conflicts,
        ignore_overrides: overlay.ignore_overrides || base.ignore_overrides,
        components: overlay.components.or(base.components),
    }
}

fn merge_scan(base: crate::ScanSettings, overlay: crate::ScanSettings) -> crate::ScanSettings {
    let defaults = crate::ScanSettings::default();
    crate::ScanSettings {
        components_dir: if overlay.components_dir != defaults.components_dir {
            overlay.components_dir
        } else {
            base.components_dir
        },
        parallelism: if overlay.parallelism != defaults.parallelism {
            overlay.parallelism
        } else {
            base.parallelism
        },
    }
}

fn merge_logging(
    base: crate::LoggingConfig,
    overlay: crate::LoggingConfig,
) -> crate::LoggingConfig {
    crate::LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: if overlay.format != crate::LogFormat::Text {
            overlay.format
        } else {
            base.format
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(".compsync");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_test_config(
            r#"
            [map]
            ignore_conflicts = true

            [collections.kit]
            path = "../kit"
            components = "card"
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert!(config.map.ignore_conflicts);
        assert_eq!(config.collection("kit").unwrap().path, PathBuf::from("../kit"));
        assert_eq!(config.selector_for(Some("kit")).as_deref(), Some("card"));
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        let theme = temp.path().join("theme");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join(CONFIG_FILE_NAME),
            r#"
            [logging]
            level = "debug"
            format = "json"

            [scan]
            parallelism = 2

            [collections.shared]
            path = "/opt/shared"
            "#,
        )
        .unwrap();
        create_test_config(
            r#"
            [scan]
            parallelism = 8

            [collections.kit]
            path = "../kit"
            "#,
            &theme,
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(&theme, None).unwrap();

        // local wins where set, global fills the rest
        assert_eq!(config.scan.parallelism, 8);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.collections.len(), 2);
    }

    #[test]
    fn test_cli_overrides_win() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        create_test_config("[logging]\nlevel = \"warn\"\n", temp.path());

        let overrides = ConfigOverrides {
            log_level: Some("trace".to_string()),
            ..Default::default()
        };
        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_invalid_toml_names_file() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        create_test_config("[map\n", temp.path());

        let err = loader.load(temp.path(), None).unwrap_err();

        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_invalid_value_is_rejected_on_load() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        create_test_config("[logging]\nlevel = \"chatty\"\n", temp.path());

        let err = loader.load(temp.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "[storage]\nmanifest_file = \"owners.json\"\n").unwrap();

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_file(&path, None).unwrap();

        assert_eq!(
            config.manifest_path(Path::new("/theme")),
            PathBuf::from("/theme/.compsync/owners.json")
        );
    }

    #[test]
    fn test_init_and_save_local() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let path = loader.init_local(temp.path()).unwrap();
        assert!(path.exists());

        let mut config = loader.load_local(temp.path()).unwrap().unwrap();
        assert_eq!(config, SyncConfig::default());

        config.map.components = Some("card".to_string());
        loader.save_local(temp.path(), &config).unwrap();

        let reloaded = loader.load_local(temp.path()).unwrap().unwrap();
        assert_eq!(reloaded.map.components.as_deref(), Some("card"));

        // init does not clobber an existing file
        loader.init_local(temp.path()).unwrap();
        let again = loader.load_local(temp.path()).unwrap().unwrap();
        assert_eq!(again, reloaded);
    }
}
