//! Loading and saving the presence configuration files.
//!
//! Settings live in one TOML document with a `[Presence]` and a
//! `[Multiplayer]` section. The default location is managed by confy; any
//! other path can be read and written directly.

use std::fs;
use std::path::{Path, PathBuf};

use labpresence_types::{MultiplayerConfig, PresenceConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the configuration directory and of the confy application.
pub const APP_NAME: &str = "labpresence";

/// Config file name (without extension) used by confy.
pub const CONFIG_NAME: &str = "default";

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(rename = "Presence")]
    pub presence: PresenceConfig,

    #[serde(rename = "Multiplayer")]
    pub multiplayer: MultiplayerConfig,
}

impl AppConfig {
    /// Warnings from both sections, multiplayer ones prefixed with their
    /// section name.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = self.presence.warnings();
        warnings.extend(
            self.multiplayer
                .warnings()
                .into_iter()
                .map(|w| format!("Multiplayer.{w}")),
        );
        warnings
    }
}

/// Load the config from confy's default location, writing defaults on
/// first run.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    Ok(confy::load(APP_NAME, Some(CONFIG_NAME))?)
}

/// Where [`load_app_config`] reads from.
pub fn app_config_path() -> Result<PathBuf, ConfigError> {
    Ok(confy::get_configuration_file_path(APP_NAME, Some(CONFIG_NAME))?)
}

/// Load a single TOML config file
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Save a config to a TOML file, creating parent directories as needed
pub fn save_file<T: Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ConfigError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(path, contents).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Load `path`, or write the defaults there and return them when it does
/// not exist yet.
pub fn load_or_create<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Serialize + Default,
{
    if path.exists() {
        return load_file(path);
    }

    tracing::info!(path = %path.display(), "Config file missing, writing defaults");
    let config = T::default();
    save_file(path, &config)?;
    Ok(config)
}

/// Errors that can occur during config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize config for {}: {source}", path.display())]
    SerializeError {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("config store error: {source}")]
    StoreError {
        #[from]
        source: confy::ConfyError,
    },
}
