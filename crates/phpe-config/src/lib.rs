//! Configuration for the phpe toolkit
//!
//! Stores advisory settings for the embedded PHP engine: where the embed
//! bridge library lives and which ini overrides to apply by default. The
//! engine treats everything here as a hint; a missing or unreadable config
//! file never blocks execution.

pub mod lib_paths;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "PHPE_CONFIG";

/// Errors from loading or persisting the configuration file
#[derive(Debug)]
pub enum ConfigError {
    /// Could not determine a home/config directory for this user
    NoConfigDir,
    /// Filesystem error while reading or writing the config file
    Io(io::Error),
    /// The config file exists but is not valid TOML
    Parse(String),
    /// The in-memory config could not be serialized back to TOML
    Serialize(String),
    /// `config set` was given a key this tool does not know about
    UnknownKey(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoConfigDir => {
                write!(f, "could not determine the user configuration directory")
            }
            ConfigError::Io(e) => write!(f, "config I/O error: {}", e),
            ConfigError::Parse(msg) => write!(f, "failed to parse config file: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "failed to serialize config: {}", msg),
            ConfigError::UnknownKey(key) => write!(f, "unknown config key: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Advisory settings for the embedded engine
///
/// Serialized as TOML at `~/.config/phpe/phpe.toml` (overridable through
/// `PHPE_CONFIG`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the embed bridge shared library
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_library: Option<PathBuf>,

    /// ini overrides applied to every execution unless the request overrides them
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ini: BTreeMap<String, String>,
}

impl Config {
    /// Resolve the config file path: `PHPE_CONFIG` env var, else the default
    /// location under the user config directory.
    pub fn path() -> PathBuf {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        default_config_dir()
            .map(|dir| dir.join("phpe.toml"))
            .unwrap_or_else(|| PathBuf::from("phpe.toml"))
    }

    /// Load the configuration from the resolved path.
    ///
    /// A missing file yields the defaults; a present but malformed file is an
    /// error so a typo in `engine_library` is not silently discarded.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    /// Load the configuration from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Persist the configuration to the resolved path, creating parent
    /// directories as needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    /// Persist the configuration to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Whether no setting has been customized
    pub fn is_empty(&self) -> bool {
        self.engine_library.is_none() && self.ini.is_empty()
    }

    /// Look up a setting by its CLI key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "engine-library" => self
                .engine_library
                .as_ref()
                .map(|p| p.display().to_string()),
            _ => key
                .strip_prefix("ini.")
                .and_then(|ini_key| self.ini.get(ini_key).cloned()),
        }
    }

    /// Update a setting by its CLI key
    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "engine-library" => {
                self.engine_library = Some(PathBuf::from(value));
                Ok(())
            }
            _ => {
                if let Some(ini_key) = key.strip_prefix("ini.") {
                    self.ini.insert(ini_key.to_string(), value);
                    Ok(())
                } else {
                    Err(ConfigError::UnknownKey(key.to_string()))
                }
            }
        }
    }

    /// Iterate over the customized settings as (key, value) pairs
    pub fn values_iter(&self) -> impl Iterator<Item = (String, String)> + '_ {
        let lib = self
            .engine_library
            .as_ref()
            .map(|p| ("engine-library".to_string(), p.display().to_string()));
        let ini = self
            .ini
            .iter()
            .map(|(k, v)| (format!("ini.{}", k), v.clone()));
        lib.into_iter().chain(ini)
    }
}

fn default_config_dir() -> Option<PathBuf> {
    #[cfg(not(target_os = "windows"))]
    {
        dirs::home_dir().map(|home| home.join(".config").join("phpe"))
    }

    #[cfg(target_os = "windows")]
    {
        dirs::config_dir().map(|dir| dir.join("phpe"))
    }
}
