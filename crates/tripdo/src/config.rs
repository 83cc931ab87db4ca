//! Configuration management for tripdo.
//!
//! Configuration is loaded with figment from defaults, an optional TOML file
//! and `TRIPDO_` environment variables.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::trip::{TripPolicy, DEFAULT_CLEAR_ALL_THRESHOLD};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "tripdo";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "tripdo.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "TRIPDO_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TRIPDO_`, sections separated by
///    `__`, e.g. `TRIPDO_TRIPS__VALIDATE_FIELDS=true`)
/// 2. TOML config file at `~/.config/tripdo/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Trip log configuration.
    pub trips: TripsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/tripdo/tripdo.db`
    pub database_path: Option<PathBuf>,
    /// Key the todo list is stored under.
    pub todos_key: String,
    /// Key the trip log is stored under.
    pub trips_key: String,
}

/// Trip log configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripsConfig {
    /// Offer "clear all" only when more trips than this are logged.
    pub clear_all_threshold: usize,
    /// Require owner, pickup and destination, and a numeric people count.
    pub validate_fields: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            todos_key: "@todos".to_string(),
            trips_key: "trips".to_string(),
        }
    }
}

impl Default for TripsConfig {
    fn default() -> Self {
        Self {
            clear_all_threshold: DEFAULT_CLEAR_ALL_THRESHOLD,
            validate_fields: false,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation
    /// fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        Self::figment(Toml::file(&config_file))
    }

    /// Load configuration from a TOML string layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed or validation fails.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::figment(Toml::string(toml))
    }

    fn figment(file: impl figment::Provider) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let storage = &self.storage;
        for (name, key) in [
            ("todos_key", &storage.todos_key),
            ("trips_key", &storage.trips_key),
        ] {
            if key.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must not be empty"),
                });
            }
        }

        if storage.todos_key == storage.trips_key {
            return Err(Error::ConfigValidation {
                message: format!(
                    "todos_key and trips_key must differ (both are '{}')",
                    storage.todos_key
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// The trip policy described by this configuration.
    #[must_use]
    pub fn trip_policy(&self) -> TripPolicy {
        TripPolicy {
            clear_all_threshold: self.trips.clear_all_threshold,
            validate_fields: self.trips.validate_fields,
        }
    }
}
