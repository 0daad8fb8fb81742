//! Configuration management for circle.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::workflow::Role;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "circle";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "orders.db";

/// Default rule file name.
const RULES_FILE_NAME: &str = "circle_validations.json";

/// Default reference data directory name.
const REFERENCE_DIR_NAME: &str = "champs";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CIRCLE_`, sections split on `__`)
/// 2. TOML config file at `~/.config/circle/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Rule and reference data configuration.
    pub rules: RulesConfig,
    /// HTTP service configuration.
    pub server: ServerConfig,
    /// Default actor identities for the CLI front ends.
    pub actors: ActorsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/circle/orders.db`
    pub database_path: Option<PathBuf>,
}

/// CIRCLE rule configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Path to the JSON rule file.
    /// Defaults to `~/.config/circle/circle_validations.json`
    pub rules_path: Option<PathBuf>,
    /// Directory holding the `<CODE>_*.csv` reference files.
    /// Defaults to `~/.local/share/circle/champs`
    pub reference_dir: Option<PathBuf>,
}

/// HTTP service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API listens on.
    pub bind_address: String,
}

/// Identities used when a CLI command is run without `--as`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorsConfig {
    /// Default broker ID.
    pub broker_id: String,
    /// Default castle ID.
    pub castle_id: String,
    /// Default merchant ID.
    pub merchant_id: String,
    /// Default warehouse ID.
    pub warehouse_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for ActorsConfig {
    fn default() -> Self {
        Self {
            broker_id: "broker_default_user".to_string(),
            castle_id: "castle_default_id".to_string(),
            merchant_id: "merchant_default_id".to_string(),
            warehouse_id: "warehouse_default_id".to_string(),
        }
    }
}

impl ActorsConfig {
    /// Default identity for a role.
    #[must_use]
    pub fn id_for(&self, role: Role) -> &str {
        match role {
            Role::Broker => &self.broker_id,
            Role::Castle => &self.castle_id,
            Role::Merchant => &self.merchant_id,
            Role::Warehouse => &self.warehouse_id,
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
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("CIRCLE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration directory.
    #[must_use]
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(CONFIG_FILE_NAME)
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
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid bind address: {}", self.server.bind_address),
            });
        }

        for role in Role::ALL {
            if self.actors.id_for(role).trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("default {role} id cannot be empty"),
                });
            }
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

    /// Get the rule file path, resolving defaults if not set.
    #[must_use]
    pub fn rules_path(&self) -> PathBuf {
        self.rules
            .rules_path
            .clone()
            .unwrap_or_else(|| Self::default_config_dir().join(RULES_FILE_NAME))
    }

    /// Get the reference data directory, resolving defaults if not set.
    #[must_use]
    pub fn reference_dir(&self) -> PathBuf {
        self.rules
            .reference_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(REFERENCE_DIR_NAME))
    }

    /// Get the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not parse.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .map_err(|_| Error::ConfigValidation {
                message: format!("invalid bind address: {}", self.server.bind_address),
            })
    }
}
