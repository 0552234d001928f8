//! Configuration management for airtime
//!
//! This module handles loading and validating configuration from TOML files
//! and environment variables. Rotation policy keys live in [`rotation`];
//! cached loading and staleness checks live in [`provider`].

pub mod provider;
pub mod rotation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use provider::{ConfigProvider, ConfigSource};
pub use rotation::{
    ConfigWarning, FeaturedPolicy, GapFillPolicy, MeetingRelevance, RelevanceTier, ReplayDelay,
    RotationConfig, RotationOverlay, DEFAULT_FILLER_CATEGORIES, DEFAULT_ROTATION_ORDER,
};

use crate::scheduler::rotation::RotationCategory;
use rotation::{section, value, warn_key};

/// Environment variable naming the configuration file
pub const ENV_CONFIG_PATH: &str = "AIRTIME_CONFIG";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors that cannot be recovered by defaulting
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid TOML
    #[error("Failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    /// Value rejected by validation
    #[error("Invalid config value for '{key}': {reason}")]
    Invalid { key: String, reason: String },

    /// Effective configuration could not be rendered
    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

// ============================================================================
// Config
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    /// Rotation and scoring policy
    pub rotation: RotationConfig,

    /// Catalog storage
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite catalog path
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/airtime.db"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// On-disk layout of the effective configuration
#[derive(Serialize)]
struct Document<'a> {
    rotation: OrderSection<'a>,
    replay_delays: &'a BTreeMap<RotationCategory, ReplayDelay>,
    featured: &'a FeaturedPolicy,
    meeting_relevance: &'a MeetingRelevance,
    gap_fill: &'a GapFillPolicy,
    storage: &'a StorageConfig,
    logging: &'a LoggingConfig,
}

#[derive(Serialize)]
struct OrderSection<'a> {
    order: &'a [RotationCategory],
}

impl Config {
    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `AIRTIME_DB`, `AIRTIME_LOG_LEVEL` and `AIRTIME_LOG_FORMAT`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("AIRTIME_DB") {
            self.storage.sqlite_path = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var("AIRTIME_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("AIRTIME_LOG_FORMAT") {
            self.logging.format = format;
        }
        self
    }

    /// Parse a TOML document, merging every present key over the defaults
    pub fn from_toml_str(
        content: &str,
        origin: &str,
    ) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let table: toml::Table = toml::from_str(content).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;

        let (rotation, mut warnings) = RotationConfig::from_table(&table);

        let mut storage = StorageConfig::default();
        let storage_table = section(&table, "storage", &mut warnings);
        if let Some(path) = value::<PathBuf>(storage_table, "storage", "sqlite_path", &mut warnings) {
            if path.as_os_str().is_empty() {
                warn_key(&mut warnings, "storage.sqlite_path", "path is empty");
            } else {
                storage.sqlite_path = path;
            }
        }

        let mut logging = LoggingConfig::default();
        let logging_table = section(&table, "logging", &mut warnings);
        if let Some(level) = value::<String>(logging_table, "logging", "level", &mut warnings) {
            if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                logging.level = level.to_lowercase();
            } else {
                warn_key(&mut warnings, "logging.level", format!("unknown level '{level}'"));
            }
        }
        if let Some(format) = value::<String>(logging_table, "logging", "format", &mut warnings) {
            if LOG_FORMATS.contains(&format.as_str()) {
                logging.format = format;
            } else {
                warn_key(&mut warnings, "logging.format", format!("unknown format '{format}'"));
            }
        }

        Ok((
            Self {
                rotation,
                storage,
                logging,
            },
            warnings,
        ))
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Validate values that may have come from the environment
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rotation.order.is_empty() {
            return Err(ConfigError::Invalid {
                key: "rotation.order".to_string(),
                reason: "order is empty".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid {
                key: "logging.level".to_string(),
                reason: format!("unknown level '{}'", self.logging.level),
            });
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Invalid {
                key: "logging.format".to_string(),
                reason: format!("unknown format '{}'", self.logging.format),
            });
        }

        if self.storage.sqlite_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "storage.sqlite_path".to_string(),
                reason: "path is empty".to_string(),
            });
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let document = Document {
            rotation: OrderSection {
                order: &self.rotation.order,
            },
            replay_delays: &self.rotation.replay_delays,
            featured: &self.rotation.featured,
            meeting_relevance: &self.rotation.meeting_relevance,
            gap_fill: &self.rotation.gap_fill,
            storage: &self.storage,
            logging: &self.logging,
        };
        Ok(toml::to_string_pretty(&document)?)
    }
}
