//! Cached configuration loading with explicit reload
//!
//! The provider reads its source once and hands out the same `Arc<Config>`
//! until `reload` is called. `is_stale` compares the backing file's
//! modification time with the one seen at load, so callers can decide when a
//! reload is worthwhile. A failed reload keeps the previous configuration.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use super::{Config, ConfigError, ConfigWarning, RotationConfig};

/// Where configuration text comes from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A TOML file; missing files yield defaults
    File(PathBuf),
    /// TOML text held in memory
    Inline(String),
    /// Hard-coded defaults only
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Inline(_) => write!(f, "inline"),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

struct Loaded {
    config: Arc<Config>,
    modified: Option<SystemTime>,
    warnings: Vec<ConfigWarning>,
}

/// Configuration provider
pub struct ConfigProvider {
    source: ConfigSource,
    env_overrides: bool,
    cache: RwLock<Option<Loaded>>,
}

impl ConfigProvider {
    /// Create a provider for a source
    pub fn new(source: ConfigSource) -> Self {
        Self {
            source,
            env_overrides: false,
            cache: RwLock::new(None),
        }
    }

    /// Provider backed by a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ConfigSource::File(path.into()))
    }

    /// Provider backed by in-memory TOML text
    pub fn inline(text: impl Into<String>) -> Self {
        Self::new(ConfigSource::Inline(text.into()))
    }

    /// Provider that only serves defaults
    pub fn defaults() -> Self {
        Self::new(ConfigSource::Defaults)
    }

    /// Apply environment overrides on every (re)load
    pub fn with_env_overrides(mut self, enabled: bool) -> Self {
        self.env_overrides = enabled;
        self
    }

    /// Source description
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Get the configuration, reading the source on first use
    pub fn load(&self) -> Result<Arc<Config>, ConfigError> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(loaded) = cache.as_ref() {
                return Ok(Arc::clone(&loaded.config));
            }
        }
        self.reload()
    }

    /// Re-read the source and replace the cached configuration
    pub fn reload(&self) -> Result<Arc<Config>, ConfigError> {
        let loaded = self.read_source()?;
        let config = Arc::clone(&loaded.config);

        tracing::info!(
            source = %self.source,
            warnings = loaded.warnings.len(),
            order = ?config.rotation.order,
            "Configuration loaded"
        );

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = Some(loaded);
        Ok(config)
    }

    /// Rotation policy from the current configuration
    pub fn rotation(&self) -> Result<RotationConfig, ConfigError> {
        Ok(self.load()?.rotation.clone())
    }

    /// Check whether the cached configuration may be out of date
    pub fn is_stale(&self) -> bool {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        let Some(loaded) = cache.as_ref() else {
            return true;
        };

        match &self.source {
            ConfigSource::File(path) => {
                let current = std::fs::metadata(path).and_then(|m| m.modified()).ok();
                current != loaded.modified
            }
            ConfigSource::Inline(_) | ConfigSource::Defaults => false,
        }
    }

    /// Keys rejected by the last successful load
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .map(|l| l.warnings.clone())
            .unwrap_or_default()
    }

    fn read_source(&self) -> Result<Loaded, ConfigError> {
        let (config, warnings, modified) = match &self.source {
            ConfigSource::File(path) => match std::fs::metadata(path) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                    (Config::default(), Vec::new(), None)
                }
                Err(source) => {
                    return Err(ConfigError::Read {
                        path: path.clone(),
                        source,
                    })
                }
                Ok(meta) => {
                    let (config, warnings) = Config::from_file(path)?;
                    (config, warnings, meta.modified().ok())
                }
            },
            ConfigSource::Inline(text) => {
                let (config, warnings) = Config::from_toml_str(text, "inline")?;
                (config, warnings, None)
            }
            ConfigSource::Defaults => (Config::default(), Vec::new(), None),
        };

        let config = if self.env_overrides {
            config.with_env_overrides()
        } else {
            config
        };

        Ok(Loaded {
            config: Arc::new(config),
            modified,
            warnings,
        })
    }
}
