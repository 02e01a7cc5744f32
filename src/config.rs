use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = ".arbor/config.toml";
pub const DEFAULT_DB_PATH: &str = ".arbor/state.sqlite";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Startup settings. Every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArborConfig {
    pub db_path: String,
    pub cache_ttl_secs: i64,
    pub log_filter: String,
}

impl Default for ArborConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            cache_ttl_secs: 3600,
            log_filter: "warn".to_string(),
        }
    }
}

impl ArborConfig {
    /// Reads `path` when given; otherwise the default location if present;
    /// otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(explicit) => explicit.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.db_path.trim().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".to_string()));
        }
        if self.cache_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(format!(
                "cache_ttl_secs must be positive, got {}",
                self.cache_ttl_secs
            )));
        }
        Ok(self)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::seconds(self.cache_ttl_secs)
    }
}
