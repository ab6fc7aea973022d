//! Daemon configuration, read once at startup.

use serde::{Deserialize, Serialize};
use slopebrain::forecast::ForecastConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_ADDR: &str = "FORECASTD_ADDR";
pub const ENV_LOG: &str = "FORECASTD_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid forecast settings: {0}")]
    Invalid(&'static str),
    #[error("max_series_len must be at least 2")]
    SeriesLimit,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_series_len() -> usize {
    100_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// One of trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Longest series accepted per request; longer ones get 413.
    #[serde(default = "default_max_series_len")]
    pub max_series_len: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_level: default_log_level(),
            forecast: ForecastConfig::default(),
            max_series_len: default_max_series_len(),
        }
    }
}

impl DaemonConfig {
    /// Load from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.forecast.validate().map_err(ConfigError::Invalid)?;
        if self.max_series_len < 2 {
            return Err(ConfigError::SeriesLimit);
        }
        Ok(())
    }

    /// Apply `FORECASTD_ADDR` / `FORECASTD_LOG` on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::var(ENV_ADDR).ok(), std::env::var(ENV_LOG).ok())
    }

    fn with_overrides(mut self, addr: Option<String>, log: Option<String>) -> Self {
        if let Some(addr) = addr.filter(|a| !a.trim().is_empty()) {
            self.bind_addr = addr;
        }
        if let Some(level) = log.filter(|l| !l.trim().is_empty()) {
            self.log_level = level;
        }
        self
    }

    /// Parsed log level; `None` for unknown names.
    pub fn tracing_level(&self) -> Option<tracing::Level> {
        self.log_level.trim().parse().ok()
    }

    pub fn log_summary(&self) {
        if self.tracing_level().is_none() {
            warn!(level = %self.log_level, "Unknown log level, using info");
        }
        info!(
            bind_addr = %self.bind_addr,
            granularity = self.forecast.granularity,
            context_size = self.forecast.brain.context_size,
            learning_rate = self.forecast.brain.learning_rate,
            max_series_len = self.max_series_len,
            "Configuration loaded"
        );
    }
}
