//! Application configuration
//!
//! Loaded from TOML; every field has a default so a missing or partial file
//! still yields a usable config.

use crate::ingest::leaderboard::DEFAULT_CARRIER_ID;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "SOLVERBOARD_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "solverboard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub insights: InsightConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from the path in `SOLVERBOARD_CONFIG`, or defaults.
    pub fn from_env() -> Self {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default config ({}): {}", path, e);
            Self::default()
        })
    }

    /// Save to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Parsing and task fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// `id` of the HTML element carrying the leaderboard JSON
    #[serde(default = "default_carrier_id")]
    pub carrier_id: String,

    /// Parse tasks allowed to run at once
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

fn default_carrier_id() -> String {
    DEFAULT_CARRIER_ID.to_string()
}
fn default_max_concurrent_files() -> usize {
    8
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            carrier_id: default_carrier_id(),
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

/// Outlier observation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Observations kept, in discovery order
    #[serde(default = "default_max_observations")]
    pub max_observations: usize,

    /// Relative gap `(worst - best) / best` that counts as notable
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f64,

    /// Absolute worst score that counts as notable when the best is zero
    #[serde(default = "default_zero_best_threshold")]
    pub zero_best_threshold: f64,
}

fn default_max_observations() -> usize {
    5
}
fn default_gap_threshold() -> f64 {
    0.20
}
fn default_zero_best_threshold() -> f64 {
    10.0
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            max_observations: default_max_observations(),
            gap_threshold: default_gap_threshold(),
            zero_best_threshold: default_zero_best_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "solverboard=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}
