//! Configuration for the generator daemon.
//!
//! Loads settings from /etc/upcycle/config.toml or uses defaults. The
//! combinatorial cap and per-size limit are deliberately configuration, not
//! constants: they bound external call volume, they do not encode a real
//! capacity constraint.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/upcycle/config.toml";

/// Fallback config file path
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/upcycle/config.toml";

/// Hard ceiling on subset size; the pipeline is tuned for small combinations.
pub const MAX_SUBSET_SIZE: usize = 7;

/// Generation pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Largest subset size to enumerate (clamped to 7).
    #[serde(default = "default_max_subset_size")]
    pub max_subset_size: usize,

    /// Total subsets the enumerator may emit across all sizes.
    #[serde(default = "default_combination_cap")]
    pub combination_cap: u64,

    /// Subsets per size forwarded to enrichment.
    #[serde(default = "default_per_size_limit")]
    pub per_size_limit: usize,

    /// Concurrent oracle calls per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches, respecting oracle rate limits.
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,

    /// Back-to-back storage failures before the run aborts.
    #[serde(default = "default_max_consecutive_storage_failures")]
    pub max_consecutive_storage_failures: usize,
}

fn default_max_subset_size() -> usize {
    MAX_SUBSET_SIZE
}

fn default_combination_cap() -> u64 {
    350
}

fn default_per_size_limit() -> usize {
    30
}

fn default_batch_size() -> usize {
    3
}

fn default_inter_batch_delay_ms() -> u64 {
    2000
}

fn default_max_consecutive_storage_failures() -> usize {
    5
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_subset_size: default_max_subset_size(),
            combination_cap: default_combination_cap(),
            per_size_limit: default_per_size_limit(),
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            max_consecutive_storage_failures: default_max_consecutive_storage_failures(),
        }
    }
}

/// Enrichment oracle endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_enabled")]
    pub enabled: bool,

    /// Ollama-style endpoint serving /api/generate and /api/render.
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// Per-call timeout; a timed-out call is a failure, never a stall.
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

fn default_oracle_enabled() -> bool {
    true
}

fn default_oracle_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_oracle_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_oracle_timeout() -> u64 {
    30
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: default_oracle_enabled(),
            endpoint: default_oracle_endpoint(),
            model: default_oracle_model(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

/// Catalog storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "/var/lib/upcycle/catalog.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load from the standard locations, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
            .normalized()
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config.normalized())
    }

    /// Clamp out-of-range values instead of failing the run.
    pub fn normalized(mut self) -> Self {
        if self.generator.max_subset_size > MAX_SUBSET_SIZE {
            warn!(
                "max_subset_size {} exceeds ceiling, clamping to {}",
                self.generator.max_subset_size, MAX_SUBSET_SIZE
            );
            self.generator.max_subset_size = MAX_SUBSET_SIZE;
        }
        if self.generator.max_subset_size == 0 {
            self.generator.max_subset_size = 1;
        }
        if self.generator.batch_size == 0 {
            self.generator.batch_size = 1;
        }
        if self.generator.per_size_limit == 0 {
            self.generator.per_size_limit = 1;
        }
        self
    }
}
