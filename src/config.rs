use crate::constants;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything the orchestrator needs, passed in at construction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the store holding raw batches, the seen-batch set and the genre cache
    pub source_root: PathBuf,
    /// Root of the store holding the cumulative dataset
    pub dest_root: PathBuf,
    pub batch_prefix: String,
    pub seen_key: String,
    pub genre_cache_key: String,
    pub dataset_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("data"),
            dest_root: PathBuf::from("data"),
            batch_prefix: constants::DEFAULT_BATCH_PREFIX.to_string(),
            seen_key: constants::DEFAULT_SEEN_KEY.to_string(),
            genre_cache_key: constants::DEFAULT_GENRE_CACHE_KEY.to_string(),
            dataset_key: constants::DEFAULT_DATASET_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub api_base: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            api_base: constants::DEFAULT_API_BASE.to_string(),
            token_env: constants::DEFAULT_TOKEN_ENV.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: constants::DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl MetadataConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl PipelineConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                PipelineError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        let config = config.with_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `LISTENING_*` overrides using the given lookup.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty("LISTENING_SOURCE_ROOT") {
            self.storage.source_root = PathBuf::from(v);
        }
        if let Some(v) = non_empty("LISTENING_DEST_ROOT") {
            self.storage.dest_root = PathBuf::from(v);
        }
        if let Some(v) = non_empty("LISTENING_API_BASE") {
            self.metadata.api_base = v;
        }
        if let Some(v) = non_empty("LISTENING_TOKEN_ENV") {
            self.metadata.token_env = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.metadata.max_attempts == 0 {
            return Err(PipelineError::Config(
                "metadata.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.metadata.request_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "metadata.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.storage.batch_prefix.is_empty() {
            return Err(PipelineError::Config(
                "storage.batch_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
