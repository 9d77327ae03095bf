use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::memory::search::SearchWeights;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CortexConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub session: SessionConfig,
    pub activity: ActivityConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Project scope stamped on new memories and sessions; empty means the
    /// current working directory.
    pub project_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: u32,
    pub keyword_weight: f64,
    pub semantic_weight: f64,
    pub importance_weight: f64,
    pub recency_weight: f64,
    pub frequency_weight: f64,
}

impl SearchConfig {
    pub fn weights(&self) -> SearchWeights {
        SearchWeights {
            keyword: self.keyword_weight,
            semantic: self.semantic_weight,
            importance: self.importance_weight,
            recency: self.recency_weight,
            frequency: self.frequency_weight,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle seconds before a session marker is considered dead.
    pub timeout_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ActivityConfig {
    /// Days without access before `review mark` flags a fresh memory.
    pub review_age_days: u32,
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            session: SessionConfig::default(),
            activity: ActivityConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_cortex_dir()
            .join("cortex.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            project_path: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_cortex_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let weights = SearchWeights::default();
        Self {
            default_limit: 10,
            keyword_weight: weights.keyword,
            semantic_weight: weights.semantic,
            importance_weight: weights.importance,
            recency_weight: weights.recency,
            frequency_weight: weights.frequency,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: crate::session::marker::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            review_age_days: 90,
        }
    }
}

/// Returns `~/.cortex/`
pub fn default_cortex_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".cortex")
}

/// Returns the default config file path: `~/.cortex/config.toml`
pub fn default_config_path() -> PathBuf {
    default_cortex_dir().join("config.toml")
}

impl CortexConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CortexConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (CORTEX_DB, CORTEX_PROJECT,
    /// CORTEX_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CORTEX_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("CORTEX_PROJECT") {
            self.storage.project_path = val;
        }
        if let Ok(val) = std::env::var("CORTEX_LOG_LEVEL") {
            self.logging.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Project directory: the configured one, or the current working
    /// directory when unset.
    pub fn resolved_project_dir(&self) -> Result<PathBuf> {
        if self.storage.project_path.is_empty() {
            std::env::current_dir().context("resolving current directory")
        } else {
            Ok(expand_tilde(&self.storage.project_path))
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
