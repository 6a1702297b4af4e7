//! SDK Configuration
//!
//! Defines configuration options for the memory service. The struct is
//! immutable once handed to `MemoryService::new`; there is no global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for `hierarchy.max_summary_chars`
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Memory service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Storage backend selection
    pub storage: StorageConfig,

    /// Processor and theme resolution settings
    pub hierarchy: HierarchyConfig,

    /// Retrieval limits
    pub retrieval: RetrievalConfig,
}

/// Storage backend choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Storage configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend (default: memory)
    pub backend: StorageBackend,

    /// SQLite database file, required for the sqlite backend
    pub path: Option<PathBuf>,
}

/// Coherence estimator used for multi-utterance episodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoherenceStrategy {
    #[default]
    Fixed,
    Lexical,
}

/// Hierarchy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Maximum episode summary length in characters, 1..=500 (default: 500)
    pub max_summary_chars: usize,

    /// Coherence assigned to multi-utterance episodes by the fixed strategy (default: 0.7)
    pub multi_utterance_coherence: f64,

    /// Coherence strategy (default: fixed)
    pub coherence: CoherenceStrategy,

    /// Run theme lookup and save as one critical section (default: true)
    pub serialize_theme_resolution: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_summary_chars: MAX_SUMMARY_CHARS,
            multi_utterance_coherence: 0.7,
            coherence: CoherenceStrategy::Fixed,
            serialize_theme_resolution: true,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Result cap when the caller gives none (default: 5)
    pub default_top_k: usize,

    /// Resolve matched episodes' originals into the result (default: false)
    pub expand_originals: bool,

    /// Characters per estimated token (default: 4)
    pub chars_per_token: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            expand_originals: false,
            chars_per_token: 4,
        }
    }
}

impl MemoryConfig {
    /// In-memory configuration with defaults everywhere
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// SQLite-backed configuration at `path`
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Sqlite,
                path: Some(path.into()),
            },
            ..Default::default()
        }
    }

    /// Set hierarchy configuration
    pub fn with_hierarchy(mut self, hierarchy: HierarchyConfig) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Set retrieval configuration
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Parse a TOML document; absent keys take their defaults
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a TOML file. A missing file yields the default config.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.backend == StorageBackend::Sqlite && self.storage.path.is_none() {
            return Err(ConfigValidationError::MissingStoragePath);
        }

        if !(1..=MAX_SUMMARY_CHARS).contains(&self.hierarchy.max_summary_chars) {
            return Err(ConfigValidationError::InvalidValue {
                field: "hierarchy.max_summary_chars".into(),
                message: format!("must be between 1 and {MAX_SUMMARY_CHARS}"),
            });
        }

        let coherence = self.hierarchy.multi_utterance_coherence;
        if coherence.is_nan() || !(0.0..=1.0).contains(&coherence) {
            return Err(ConfigValidationError::InvalidValue {
                field: "hierarchy.multi_utterance_coherence".into(),
                message: "must be between 0 and 1".into(),
            });
        }

        if self.retrieval.default_top_k == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "retrieval.default_top_k".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.retrieval.chars_per_token == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "retrieval.chars_per_token".into(),
                message: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("storage.path is required for the sqlite backend")]
    MissingStoragePath,

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
