//! Configuration management for mempro.
//!
//! Configuration is loaded with precedence:
//! 1. `--config` flag or `MEMPRO_CONFIG`
//! 2. Config file (~/.mempro/config.toml)
//! 3. Default values, with a SQLite store at ~/.mempro/memory.db
//!
//! The CLI persists between invocations, so a file that does not pick a
//! storage backend gets SQLite rather than the in-memory library default.

use anyhow::{Context, Result};
use mempro_sdk::{MemoryConfig, StorageBackend};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Base directory for mempro data
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mempro")
}

/// Get the config file path.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => data_dir().join("config.toml"),
    }
}

/// Load configuration for the CLI.
pub fn load(explicit: Option<&Path>) -> Result<MemoryConfig> {
    let config_path = config_path(explicit);
    let exists = config_path.exists();
    debug!(path = %config_path.display(), exists, "Resolved config path");

    let config = if exists {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        parse(&content).context("Failed to parse config file")?
    } else {
        parse("")?
    };

    config.validate().context("Invalid configuration")?;
    debug!(
        backend = ?config.storage.backend,
        store = ?config.storage.path,
        "Loaded configuration"
    );
    Ok(config)
}

fn parse(content: &str) -> Result<MemoryConfig> {
    let mut config = MemoryConfig::from_toml_str(content)?;

    let table: toml::Table = content.parse()?;
    let backend_chosen = table
        .get("storage")
        .and_then(|storage| storage.get("backend"))
        .is_some();
    if !backend_chosen {
        config.storage.backend = StorageBackend::Sqlite;
    }

    if config.storage.backend == StorageBackend::Sqlite && config.storage.path.is_none() {
        config.storage.path = Some(data_dir().join("memory.db"));
    }

    Ok(config)
}
