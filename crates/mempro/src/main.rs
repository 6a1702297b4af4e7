//! mempro - memPro hierarchical memory CLI
//!
//! Memorize conversation snippets and retrieve facts with their themes
//! and source episodes from a local store.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod commands;
mod config;

use cli::Cli;
use mempro_sdk::MemoryService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (stderr keeps stdout clean for JSON output)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("mempro=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::load(cli.config.as_deref())?;

    let service = Arc::new(MemoryService::new(config).context("Failed to open memory store")?);
    service.init().await.context("Memory store is not reachable")?;

    // Execute command, closing the store either way
    let result = commands::memory::execute(cli.command, &service).await;
    service.close().await.context("Failed to close memory store")?;
    result
}
