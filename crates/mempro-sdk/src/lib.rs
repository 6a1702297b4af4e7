//! memPro SDK - Hierarchical conversational memory
//!
//! Conversation turns are stored once and distilled upward through four
//! levels, each keeping references back to the level below:
//!
//! - **Original** - raw utterances
//! - **Episode** - coherent spans of utterances
//! - **Semantic** - reusable facts, preferences, goals, constraints, events
//! - **Theme** - named clusters of facts keyed by entity
//!
//! # Modules
//!
//! - **service** - `MemoryService` with memorize / retrieve / stats
//! - **hierarchy** - processors, coherence estimators, theme resolver
//! - **tools** - JSON tool descriptors for agent frameworks
//! - **providers** - embedding and LLM seams
//! - **config** - `MemoryConfig` loaded from TOML
//!
//! # Example
//!
//! ```rust,no_run
//! use mempro_sdk::{MemoryConfig, MemoryService, MemorizeOptions, MemoryType};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let service = MemoryService::new(MemoryConfig::sqlite("memory.db"))?;
//!     service.init().await?;
//!
//!     service
//!         .memorize(
//!             "User prefers dark mode for coding",
//!             MemorizeOptions::default()
//!                 .with_type(MemoryType::Preference)
//!                 .with_entities(["User", "dark mode", "coding"])
//!                 .with_confidence(0.9),
//!         )
//!         .await?;
//!
//!     let context = service.retrieve("dark mode", None).await?;
//!     println!("{} facts, {} tokens", context.semantics.len(), context.total_tokens);
//!
//!     service.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod providers;
pub mod service;
pub mod tools;

/// Record model and storage from mempro-core
pub use mempro_core::{store, types};

pub use config::{
    CoherenceStrategy, ConfigValidationError, HierarchyConfig, MAX_SUMMARY_CHARS, MemoryConfig,
    RetrievalConfig, StorageBackend, StorageConfig,
};
pub use error::{SDKError, SDKResult};
pub use mempro_core::{
    EpisodeMemory, InMemoryStore, MemoryLevel, MemoryRecord, MemoryStats, MemoryStore,
    MemoryType, Metadata, OriginalMemory, SemanticMemory, SqliteStore, ThemeMemory,
};
pub use providers::{CompletionRequest, EmbeddingProvider, LlmProvider, cosine_similarity};
pub use service::{MemorizeOptions, MemorizeResult, MemoryService, RetrieveResult};
pub use tools::{MemoryTools, ToolDefinition};
