//! mempro-core - Core library for the memPro hierarchical memory store
//!
//! This crate provides the data model and storage shared by the SDK and CLI:
//!
//! - **types**: The four record kinds (Original, Episode, Semantic, Theme)
//!   and the `MemoryRecord` envelope
//! - **store**: The `MemoryStore` storage port with in-memory and SQLite
//!   backends (SQLite behind the `db` feature)
//! - **error**: Construction and storage errors

pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use store::{InMemoryStore, MemoryStore};
#[cfg(feature = "db")]
pub use store::SqliteStore;
pub use types::{
    BaseMemory, EpisodeMemory, MemoryLevel, MemoryRecord, MemoryStats, MemoryType, Metadata,
    OriginalMemory, SemanticMemory, ThemeMemory,
};
