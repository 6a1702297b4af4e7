//! Storage port for the memory hierarchy.
//!
//! A single capability interface with one implementation per backend:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 MemoryStore                  │
//! │  save · get · search · list · stats · delete │
//! └──────────────┬───────────────────┬───────────┘
//!                │                   │
//!        ┌───────▼───────┐   ┌───────▼───────┐
//!        │ InMemoryStore │   │  SqliteStore  │
//!        │ lock per level│   │ (feature db)  │
//!        └───────────────┘   └───────────────┘
//! ```
//!
//! Absence is never an error: `get` returns `None`, `search` returns an
//! empty vector. Errors are reserved for backend faults.

mod memory;
#[cfg(feature = "db")]
mod sqlite;

#[cfg(feature = "db")]
pub mod migrations;

pub use memory::InMemoryStore;
#[cfg(feature = "db")]
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MemoryLevel, MemoryRecord, MemoryStats};

/// Core trait for memory storage operations.
///
/// Implementations own all synchronization; callers may share one store
/// across tasks.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Upsert a record by (id, level). Saving the same record twice leaves
    /// exactly one copy.
    async fn save(&self, record: &MemoryRecord) -> Result<()>;

    /// Exact lookup.
    async fn get(&self, id: &str, level: MemoryLevel) -> Result<Option<MemoryRecord>>;

    /// Case-insensitive substring match over each record's primary text,
    /// most recently created first, at most `limit` results. `None` searches
    /// every level.
    async fn search(
        &self,
        query: &str,
        level: Option<MemoryLevel>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>>;

    /// Every record of one level, oldest first.
    async fn list(&self, level: MemoryLevel) -> Result<Vec<MemoryRecord>>;

    /// Record counts.
    async fn stats(&self) -> Result<MemoryStats>;

    /// Remove a record; true iff something was removed.
    async fn delete(&self, id: &str, level: MemoryLevel) -> Result<bool>;

    /// Release backend resources. Idempotent.
    async fn close(&self) -> Result<()>;
}
