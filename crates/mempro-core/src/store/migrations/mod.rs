//! Storage database migrations
//!
//! SQL migrations are embedded as strings and executed when a SQLite store
//! is opened.

use rusqlite::Connection;

use crate::error::Result;

/// Record table SQL (001)
pub const MEMORIES_TABLE_SQL: &str = include_str!("001_memories.sql");

/// Run all storage migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(MEMORIES_TABLE_SQL)?;
    Ok(())
}
