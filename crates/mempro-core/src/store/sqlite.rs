//! SQLite storage backend.
//!
//! Every record lives in one `memories` row keyed by (id, level). The full
//! record is kept as JSON in `body` so reads round-trip every field; the
//! remaining columns exist for ordering, matching and stats.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::{MemoryLevel, MemoryRecord, MemoryStats, MemoryType};

use super::migrations::run_migrations;
use super::MemoryStore;

/// Durable store backed by a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and run migrations
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn decode(body: &str) -> Result<MemoryRecord> {
        Ok(serde_json::from_str(body)?)
    }
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn save(&self, record: &MemoryRecord) -> Result<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::StoreClosed)?;

        let body = serde_json::to_string(record)?;
        let (memory_type, confidence) = match record {
            MemoryRecord::Semantic(semantic) => {
                (Some(semantic.memory_type.as_str()), Some(semantic.confidence))
            }
            _ => (None, None),
        };

        conn.execute(
            "INSERT INTO memories (id, level, body, primary_text, memory_type, confidence, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id, level) DO UPDATE SET
                body = excluded.body,
                primary_text = excluded.primary_text,
                memory_type = excluded.memory_type,
                confidence = excluded.confidence,
                updated_at = excluded.updated_at",
            params![
                record.id(),
                record.level().as_str(),
                body,
                record.primary_text(),
                memory_type,
                confidence,
                record.created_at().timestamp_micros(),
                record.updated_at().timestamp_micros(),
            ],
        )?;

        tracing::debug!(id = %record.id(), level = %record.level(), "saved record");
        Ok(())
    }

    async fn get(&self, id: &str, level: MemoryLevel) -> Result<Option<MemoryRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::StoreClosed)?;

        let result = conn.query_row(
            "SELECT body FROM memories WHERE id = ?1 AND level = ?2",
            params![id, level.as_str()],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(body) => Ok(Some(Self::decode(&body)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn search(
        &self,
        query: &str,
        level: Option<MemoryLevel>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::StoreClosed)?;

        // Matching happens in Rust so case folding agrees with the
        // in-memory backend for non-ASCII text.
        let query_lower = query.to_lowercase();
        let mut stmt = conn.prepare(
            "SELECT primary_text, body FROM memories
             WHERE (?1 IS NULL OR level = ?1)
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let mut rows = stmt.query(params![level.map(|l| l.as_str())])?;

        let mut bodies = Vec::new();
        while let Some(row) = rows.next()? {
            let primary_text: String = row.get(0)?;
            if query_lower.is_empty() || primary_text.to_lowercase().contains(&query_lower) {
                bodies.push(row.get::<_, String>(1)?);
                if bodies.len() >= limit {
                    break;
                }
            }
        }

        bodies.iter().map(|body| Self::decode(body)).collect()
    }

    async fn list(&self, level: MemoryLevel) -> Result<Vec<MemoryRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::StoreClosed)?;

        let mut stmt = conn.prepare(
            "SELECT body FROM memories WHERE level = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let bodies = stmt
            .query_map(params![level.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        bodies.iter().map(|body| Self::decode(body)).collect()
    }

    async fn stats(&self) -> Result<MemoryStats> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::StoreClosed)?;
        let mut stats = MemoryStats::default();

        // Count by level
        let mut stmt = conn.prepare("SELECT level, COUNT(*) FROM memories GROUP BY level")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (level, count) = row?;
            let count = usize::try_from(count).unwrap_or(0);
            stats.by_level.insert(level.parse::<MemoryLevel>()?, count);
            stats.total += count;
        }

        // Count semantics by type
        let mut stmt = conn.prepare(
            "SELECT memory_type, COUNT(*) FROM memories
             WHERE level = 'semantic' AND memory_type IS NOT NULL
             GROUP BY memory_type",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (memory_type, count) = row?;
            stats
                .by_type
                .insert(memory_type.parse::<MemoryType>()?, usize::try_from(count).unwrap_or(0));
        }

        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(confidence) FROM memories WHERE level = 'semantic'",
            [],
            |row| row.get(0),
        )?;
        stats.avg_confidence = avg.unwrap_or(0.0);

        Ok(stats)
    }

    async fn delete(&self, id: &str, level: MemoryLevel) -> Result<bool> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(Error::StoreClosed)?;

        let removed = conn.execute(
            "DELETE FROM memories WHERE id = ?1 AND level = ?2",
            params![id, level.as_str()],
        )?;
        Ok(removed > 0)
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| Error::Database(e))?;
            tracing::debug!("sqlite store closed");
        }
        Ok(())
    }
}
