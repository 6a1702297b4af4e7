//! In-memory storage backend.
//!
//! One `tokio::sync::RwLock` per level serializes writers on that level while
//! readers share it. Records keep the sequence number of their first save so
//! upserts never reorder search results.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{MemoryLevel, MemoryRecord, MemoryStats};

use super::MemoryStore;

#[derive(Default)]
struct LevelTable {
    by_seq: BTreeMap<u64, MemoryRecord>,
    seq_by_id: HashMap<String, u64>,
}

/// Volatile store backed by per-level maps
pub struct InMemoryStore {
    levels: [RwLock<LevelTable>; 4],
    next_seq: AtomicU64,
    closed: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            levels: std::array::from_fn(|_| RwLock::new(LevelTable::default())),
            next_seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn table(&self, level: MemoryLevel) -> Result<&RwLock<LevelTable>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::StoreClosed);
        }
        Ok(&self.levels[level.index()])
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn save(&self, record: &MemoryRecord) -> Result<()> {
        let mut table = self.table(record.level())?.write().await;

        let seq = match table.seq_by_id.get(record.id()) {
            Some(seq) => *seq,
            None => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                table.seq_by_id.insert(record.id().to_string(), seq);
                seq
            }
        };
        table.by_seq.insert(seq, record.clone());

        tracing::debug!(id = %record.id(), level = %record.level(), "saved record");
        Ok(())
    }

    async fn get(&self, id: &str, level: MemoryLevel) -> Result<Option<MemoryRecord>> {
        let table = self.table(level)?.read().await;
        Ok(table
            .seq_by_id
            .get(id)
            .and_then(|seq| table.by_seq.get(seq))
            .cloned())
    }

    async fn search(
        &self,
        query: &str,
        level: Option<MemoryLevel>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let query_lower = query.to_lowercase();
        let levels: Vec<MemoryLevel> = match level {
            Some(level) => vec![level],
            None => MemoryLevel::ALL.to_vec(),
        };

        let mut hits: Vec<(u64, MemoryRecord)> = Vec::new();
        for level in levels {
            let table = self.table(level)?.read().await;
            hits.extend(
                table
                    .by_seq
                    .iter()
                    .rev()
                    .filter(|(_, record)| record.matches(&query_lower))
                    .take(limit)
                    .map(|(seq, record)| (*seq, record.clone())),
            );
        }

        // Newest first across levels
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        hits.truncate(limit);

        Ok(hits.into_iter().map(|(_, record)| record).collect())
    }

    async fn list(&self, level: MemoryLevel) -> Result<Vec<MemoryRecord>> {
        let table = self.table(level)?.read().await;
        Ok(table.by_seq.values().cloned().collect())
    }

    async fn stats(&self) -> Result<MemoryStats> {
        let mut records = Vec::new();
        for level in MemoryLevel::ALL {
            let table = self.table(level)?.read().await;
            records.extend(table.by_seq.values().cloned());
        }
        Ok(MemoryStats::from_records(&records))
    }

    async fn delete(&self, id: &str, level: MemoryLevel) -> Result<bool> {
        let mut table = self.table(level)?.write().await;
        match table.seq_by_id.remove(id) {
            Some(seq) => {
                table.by_seq.remove(&seq);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for lock in &self.levels {
            let mut table = lock.write().await;
            table.by_seq.clear();
            table.seq_by_id.clear();
        }
        tracing::debug!("in-memory store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Metadata, OriginalMemory, ThemeMemory};

    fn original(content: &str) -> MemoryRecord {
        OriginalMemory::new(content, "user", "default", Metadata::new())
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemoryStore::new();
        let record = original("git status");

        store.save(&record).await.unwrap();

        let fetched = store.get(record.id(), MemoryLevel::Original).await.unwrap();
        assert_eq!(fetched, Some(record.clone()));

        // Same id at a different level is a different key
        let missing = store.get(record.id(), MemoryLevel::Episode).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let store = InMemoryStore::new();
        let record = original("dark mode");

        store.save(&record).await.unwrap();
        store.save(&record).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.count(MemoryLevel::Original), 1);
    }

    #[tokio::test]
    async fn test_search_newest_first_with_limit() {
        let store = InMemoryStore::new();
        let first = original("git status");
        let second = original("npm install");
        let third = original("GIT log");
        for record in [&first, &second, &third] {
            store.save(record).await.unwrap();
        }

        let hits = store.search("git", Some(MemoryLevel::Original), 10).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![third.id(), first.id()]);

        let capped = store.search("git", None, 1).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id(), third.id());
    }

    #[tokio::test]
    async fn test_upsert_keeps_position() {
        let store = InMemoryStore::new();
        let mut theme = ThemeMemory::new("coding", "").unwrap();
        let newer = ThemeMemory::new("coding style", "").unwrap();

        store.save(&theme.clone().into()).await.unwrap();
        store.save(&newer.clone().into()).await.unwrap();

        theme.add_semantic("s-1");
        store.save(&theme.clone().into()).await.unwrap();

        let listed = store.list(MemoryLevel::Theme).await.unwrap();
        assert_eq!(listed[0].id(), theme.base.id);
        assert_eq!(listed[1].id(), newer.base.id);

        let stored = listed[0].clone().into_theme().unwrap();
        assert_eq!(stored.semantic_ids, vec!["s-1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        let record = original("forget me");
        store.save(&record).await.unwrap();

        assert!(store.delete(record.id(), MemoryLevel::Original).await.unwrap());
        assert!(!store.delete(record.id(), MemoryLevel::Original).await.unwrap());
        assert_eq!(store.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = InMemoryStore::new();
        store.save(&original("hello")).await.unwrap();

        store.close().await.unwrap();
        store.close().await.unwrap();

        let err = store.stats().await.unwrap_err();
        assert!(matches!(err, Error::StoreClosed));
    }

    #[test]
    fn test_empty_store_stats() {
        let store = InMemoryStore::new();
        let stats = tokio_test::block_on(store.stats()).unwrap();

        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_level.len(), 4);
        assert_eq!(stats.avg_confidence, 0.0);
    }
}
