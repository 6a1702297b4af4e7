//! Memory Service
//!
//! Orchestrates the hierarchy over a `MemoryStore`:
//! - `memorize` builds Original → Episode → Semantic, then resolves a Theme
//! - `retrieve` searches Semantics and expands to Themes and Episodes
//!
//! `memorize` is not atomic across layers. Every record is built (and so
//! validated) before the first write; after that a storage fault stops the
//! pipeline and the result reports which layers were already committed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use mempro_core::types::check_unit_score;
use mempro_core::{
    EpisodeMemory, InMemoryStore, MemoryLevel, MemoryRecord, MemoryStats, MemoryStore,
    MemoryType, Metadata, OriginalMemory, SemanticMemory, SqliteStore, ThemeMemory,
};

use crate::config::{MemoryConfig, StorageBackend};
use crate::hierarchy::processors::DEFAULT_BOUNDARY;
use crate::hierarchy::{
    EpisodeProcessor, OriginalProcessor, SemanticProcessor, ThemeResolver, estimator_for,
};
use crate::{SDKError, SDKResult};

/// Default confidence for a memorized fact
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Options for memorize operations
#[derive(Debug, Clone)]
pub struct MemorizeOptions {
    pub memory_type: MemoryType,
    pub entities: Vec<String>,
    pub confidence: f64,
    /// `speaker` and `session_id` string keys also tag the Original
    pub metadata: Metadata,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl Default for MemorizeOptions {
    fn default() -> Self {
        Self {
            memory_type: MemoryType::Fact,
            entities: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
            metadata: Metadata::new(),
            valid_from: None,
            valid_until: None,
        }
    }
}

impl MemorizeOptions {
    pub fn with_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = memory_type;
        self
    }

    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = entities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Outcome of a memorize call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorizeResult {
    pub success: bool,
    /// Ids of the first Original; conversations add the rest to `extra_original_ids`
    pub original_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_original_ids: Vec<String>,
    pub episode_id: Option<String>,
    pub semantic_id: Option<String>,
    pub theme_id: Option<String>,
    pub message: String,
}

/// Outcome of a retrieve call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrieveResult {
    pub themes: Vec<ThemeMemory>,
    pub semantics: Vec<SemanticMemory>,
    pub episodes: Vec<EpisodeMemory>,
    /// Populated only when `retrieval.expand_originals` is set
    pub originals: Vec<OriginalMemory>,
    pub total_tokens: usize,
    pub evidence_density: f64,
}

/// Records built for one memorize call, ready to persist
struct Pipeline {
    originals: Vec<OriginalMemory>,
    episode: EpisodeMemory,
    semantic: SemanticMemory,
}

/// Hierarchical memory service
pub struct MemoryService {
    config: MemoryConfig,
    store: Arc<dyn MemoryStore>,
    originals: OriginalProcessor,
    episodes: EpisodeProcessor,
    semantics: SemanticProcessor,
    themes: ThemeResolver,
    theme_lock: Mutex<()>,
}

impl MemoryService {
    /// Create a service with the backend the config selects
    pub fn new(config: MemoryConfig) -> SDKResult<Self> {
        config.validate()?;

        let store: Arc<dyn MemoryStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryStore::new()),
            StorageBackend::Sqlite => {
                let path = config
                    .storage
                    .path
                    .as_ref()
                    .ok_or(crate::config::ConfigValidationError::MissingStoragePath)?;
                Arc::new(SqliteStore::open(path)?)
            }
        };

        Self::with_store(config, store)
    }

    /// Create a service over an existing store
    pub fn with_store(config: MemoryConfig, store: Arc<dyn MemoryStore>) -> SDKResult<Self> {
        config.validate()?;

        let episodes = EpisodeProcessor::new(
            config.hierarchy.max_summary_chars,
            estimator_for(&config.hierarchy),
        );

        Ok(Self {
            config,
            store,
            originals: OriginalProcessor,
            episodes,
            semantics: SemanticProcessor,
            themes: ThemeResolver,
            theme_lock: Mutex::new(()),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    /// Check the backend is reachable
    pub async fn init(&self) -> SDKResult<()> {
        let stats = self.store.stats().await?;
        info!(
            backend = ?self.config.storage.backend,
            records = stats.total,
            "memory service initialized"
        );
        Ok(())
    }

    /// Store one utterance as a new episode and fact
    pub async fn memorize(&self, content: &str, options: MemorizeOptions) -> SDKResult<MemorizeResult> {
        self.memorize_conversation(&[content], content, options).await
    }

    /// Store several utterances as one episode carrying a single fact
    pub async fn memorize_conversation(
        &self,
        utterances: &[&str],
        fact: &str,
        options: MemorizeOptions,
    ) -> SDKResult<MemorizeResult> {
        let pipeline = self.build(utterances, fact, options)?;

        let mut result = MemorizeResult::default();
        match self.persist(&pipeline, &mut result).await {
            Ok(()) => {
                result.success = true;
                result.message = "Memorized successfully".to_string();
                debug!(
                    semantic_id = ?result.semantic_id,
                    theme_id = ?result.theme_id,
                    "memorized"
                );
            }
            Err(e) => {
                warn!(error = %e, "memorize stopped after partial write");
                result.success = false;
                result.message = e.to_string();
            }
        }
        Ok(result)
    }

    /// Build every record up front so validation precedes any write
    fn build(&self, utterances: &[&str], fact: &str, options: MemorizeOptions) -> SDKResult<Pipeline> {
        if utterances.is_empty() {
            return Err(SDKError::validation("at least one utterance is required"));
        }
        check_unit_score("confidence", options.confidence)?;

        let speaker = options.metadata_str("speaker");
        let session_id = options.metadata_str("session_id");
        let originals = utterances
            .iter()
            .map(|text| {
                self.originals
                    .process(text, speaker, session_id, options.metadata.clone())
            })
            .collect::<mempro_core::Result<Vec<_>>>()?;

        let episode = self.episodes.process(&originals, DEFAULT_BOUNDARY)?;
        let semantic = self
            .semantics
            .process(
                &episode,
                fact,
                options.memory_type,
                options.entities,
                options.confidence,
            )?
            .with_validity(options.valid_from, options.valid_until)?;

        Ok(Pipeline {
            originals,
            episode,
            semantic,
        })
    }

    async fn persist(&self, pipeline: &Pipeline, result: &mut MemorizeResult) -> SDKResult<()> {
        for original in &pipeline.originals {
            self.save(original.clone().into()).await?;
            if result.original_id.is_none() {
                result.original_id = Some(original.base.id.clone());
            } else {
                result.extra_original_ids.push(original.base.id.clone());
            }
        }

        self.save(pipeline.episode.clone().into()).await?;
        result.episode_id = Some(pipeline.episode.base.id.clone());

        self.save(pipeline.semantic.clone().into()).await?;
        result.semantic_id = Some(pipeline.semantic.base.id.clone());

        result.theme_id = self.resolve_theme(&pipeline.semantic).await?;
        Ok(())
    }

    async fn save(&self, record: MemoryRecord) -> SDKResult<()> {
        let level = record.level();
        self.store
            .save(&record)
            .await
            .map_err(|e| SDKError::at_level(e, level))
    }

    /// List themes, resolve, save. Serialized when configured so two
    /// concurrent calls with the same entity cannot both create a Theme.
    async fn resolve_theme(&self, semantic: &SemanticMemory) -> SDKResult<Option<String>> {
        if semantic.entity_refs.iter().all(|e| e.trim().is_empty()) {
            return Ok(None);
        }

        let _guard = if self.config.hierarchy.serialize_theme_resolution {
            Some(self.theme_lock.lock().await)
        } else {
            None
        };

        let known = self
            .store
            .list(MemoryLevel::Theme)
            .await
            .map_err(|e| SDKError::at_level(e, MemoryLevel::Theme))?
            .into_iter()
            .filter_map(MemoryRecord::into_theme);

        let Some(resolved) = self
            .themes
            .resolve(semantic, known)
            .map_err(|e| SDKError::at_level(e, MemoryLevel::Theme))?
        else {
            return Ok(None);
        };

        let mut theme = resolved.theme;
        theme.add_semantic(&semantic.base.id);
        let theme_id = theme.base.id.clone();
        if resolved.created {
            info!(theme_id = %theme_id, name = %theme.name, "created theme");
        }
        self.save(theme.into()).await?;

        Ok(Some(theme_id))
    }

    /// Search Semantics and expand to their Themes and Episodes
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> SDKResult<RetrieveResult> {
        let top_k = top_k.unwrap_or(self.config.retrieval.default_top_k);

        let semantics: Vec<SemanticMemory> = self
            .store
            .search(query, Some(MemoryLevel::Semantic), top_k)
            .await
            .map_err(|e| SDKError::at_level(e, MemoryLevel::Semantic))?
            .into_iter()
            .filter_map(MemoryRecord::into_semantic)
            .collect();

        // Themes by entity, one per entity
        let mut seen_entities = HashSet::new();
        let mut seen_themes = HashSet::new();
        let mut themes = Vec::new();
        for entity in semantics.iter().flat_map(|s| &s.entity_refs) {
            if entity.trim().is_empty() || !seen_entities.insert(entity.as_str()) {
                continue;
            }
            let found = self
                .store
                .search(entity, Some(MemoryLevel::Theme), 1)
                .await
                .map_err(|e| SDKError::at_level(e, MemoryLevel::Theme))?;
            for theme in found.into_iter().filter_map(MemoryRecord::into_theme) {
                if seen_themes.insert(theme.base.id.clone()) {
                    themes.push(theme);
                }
            }
        }

        let mut seen_episodes = HashSet::new();
        let mut episodes = Vec::new();
        for episode_id in semantics.iter().flat_map(|s| &s.source_episodes) {
            if !seen_episodes.insert(episode_id.as_str()) {
                continue;
            }
            if let Some(episode) = self
                .get(episode_id, MemoryLevel::Episode)
                .await?
                .and_then(MemoryRecord::into_episode)
            {
                episodes.push(episode);
            }
        }

        let mut originals = Vec::new();
        if self.config.retrieval.expand_originals {
            let mut seen_originals = HashSet::new();
            for original_id in episodes.iter().flat_map(|e| &e.original_ids) {
                if !seen_originals.insert(original_id.as_str()) {
                    continue;
                }
                if let Some(original) = self
                    .get(original_id, MemoryLevel::Original)
                    .await?
                    .and_then(MemoryRecord::into_original)
                {
                    originals.push(original);
                }
            }
        }

        let chars: usize = semantics.iter().map(|s| s.content.chars().count()).sum();
        let total_tokens = chars / self.config.retrieval.chars_per_token.max(1);
        let evidence_density = semantics.len() as f64 / top_k.max(1) as f64;

        debug!(
            query,
            semantics = semantics.len(),
            themes = themes.len(),
            episodes = episodes.len(),
            "retrieved"
        );

        Ok(RetrieveResult {
            themes,
            semantics,
            episodes,
            originals,
            total_tokens,
            evidence_density,
        })
    }

    /// Record counts across the hierarchy
    pub async fn stats(&self) -> SDKResult<MemoryStats> {
        Ok(self.store.stats().await?)
    }

    /// Fetch one record
    pub async fn get(&self, id: &str, level: MemoryLevel) -> SDKResult<Option<MemoryRecord>> {
        self.store
            .get(id, level)
            .await
            .map_err(|e| SDKError::at_level(e, level))
    }

    /// Remove one record; true if it existed
    pub async fn delete(&self, id: &str, level: MemoryLevel) -> SDKResult<bool> {
        let removed = self
            .store
            .delete(id, level)
            .await
            .map_err(|e| SDKError::at_level(e, level))?;
        if removed {
            info!(id, level = %level, "deleted record");
        }
        Ok(removed)
    }

    /// Release the backend. Idempotent.
    pub async fn close(&self) -> SDKResult<()> {
        self.store.close().await?;
        info!("memory service closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn service() -> MemoryService {
        MemoryService::new(MemoryConfig::in_memory()).unwrap()
    }

    fn preference(entities: &[&str]) -> MemorizeOptions {
        MemorizeOptions::default()
            .with_type(MemoryType::Preference)
            .with_entities(entities.iter().copied())
            .with_confidence(0.9)
    }

    /// Store that fails every save at one level
    struct FailingAt {
        inner: InMemoryStore,
        level: MemoryLevel,
        armed: AtomicBool,
    }

    #[async_trait]
    impl MemoryStore for FailingAt {
        async fn save(&self, record: &MemoryRecord) -> mempro_core::Result<()> {
            if record.level() == self.level && self.armed.load(Ordering::SeqCst) {
                return Err(mempro_core::Error::StoreClosed);
            }
            self.inner.save(record).await
        }
        async fn get(&self, id: &str, level: MemoryLevel) -> mempro_core::Result<Option<MemoryRecord>> {
            self.inner.get(id, level).await
        }
        async fn search(
            &self,
            query: &str,
            level: Option<MemoryLevel>,
            limit: usize,
        ) -> mempro_core::Result<Vec<MemoryRecord>> {
            self.inner.search(query, level, limit).await
        }
        async fn list(&self, level: MemoryLevel) -> mempro_core::Result<Vec<MemoryRecord>> {
            self.inner.list(level).await
        }
        async fn stats(&self) -> mempro_core::Result<MemoryStats> {
            self.inner.stats().await
        }
        async fn delete(&self, id: &str, level: MemoryLevel) -> mempro_core::Result<bool> {
            self.inner.delete(id, level).await
        }
        async fn close(&self) -> mempro_core::Result<()> {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn test_memorize_builds_all_layers() {
        let service = service();
        service.init().await.unwrap();

        let result = service
            .memorize(
                "User prefers dark mode for coding",
                preference(&["User", "dark mode", "coding"]),
            )
            .await
            .unwrap();

        assert!(result.success);
        let theme_id = result.theme_id.clone().unwrap();
        let theme = service
            .get(&theme_id, MemoryLevel::Theme)
            .await
            .unwrap()
            .and_then(MemoryRecord::into_theme)
            .unwrap();
        assert_eq!(theme.name, "User");
        assert_eq!(theme.semantic_ids, vec![result.semantic_id.clone().unwrap()]);
    }

    #[tokio::test]
    async fn test_second_fact_joins_existing_theme() {
        let service = service();
        let first = service
            .memorize("User prefers dark mode", preference(&["User"]))
            .await
            .unwrap();
        let second = service
            .memorize("User writes Rust", preference(&["user", "Rust"]))
            .await
            .unwrap();

        assert_eq!(first.theme_id, second.theme_id);
        let stats = service.stats().await.unwrap();
        assert_eq!(stats.count(MemoryLevel::Theme), 1);
    }

    #[tokio::test]
    async fn test_no_entities_no_theme() {
        let service = service();
        let result = service
            .memorize("Deadline is Friday", MemorizeOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.theme_id.is_none());
        assert_eq!(service.stats().await.unwrap().count(MemoryLevel::Theme), 0);
    }

    #[tokio::test]
    async fn test_validation_precedes_writes() {
        let service = service();

        let err = service
            .memorize("fact", MemorizeOptions::default().with_confidence(1.2))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let now = Utc::now();
        let err = service
            .memorize(
                "fact",
                MemorizeOptions::default().with_validity(Some(now), Some(now - chrono::Duration::days(1))),
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(service.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_speaker_and_session_from_metadata() {
        let service = service();
        let mut metadata = Metadata::new();
        metadata.insert("speaker".into(), "assistant".into());
        metadata.insert("session_id".into(), "s-42".into());

        let result = service
            .memorize("Noted", MemorizeOptions::default().with_metadata(metadata))
            .await
            .unwrap();
        let original = service
            .get(&result.original_id.unwrap(), MemoryLevel::Original)
            .await
            .unwrap()
            .and_then(MemoryRecord::into_original)
            .unwrap();

        assert_eq!(original.speaker, "assistant");
        assert_eq!(original.session_id, "s-42");
        assert_eq!(original.base.metadata.get("session_id"), Some(&"s-42".into()));
    }

    #[tokio::test]
    async fn test_partial_failure_reports_committed_layers() {
        let store = Arc::new(FailingAt {
            inner: InMemoryStore::new(),
            level: MemoryLevel::Semantic,
            armed: AtomicBool::new(true),
        });
        let service = MemoryService::with_store(MemoryConfig::default(), store.clone()).unwrap();

        let result = service
            .memorize("User prefers dark mode", preference(&["User"]))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.original_id.is_some());
        assert!(result.episode_id.is_some());
        assert!(result.semantic_id.is_none());
        assert!(result.theme_id.is_none());
        assert!(result.message.contains("semantic"));

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.count(MemoryLevel::Original), 1);
        assert_eq!(stats.count(MemoryLevel::Episode), 1);
        assert_eq!(stats.count(MemoryLevel::Semantic), 0);

        store.armed.store(false, Ordering::SeqCst);
        assert!(service.memorize("retry", MemorizeOptions::default()).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_memorize_conversation() {
        let service = service();
        let result = service
            .memorize_conversation(
                &["Can we ship on Friday?", "Friday works for the release"],
                "Release ships Friday",
                MemorizeOptions::default().with_type(MemoryType::Event).with_entities(["release"]),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.extra_original_ids.len(), 1);

        let episode = service
            .get(&result.episode_id.unwrap(), MemoryLevel::Episode)
            .await
            .unwrap()
            .and_then(MemoryRecord::into_episode)
            .unwrap();
        assert_eq!(episode.original_ids.len(), 2);
        assert_eq!(episode.original_ids[0], result.original_id.unwrap());
        assert_eq!(episode.coherence_score, 0.7);
        assert_eq!(episode.summary, "Can we ship on Friday? Friday works for the release");

        let err = service
            .memorize_conversation(&[], "fact", MemorizeOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_retrieve_empty_and_density() {
        let service = service();
        let empty = service.retrieve("anything", None).await.unwrap();
        assert!(empty.semantics.is_empty());
        assert!(empty.themes.is_empty());
        assert_eq!(empty.total_tokens, 0);
        assert_eq!(empty.evidence_density, 0.0);

        for fact in ["tabs over spaces", "spaces in yaml"] {
            service.memorize(fact, MemorizeOptions::default()).await.unwrap();
        }
        let result = service.retrieve("spaces", Some(4)).await.unwrap();
        assert_eq!(result.semantics.len(), 2);
        assert_eq!(result.evidence_density, 0.5);
        assert_eq!(result.semantics[0].content, "spaces in yaml");
    }

    #[tokio::test]
    async fn test_retrieve_expands_originals_when_configured() {
        let config = MemoryConfig::default().with_retrieval(RetrievalConfig {
            expand_originals: true,
            ..Default::default()
        });
        let service = MemoryService::new(config).unwrap();
        let result = service
            .memorize("User prefers dark mode", MemorizeOptions::default())
            .await
            .unwrap();

        let retrieved = service.retrieve("dark", None).await.unwrap();
        assert_eq!(retrieved.originals.len(), 1);
        assert_eq!(Some(retrieved.originals[0].base.id.clone()), result.original_id);

        let plain = MemoryService::new(MemoryConfig::default()).unwrap();
        plain.memorize("dark", MemorizeOptions::default()).await.unwrap();
        assert!(plain.retrieve("dark", None).await.unwrap().originals.is_empty());
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let service = service();
        let result = service
            .memorize("forget me", MemorizeOptions::default())
            .await
            .unwrap();
        let id = result.semantic_id.unwrap();

        assert!(service.get(&id, MemoryLevel::Semantic).await.unwrap().is_some());
        assert!(service.delete(&id, MemoryLevel::Semantic).await.unwrap());
        assert!(!service.delete(&id, MemoryLevel::Semantic).await.unwrap());
        assert!(service.get(&id, MemoryLevel::Semantic).await.unwrap().is_none());

        service.close().await.unwrap();
        service.close().await.unwrap();
        assert!(service.stats().await.unwrap_err().is_storage());
    }
}
