//! Layer processors: Original, Episode and Semantic construction.

use std::sync::Arc;

use mempro_core::types::clamp_unit_score;
use mempro_core::{
    EpisodeMemory, Error, MemoryType, Metadata, OriginalMemory, Result, SemanticMemory,
};

use super::coherence::{CoherenceEstimator, FixedCoherence};
use crate::config::MAX_SUMMARY_CHARS;

/// Speaker tag used when none is given
pub const DEFAULT_SPEAKER: &str = "user";

/// Session id used when none is given
pub const DEFAULT_SESSION: &str = "default";

/// Boundary tag used when none is given
pub const DEFAULT_BOUNDARY: &str = "topic";

/// Builds Originals from raw utterances
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalProcessor;

impl OriginalProcessor {
    pub fn process(
        &self,
        content: &str,
        speaker: Option<&str>,
        session_id: Option<&str>,
        metadata: Metadata,
    ) -> Result<OriginalMemory> {
        OriginalMemory::new(
            content,
            speaker.unwrap_or(DEFAULT_SPEAKER),
            session_id.unwrap_or(DEFAULT_SESSION),
            metadata,
        )
    }
}

/// Groups Originals into one Episode
pub struct EpisodeProcessor {
    max_summary_chars: usize,
    estimator: Arc<dyn CoherenceEstimator>,
}

impl Default for EpisodeProcessor {
    fn default() -> Self {
        Self::new(MAX_SUMMARY_CHARS, Arc::new(FixedCoherence::default()))
    }
}

impl EpisodeProcessor {
    pub fn new(max_summary_chars: usize, estimator: Arc<dyn CoherenceEstimator>) -> Self {
        Self {
            max_summary_chars,
            estimator,
        }
    }

    /// Summary is the space-joined text, cut to `max_summary_chars` chars.
    /// Timestamps span the Originals; `original_ids` keeps input order.
    pub fn process(&self, originals: &[OriginalMemory], boundary_type: &str) -> Result<EpisodeMemory> {
        let (Some(start), Some(end)) = (
            originals.iter().map(|o| o.timestamp).min(),
            originals.iter().map(|o| o.timestamp).max(),
        ) else {
            return Err(Error::validation("episode needs at least one original"));
        };

        let texts: Vec<&str> = originals.iter().map(|o| o.content.as_str()).collect();
        let summary = truncate_chars(&texts.join(" "), self.max_summary_chars);

        let coherence = if originals.len() == 1 {
            1.0
        } else {
            clamp_unit_score(self.estimator.estimate(&texts))
        };

        let boundary_type = if boundary_type.trim().is_empty() {
            DEFAULT_BOUNDARY
        } else {
            boundary_type
        };

        EpisodeMemory::new(
            summary,
            originals.iter().map(|o| o.base.id.clone()).collect(),
            start,
            end,
            coherence,
            boundary_type,
        )
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// Extracts one Semantic from an Episode
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticProcessor;

impl SemanticProcessor {
    /// Entities are copied verbatim.
    pub fn process(
        &self,
        episode: &EpisodeMemory,
        fact: &str,
        memory_type: MemoryType,
        entities: Vec<String>,
        confidence: f64,
    ) -> Result<SemanticMemory> {
        SemanticMemory::new(
            fact,
            memory_type,
            confidence,
            vec![episode.base.id.clone()],
            entities,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::LexicalCoherence;

    fn original(content: &str) -> OriginalMemory {
        OriginalProcessor
            .process(content, None, None, Metadata::new())
            .unwrap()
    }

    #[test]
    fn test_original_defaults() {
        let record = original("hello");
        assert_eq!(record.speaker, "user");
        assert_eq!(record.session_id, "default");
        assert_eq!(record.timestamp, record.base.created_at);

        let record = OriginalProcessor
            .process("hi", Some("assistant"), Some("s-9"), Metadata::new())
            .unwrap();
        assert_eq!(record.speaker, "assistant");
        assert_eq!(record.session_id, "s-9");

        assert!(OriginalProcessor.process("", None, None, Metadata::new()).is_err());
    }

    #[test]
    fn test_single_original_episode() {
        let source = original("User prefers dark mode for coding");
        let episode = EpisodeProcessor::default().process(&[source.clone()], "topic").unwrap();

        assert_eq!(episode.summary, source.content);
        assert_eq!(episode.original_ids, vec![source.base.id.clone()]);
        assert_eq!(episode.coherence_score, 1.0);
        assert_eq!(episode.start_time, source.timestamp);
        assert_eq!(episode.end_time, source.timestamp);
        assert_eq!(episode.boundary_type, "topic");
    }

    #[test]
    fn test_multi_original_episode() {
        let first = original("we should ship friday");
        let second = original("friday works");
        let episode = EpisodeProcessor::default()
            .process(&[first.clone(), second.clone()], "")
            .unwrap();

        assert_eq!(episode.summary, "we should ship friday friday works");
        assert_eq!(episode.original_ids, vec![first.base.id.clone(), second.base.id.clone()]);
        assert_eq!(episode.coherence_score, 0.7);
        assert_eq!(episode.start_time, first.timestamp.min(second.timestamp));
        assert_eq!(episode.end_time, first.timestamp.max(second.timestamp));
        assert_eq!(episode.boundary_type, "topic");

        let lexical = EpisodeProcessor::new(500, Arc::new(LexicalCoherence));
        let episode = lexical.process(&[first, second], "topic").unwrap();
        assert!(episode.coherence_score > 0.0 && episode.coherence_score < 1.0);
    }

    #[test]
    fn test_empty_episode_rejected() {
        let err = EpisodeProcessor::default().process(&[], "topic").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_summary_truncation() {
        let long = "é".repeat(1_200);
        let episode = EpisodeProcessor::default()
            .process(&[original(&long)], "topic")
            .unwrap();
        assert_eq!(episode.summary.chars().count(), 500);

        let exact = "x".repeat(500);
        let episode = EpisodeProcessor::default()
            .process(&[original(&exact)], "topic")
            .unwrap();
        assert_eq!(episode.summary, exact);
    }

    #[test]
    fn test_semantic_from_episode() {
        let episode = EpisodeProcessor::default()
            .process(&[original("User prefers dark mode")], "topic")
            .unwrap();
        let semantic = SemanticProcessor
            .process(
                &episode,
                "User prefers dark mode",
                MemoryType::Preference,
                vec!["User".into(), " dark mode ".into()],
                0.9,
            )
            .unwrap();

        assert_eq!(semantic.source_episodes, vec![episode.base.id.clone()]);
        assert_eq!(semantic.entity_refs, vec!["User".to_string(), " dark mode ".to_string()]);
        assert_eq!(semantic.memory_type, MemoryType::Preference);

        assert!(
            SemanticProcessor
                .process(&episode, "fact", MemoryType::Fact, vec![], 1.5)
                .unwrap_err()
                .is_validation()
        );
    }
}
