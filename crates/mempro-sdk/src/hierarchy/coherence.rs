//! Coherence estimation for multi-utterance episodes.

use std::collections::HashSet;
use std::sync::Arc;

use mempro_core::types::clamp_unit_score;

use crate::config::{CoherenceStrategy, HierarchyConfig};

/// Scores how topically unified a group of texts is, in [0, 1].
///
/// A single text is always perfectly coherent; implementations only see
/// groups of two or more.
pub trait CoherenceEstimator: Send + Sync {
    fn estimate(&self, texts: &[&str]) -> f64;
}

/// Constant placeholder score for every multi-text group
#[derive(Debug, Clone, Copy)]
pub struct FixedCoherence {
    score: f64,
}

impl FixedCoherence {
    pub fn new(score: f64) -> Self {
        Self {
            score: clamp_unit_score(score),
        }
    }
}

impl Default for FixedCoherence {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl CoherenceEstimator for FixedCoherence {
    fn estimate(&self, texts: &[&str]) -> f64 {
        if texts.len() <= 1 { 1.0 } else { self.score }
    }
}

/// Mean pairwise Jaccard overlap of lowercase word sets
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalCoherence;

impl LexicalCoherence {
    fn words(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
        let union = a.union(b).count();
        if union == 0 {
            return 1.0;
        }
        a.intersection(b).count() as f64 / union as f64
    }
}

impl CoherenceEstimator for LexicalCoherence {
    fn estimate(&self, texts: &[&str]) -> f64 {
        if texts.len() <= 1 {
            return 1.0;
        }

        let sets: Vec<HashSet<String>> = texts.iter().map(|t| Self::words(t)).collect();
        let mut total = 0.0;
        let mut pairs = 0usize;
        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                total += Self::jaccard(a, b);
                pairs += 1;
            }
        }

        clamp_unit_score(total / pairs as f64)
    }
}

/// Build the estimator a configuration asks for
pub fn estimator_for(config: &HierarchyConfig) -> Arc<dyn CoherenceEstimator> {
    match config.coherence {
        CoherenceStrategy::Fixed => Arc::new(FixedCoherence::new(config.multi_utterance_coherence)),
        CoherenceStrategy::Lexical => Arc::new(LexicalCoherence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_coherence() {
        let fixed = FixedCoherence::default();
        assert_eq!(fixed.estimate(&["only one"]), 1.0);
        assert_eq!(fixed.estimate(&["a", "b"]), 0.7);
        assert_eq!(FixedCoherence::new(3.0).estimate(&["a", "b"]), 1.0);
    }

    #[test]
    fn test_lexical_bounds() {
        let lexical = LexicalCoherence;
        assert_eq!(lexical.estimate(&["dark mode", "Dark Mode"]), 1.0);
        assert_eq!(lexical.estimate(&["dark mode", "deadline friday"]), 0.0);

        let score = lexical.estimate(&["I like dark mode", "dark mode at night"]);
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn test_lexical_is_monotonic_in_overlap() {
        let lexical = LexicalCoherence;
        let focused = lexical.estimate(&["rust borrow checker", "the rust borrow checker"]);
        let scattered = lexical.estimate(&["rust borrow checker", "lunch at noon today"]);
        assert!(focused > scattered);
    }

    #[test]
    fn test_estimator_for_config() {
        let mut config = HierarchyConfig::default();
        config.multi_utterance_coherence = 0.4;
        assert_eq!(estimator_for(&config).estimate(&["a", "b"]), 0.4);

        config.coherence = CoherenceStrategy::Lexical;
        assert_eq!(estimator_for(&config).estimate(&["a", "b"]), 0.0);
    }
}
