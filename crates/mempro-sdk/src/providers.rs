//! Embedding and LLM provider seams.
//!
//! The default pipeline matches by substring and never calls these. They
//! fix the shape a vector-similarity retrieval upgrade would plug into.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::SDKResult;

/// Text embedding backend
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a `dimension()`-length vector
    async fn embed(&self, text: &str) -> SDKResult<Vec<f32>>;

    /// Embed several texts, in order
    async fn embed_batch(&self, texts: &[String]) -> SDKResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Vector length produced by this provider
    fn dimension(&self) -> usize;
}

/// Completion request for an LLM provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Text completion backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> SDKResult<String>;
}

/// Compute cosine similarity between two vectors
///
/// Returns a value between -1.0 and 1.0. Mismatched lengths and zero
/// vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts vowels; enough to exercise the default batch method
    struct VowelEmbedding;

    #[async_trait]
    impl EmbeddingProvider for VowelEmbedding {
        async fn embed(&self, text: &str) -> SDKResult<Vec<f32>> {
            Ok("aeiou"
                .chars()
                .map(|v| text.chars().filter(|c| c.eq_ignore_ascii_case(&v)).count() as f32)
                .collect())
        }

        fn dimension(&self) -> usize {
            5
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_default_embed_batch() {
        let provider = VowelEmbedding;
        let vectors = provider
            .embed_batch(&["banana".to_string(), "kiwi".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![3.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(vectors[1].len(), provider.dimension());
    }

    #[test]
    fn test_completion_request_defaults() {
        let request = CompletionRequest::new("Summarize").with_system("Be brief");
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_tokens, 1000);
        assert_eq!(request.system.as_deref(), Some("Be brief"));
    }
}
