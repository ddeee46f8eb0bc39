//! Feature-hashing embedding provider.
//!
//! Needs no model files, so it backs tests and offline use. Each lowercase
//! alphanumeric token is hashed with FNV-1a into one of `dimension` buckets and
//! contributes `+1` or `-1` depending on the top bit of the hash. Texts that
//! share vocabulary therefore point in similar directions. When the token
//! contributions cancel to zero, the whole lowercased text is hashed into
//! one extra bucket so every encodable text has a non-zero vector.

use crate::error::{EmbedError, Result};
use crate::provider::{validate_texts, EmbeddingProvider, EmbeddingResult};
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

pub const HASH_MODEL_NAME: &str = "fnv-feature-hash";

#[derive(Debug, Clone)]
pub struct HashEmbedProvider {
    dimension: usize,
}

impl HashEmbedProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hash provider dimension must be at least 1",
            ));
        }
        Ok(Self { dimension })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let mut tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .peekable();

        if tokens.peek().is_none() {
            // Punctuation-only text still gets a non-zero vector.
            self.accumulate(&mut vector, lowered.trim());
        } else {
            for token in tokens {
                self.accumulate(&mut vector, token);
            }
        }
        // Colliding tokens with opposite signs can cancel out completely.
        if vector.iter().all(|v| *v == 0.0) {
            self.accumulate(&mut vector, lowered.trim());
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], token: &str) {
        let mut hasher = FnvHasher::default();
        hasher.write(token.as_bytes());
        let hash = hasher.finish();

        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        validate_texts(texts)?;
        let embeddings = texts.iter().map(|text| self.embed_one(text)).collect();
        Ok(EmbeddingResult {
            embeddings,
            dimension: self.dimension,
        })
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hash"
    }

    fn model_name(&self) -> &str {
        HASH_MODEL_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            HashEmbedProvider::new(0),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_deterministic_and_batch_independent() {
        let provider = HashEmbedProvider::new(64).unwrap();
        let texts = vec!["The cat sat.".to_string(), "Engines need oil.".to_string()];

        let batch = provider.embed_texts(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.dimension, 64);

        let first = provider.embed_text(&texts[0]).await.unwrap();
        let second = provider.embed_text(&texts[1]).await.unwrap();
        assert_eq!(batch.embeddings[0], first);
        assert_eq!(batch.embeddings[1], second);
    }

    #[tokio::test]
    async fn test_case_and_punctuation_insensitive() {
        let provider = HashEmbedProvider::new(128).unwrap();
        let a = provider.embed_text("Hello, World!").await.unwrap();
        let b = provider.embed_text("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = HashEmbedProvider::new(256).unwrap();
        let query = provider.embed_text("cats and kittens").await.unwrap();
        let close = provider.embed_text("kittens grow into cats").await.unwrap();
        let far = provider.embed_text("diesel engine maintenance").await.unwrap();
        assert!(cosine(&query, &close) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_punctuation_only_text_is_non_zero() {
        let provider = HashEmbedProvider::new(16).unwrap();
        let vector = provider.embed_text("?!").await.unwrap();
        assert!(vector.iter().any(|v| *v != 0.0));
    }

    #[tokio::test]
    async fn test_cancelling_tokens_still_non_zero() {
        let provider = HashEmbedProvider::new(256).unwrap();
        let vector = provider.embed_text("accurate action").await.unwrap();
        assert!(vector.iter().any(|v| *v != 0.0));

        let again = provider.embed_text("accurate action").await.unwrap();
        assert_eq!(vector, again);
    }

    #[tokio::test]
    async fn test_unencodable_input_fails_batch() {
        let provider = HashEmbedProvider::new(16).unwrap();
        let texts = vec!["fine".to_string(), "\t\n".to_string(), "also fine".to_string()];
        assert!(matches!(
            provider.embed_texts(&texts).await,
            Err(EmbedError::UnencodableInput { index: 1, .. })
        ));
    }
}
