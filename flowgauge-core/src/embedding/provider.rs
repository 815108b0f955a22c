//! Embedding provider implementations

use crate::error::{FlowgaugeError, Result};
use async_trait::async_trait;

/// Trait for embedding provider implementations.
///
/// Embedding providers generate vector embeddings from text for semantic
/// similarity scoring. Retries and backoff for transient failures belong to
/// the provider, not the scoring engine.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // Default implementation: embed each text sequentially
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the dimension of embeddings produced by this provider.
    fn dimension(&self) -> usize;
}

/// Deterministic local embedding provider using feature hashing.
///
/// Hashes lowercase word tokens and character trigrams into a fixed-size
/// bucket vector, L2-normalized. Runs with no model download or network,
/// which makes batch evaluation reproducible on any machine. Quality is
/// lexical rather than semantic; swap in a model-backed provider through the
/// same trait for semantic scoring.
pub struct HashedNgramEmbeddings {
    dimension: usize,
}

/// Trigram features carry less signal than whole tokens.
const TRIGRAM_WEIGHT: f32 = 0.5;

impl HashedNgramEmbeddings {
    /// Create a provider with the given vector dimension.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension < 8 {
            return Err(FlowgaugeError::Configuration(format!(
                "embedding dimension must be at least 8, got {}",
                dimension
            )));
        }
        Ok(Self { dimension })
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dimension as u64) as usize
    }
}

impl Default for HashedNgramEmbeddings {
    /// Dimension 256: enough buckets that short texts rarely collide.
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for HashedNgramEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            vector[self.bucket(token)] += 1.0;

            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(&trigram)] += TRIGRAM_WEIGHT;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embed_is_deterministic() {
        let provider = HashedNgramEmbeddings::default();
        let a = provider.embed("check the weather in Paris").await.unwrap();
        let b = provider.embed("check the weather in Paris").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_embed_is_normalized() {
        let provider = HashedNgramEmbeddings::default();
        let v = provider.embed("fetch stock prices").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_empty_text_embeds_to_zero_vector() {
        let provider = HashedNgramEmbeddings::default();
        let v = provider.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_shared_tokens_increase_overlap() {
        let provider = HashedNgramEmbeddings::default();
        let weather_a = provider.embed("get weather for Paris").await.unwrap();
        let weather_b = provider.embed("get weather for Rome").await.unwrap();
        let stocks = provider.embed("compute portfolio variance").await.unwrap();

        let dot = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(a, b)| a * b).sum() };
        assert!(dot(&weather_a, &weather_b) > dot(&weather_a, &stocks));
    }

    #[test]
    fn test_rejects_tiny_dimension() {
        assert!(HashedNgramEmbeddings::new(4).is_err());
        assert!(HashedNgramEmbeddings::new(64).is_ok());
    }

    #[tokio::test]
    async fn test_embed_batch_matches_single() {
        let provider = HashedNgramEmbeddings::default();
        let batch = provider.embed_batch(&["alpha", "beta"]).await.unwrap();
        assert_eq!(batch[0], provider.embed("alpha").await.unwrap());
        assert_eq!(batch[1], provider.embed("beta").await.unwrap());
    }
}
