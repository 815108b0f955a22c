//! Memoized semantic similarity
//!
//! Amortizes embedding-provider calls across a batch evaluation run. Vectors
//! are cached per exact string, pairwise scores per unordered string pair.
//! Neither cache evicts; callers are batch runs, not long-lived servers, and
//! `reset` clears everything between independent batches.

use crate::embedding::EmbeddingProvider;
use crate::error::{FlowgaugeError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Caching wrapper around an embedding provider.
///
/// A provider failure is fatal to the caller: substituting a neutral default
/// score would silently corrupt comparative statistics.
pub struct SimilarityCache {
    provider: Arc<dyn EmbeddingProvider>,
    vectors: Mutex<HashMap<String, Arc<Vec<f32>>>>,
    scores: Mutex<HashMap<(String, String), f64>>,
}

impl SimilarityCache {
    /// Create a cache over the given provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            vectors: Mutex::new(HashMap::new()),
            scores: Mutex::new(HashMap::new()),
        }
    }

    /// Semantic similarity of two texts in `[0, 1]`.
    ///
    /// Identical strings score 1.0 without touching the provider. Otherwise
    /// the score is the cosine similarity of the two embeddings, clamped into
    /// `[0, 1]`, cached under both orderings of the pair.
    pub async fn score(&self, a: &str, b: &str) -> Result<f64> {
        if a == b {
            return Ok(1.0);
        }

        if let Some(cached) = self.lookup_score(a, b)? {
            return Ok(cached);
        }

        let va = self.vector(a).await?;
        let vb = self.vector(b).await?;
        let score = cosine(&va, &vb).clamp(0.0, 1.0);

        let mut scores = lock(&self.scores)?;
        scores.insert((a.to_string(), b.to_string()), score);
        scores.insert((b.to_string(), a.to_string()), score);
        Ok(score)
    }

    /// Clear all cached vectors and pairwise scores.
    pub fn reset(&self) {
        if let Ok(mut vectors) = self.vectors.lock() {
            vectors.clear();
        }
        if let Ok(mut scores) = self.scores.lock() {
            scores.clear();
        }
    }

    /// Number of distinct strings with cached vectors.
    pub fn cached_vectors(&self) -> usize {
        self.vectors.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// Number of cached pairwise score entries (both orderings counted).
    pub fn cached_scores(&self) -> usize {
        self.scores.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn lookup_score(&self, a: &str, b: &str) -> Result<Option<f64>> {
        let scores = lock(&self.scores)?;
        Ok(scores.get(&(a.to_string(), b.to_string())).copied())
    }

    async fn vector(&self, text: &str) -> Result<Arc<Vec<f32>>> {
        if let Some(vector) = lock(&self.vectors)?.get(text) {
            return Ok(Arc::clone(vector));
        }

        let vector = Arc::new(self.provider.embed(text).await?);
        lock(&self.vectors)?.insert(text.to_string(), Arc::clone(&vector));
        Ok(vector)
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> Result<std::sync::MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|e| FlowgaugeError::Configuration(format!("similarity cache poisoned: {}", e)))
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::StaticEmbeddings;

    fn cache_with(stub: StaticEmbeddings) -> (Arc<StaticEmbeddings>, SimilarityCache) {
        let provider = Arc::new(stub);
        let cache = SimilarityCache::new(Arc::clone(&provider) as Arc<dyn EmbeddingProvider>);
        (provider, cache)
    }

    #[tokio::test]
    async fn test_identical_strings_skip_the_provider() {
        let (provider, cache) = cache_with(StaticEmbeddings::new());
        assert_eq!(cache.score("same", "same").await.unwrap(), 1.0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_orthogonal_vectors_score_zero() {
        let (_, cache) = cache_with(
            StaticEmbeddings::new()
                .with_vector("a", vec![1.0, 0.0])
                .with_vector("b", vec![0.0, 1.0]),
        );
        assert_eq!(cache.score("a", "b").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_negative_cosine_clamps_to_zero() {
        let (_, cache) = cache_with(
            StaticEmbeddings::new()
                .with_vector("a", vec![1.0, 0.0])
                .with_vector("b", vec![-1.0, 0.0]),
        );
        assert_eq!(cache.score("a", "b").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_pair_score_cached_symmetrically() {
        let (provider, cache) = cache_with(
            StaticEmbeddings::new()
                .with_vector("a", vec![1.0, 0.0])
                .with_vector("b", vec![1.0, 0.0]),
        );

        let forward = cache.score("a", "b").await.unwrap();
        let backward = cache.score("b", "a").await.unwrap();
        assert_eq!(forward, backward);
        // Two embeds for the first call, zero for the mirrored lookup.
        assert_eq!(provider.call_count(), 2);
        assert_eq!(cache.cached_scores(), 2);
    }

    #[tokio::test]
    async fn test_vector_cache_reused_across_pairs() {
        let (provider, cache) = cache_with(
            StaticEmbeddings::new()
                .with_vector("a", vec![1.0, 0.0])
                .with_vector("b", vec![0.0, 1.0])
                .with_vector("c", vec![1.0, 1.0]),
        );

        cache.score("a", "b").await.unwrap();
        cache.score("a", "c").await.unwrap();
        // "a" embedded once, "b" and "c" once each.
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let (_, cache) = cache_with(StaticEmbeddings::new());
        assert!(matches!(
            cache.score("known to nobody", "also unknown").await,
            Err(FlowgaugeError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_clears_both_caches() {
        let (_, cache) = cache_with(
            StaticEmbeddings::new()
                .with_vector("a", vec![1.0])
                .with_vector("b", vec![1.0]),
        );
        cache.score("a", "b").await.unwrap();
        assert!(cache.cached_vectors() > 0);
        assert!(cache.cached_scores() > 0);

        cache.reset();
        assert_eq!(cache.cached_vectors(), 0);
        assert_eq!(cache.cached_scores(), 0);
    }
}
