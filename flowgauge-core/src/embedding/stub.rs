//! Stub embedding provider for deterministic tests
//!
//! Maps exact strings to fixed vectors and counts provider invocations, so
//! tests can pin pairwise similarities and assert on cache behavior.

use crate::error::{FlowgaugeError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::EmbeddingProvider;

/// Embedding provider backed by a fixed string-to-vector table.
pub struct StaticEmbeddings {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    calls: AtomicUsize,
    dimension: usize,
}

impl StaticEmbeddings {
    /// Create an empty stub. Unknown texts fail unless a fallback is set.
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: None,
            calls: AtomicUsize::new(0),
            dimension: 0,
        }
    }

    /// Pin the vector returned for an exact text.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        if self.dimension == 0 {
            self.dimension = vector.len();
        }
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Vector returned for any text without a pinned entry.
    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        if self.dimension == 0 {
            self.dimension = vector.len();
        }
        self.fallback = Some(vector);
        self
    }

    /// Number of `embed` calls made against this stub.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StaticEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(vector) = self.vectors.get(text) {
            return Ok(vector.clone());
        }
        self.fallback.clone().ok_or_else(|| {
            FlowgaugeError::Embedding(format!("no stub vector registered for {:?}", text))
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pinned_vector_returned() {
        let stub = StaticEmbeddings::new().with_vector("hello", vec![1.0, 0.0]);
        assert_eq!(stub.embed("hello").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_text_is_an_error_without_fallback() {
        let stub = StaticEmbeddings::new().with_vector("hello", vec![1.0, 0.0]);
        assert!(matches!(
            stub.embed("goodbye").await,
            Err(FlowgaugeError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_fallback_covers_unknown_text() {
        let stub = StaticEmbeddings::new().with_fallback(vec![0.0, 1.0]);
        assert_eq!(stub.embed("anything").await.unwrap(), vec![0.0, 1.0]);
    }
}
