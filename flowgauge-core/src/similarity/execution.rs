//! Execution trace comparison
//!
//! Two runs of "the same" task can differ in step count, step ids, and every
//! free-text output. The comparator scores heterogeneous JSON outputs
//! recursively, then aligns steps greedily by output similarity rather than
//! by id.

use crate::embedding::SimilarityCache;
use crate::error::Result;
use crate::similarity::matrix::SimilarityMatrix;
use crate::workflow::ExecutionState;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

const SIMILARITY_WEIGHT: f64 = 0.7;
const COVERAGE_WEIGHT: f64 = 0.3;

/// Dict similarity blends key coverage with per-key value agreement.
const KEY_COVERAGE_WEIGHT: f64 = 0.4;
const COMMON_VALUE_WEIGHT: f64 = 0.6;

/// Compares captured execution states.
pub struct ExecutionComparator {
    cache: Arc<SimilarityCache>,
}

impl ExecutionComparator {
    /// Create a comparator sharing the given similarity cache.
    pub fn new(cache: Arc<SimilarityCache>) -> Self {
        Self { cache }
    }

    /// Similarity of two execution states in `[0, 1]`.
    ///
    /// Builds the full pairwise value-similarity matrix between the two
    /// output sets, repeatedly accepts the globally best remaining cell
    /// (greedy maximum-weight matching, deterministic row-major tie-break),
    /// and blends mean matched similarity with coverage. Coverage divides by
    /// the larger step count, so a run that terminated early is penalized
    /// even when everything it did produce matches.
    pub async fn compare(&self, a: &ExecutionState, b: &ExecutionState) -> Result<f64> {
        if a.is_empty() && b.is_empty() {
            return Ok(1.0);
        }
        if a.is_empty() || b.is_empty() {
            return Ok(0.0);
        }

        let values_a: Vec<&Value> = a.iter().map(|(_, v)| v).collect();
        let values_b: Vec<&Value> = b.iter().map(|(_, v)| v).collect();

        let mut cells = vec![vec![0.0; values_b.len()]; values_a.len()];
        for (i, va) in values_a.iter().enumerate() {
            for (j, vb) in values_b.iter().enumerate() {
                cells[i][j] = self.value_similarity(va, vb).await?;
            }
        }

        let matched = greedy_max_matching(&mut cells);
        let coverage = matched.len() as f64 / values_a.len().max(values_b.len()) as f64;
        let mean = if matched.is_empty() {
            0.0
        } else {
            matched.iter().sum::<f64>() / matched.len() as f64
        };

        trace!(matched = matched.len(), coverage, mean, "execution aligned");
        Ok(SIMILARITY_WEIGHT * mean + COVERAGE_WEIGHT * coverage)
    }

    /// Symmetric pairwise similarity matrix over a batch of executions.
    pub async fn similarity_matrix(
        &self,
        executions: &[ExecutionState],
    ) -> Result<SimilarityMatrix> {
        let n = executions.len();
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let score = self.compare(&executions[i], &executions[j]).await?;
                rows[i][j] = score;
                rows[j][i] = score;
            }
        }
        Ok(SimilarityMatrix::new(rows))
    }

    /// Recursive similarity of two JSON-like values in `[0, 1]`.
    ///
    /// Boxed because string leaves await the embedding cache and the
    /// recursion depth follows the data.
    pub fn value_similarity<'a>(&'a self, a: &'a Value, b: &'a Value) -> BoxFuture<'a, Result<f64>> {
        async move {
            match (a, b) {
                (Value::Null, Value::Null) => Ok(1.0),
                (Value::Null, _) | (_, Value::Null) => Ok(0.0),
                (Value::Object(a), Value::Object(b)) => self.object_similarity(a, b).await,
                (Value::Array(a), Value::Array(b)) => self.array_similarity(a, b).await,
                (Value::Number(x), Value::Number(y)) => {
                    Ok(numeric_similarity(x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0)))
                }
                (Value::String(x), Value::String(y)) => self.cache.score(x, y).await,
                (Value::Bool(x), Value::Bool(y)) => Ok(if x == y { 1.0 } else { 0.0 }),
                _ => Ok(0.0),
            }
        }
        .boxed()
    }

    async fn object_similarity(
        &self,
        a: &serde_json::Map<String, Value>,
        b: &serde_json::Map<String, Value>,
    ) -> Result<f64> {
        if a.is_empty() && b.is_empty() {
            return Ok(1.0);
        }

        let common: Vec<&String> = a.keys().filter(|k| b.contains_key(*k)).collect();
        if common.is_empty() {
            return Ok(0.0);
        }

        let union = a.keys().chain(b.keys().filter(|k| !a.contains_key(*k))).count();
        let coverage = common.len() as f64 / union as f64;

        let mut value_sum = 0.0;
        for key in &common {
            value_sum += self.value_similarity(&a[*key], &b[*key]).await?;
        }
        let value_mean = value_sum / common.len() as f64;

        Ok(KEY_COVERAGE_WEIGHT * coverage + COMMON_VALUE_WEIGHT * value_mean)
    }

    async fn array_similarity(&self, a: &[Value], b: &[Value]) -> Result<f64> {
        if a.is_empty() && b.is_empty() {
            return Ok(1.0);
        }

        let all_objects =
            |items: &[Value]| !items.is_empty() && items.iter().all(Value::is_object);
        let all_scalars = |items: &[Value]| {
            !items.is_empty()
                && items.iter().all(|v| !v.is_object() && !v.is_array())
        };

        if all_objects(a) && all_objects(b) {
            return self.keyed_list_similarity(a, b).await;
        }
        if all_scalars(a) && all_scalars(b) {
            return self.multiset_similarity(a, b).await;
        }

        // Mixed scalar/container sequences: positional, truncated to the
        // shorter side.
        let pairs = a.len().min(b.len());
        if pairs == 0 {
            return Ok(0.0);
        }
        let mut sum = 0.0;
        for i in 0..pairs {
            sum += self.value_similarity(&a[i], &b[i]).await?;
        }
        let mean = sum / pairs as f64;
        let length_ratio = pairs as f64 / a.len().max(b.len()) as f64;
        Ok(SIMILARITY_WEIGHT * mean + COVERAGE_WEIGHT * length_ratio)
    }

    /// Lists of objects align by a `"key"` field when every element on both
    /// sides carries one, positionally when neither side does, and score 0.0
    /// when only one side is keyed.
    async fn keyed_list_similarity(&self, a: &[Value], b: &[Value]) -> Result<f64> {
        let keys_of = |items: &[Value]| -> Option<Vec<String>> {
            items
                .iter()
                .map(|v| v.get("key").map(value_key_token))
                .collect()
        };

        let denominator = a.len().max(b.len()) as f64;
        match (keys_of(a), keys_of(b)) {
            (Some(keys_a), Some(keys_b)) => {
                let mut sum = 0.0;
                for (i, key) in keys_a.iter().enumerate() {
                    if let Some(j) = keys_b.iter().position(|k| k == key) {
                        sum += self.value_similarity(&a[i], &b[j]).await?;
                    }
                }
                Ok(sum / denominator)
            }
            (None, None) => {
                let neither_keyed = a.iter().chain(b.iter()).all(|v| v.get("key").is_none());
                if !neither_keyed {
                    return Ok(0.0);
                }
                let mut sum = 0.0;
                for i in 0..a.len().min(b.len()) {
                    sum += self.value_similarity(&a[i], &b[i]).await?;
                }
                Ok(sum / denominator)
            }
            // Keys on one side only: no meaningful correspondence.
            _ => Ok(0.0),
        }
    }

    /// Order-insensitive scalar sequences: greedy maximum matching blended
    /// with a length ratio.
    async fn multiset_similarity(&self, a: &[Value], b: &[Value]) -> Result<f64> {
        let mut cells = vec![vec![0.0; b.len()]; a.len()];
        for (i, va) in a.iter().enumerate() {
            for (j, vb) in b.iter().enumerate() {
                cells[i][j] = self.value_similarity(va, vb).await?;
            }
        }

        let matched = greedy_max_matching(&mut cells);
        let mean = if matched.is_empty() {
            0.0
        } else {
            matched.iter().sum::<f64>() / matched.len() as f64
        };
        let length_ratio = a.len().min(b.len()) as f64 / a.len().max(b.len()) as f64;
        Ok(SIMILARITY_WEIGHT * mean + COVERAGE_WEIGHT * length_ratio)
    }
}

/// Repeatedly select the globally maximal positive cell, zeroing its row and
/// column. Mutates `cells` in place and returns accepted match scores.
fn greedy_max_matching(cells: &mut [Vec<f64>]) -> Vec<f64> {
    let mut matched = Vec::new();
    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for (i, row) in cells.iter().enumerate() {
            for (j, &score) in row.iter().enumerate() {
                if score > best.map_or(0.0, |(_, _, s)| s) {
                    best = Some((i, j, score));
                }
            }
        }

        let Some((i, j, score)) = best else {
            return matched;
        };
        matched.push(score);
        for row in cells.iter_mut() {
            row[j] = 0.0;
        }
        cells[i].iter_mut().for_each(|c| *c = 0.0);
    }
}

/// Key values are matched by equality across types, so normalize to a token.
fn value_key_token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric_similarity(a: f64, b: f64) -> f64 {
    if a == b {
        return 1.0;
    }
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return 1.0;
    }
    1.0 - ((a - b).abs() / scale).min(1.0)
}
