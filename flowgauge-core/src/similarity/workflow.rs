//! Whole-workflow similarity
//!
//! Composes step alignment and transition comparison into a single score.
//! The 70/30 step/transition weighting encodes that what a workflow *does*
//! matters more than how its branches connect.

use crate::embedding::SimilarityCache;
use crate::error::Result;
use crate::similarity::align::{StepAligner, StepAlignment};
use crate::similarity::matrix::SimilarityMatrix;
use crate::workflow::{StepId, Workflow};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const STEP_WEIGHT: f64 = 0.7;
const TRANSITION_WEIGHT: f64 = 0.3;

/// Edge-matching term weights: endpoints dominate, condition text refines.
const EDGE_FROM_WEIGHT: f64 = 0.4;
const EDGE_TO_WEIGHT: f64 = 0.4;
const EDGE_CONDITION_WEIGHT: f64 = 0.2;

/// Compares workflows pairwise and over whole batches.
pub struct WorkflowComparator {
    cache: Arc<SimilarityCache>,
    aligner: StepAligner,
}

impl WorkflowComparator {
    /// Create a comparator sharing the given similarity cache.
    pub fn new(cache: Arc<SimilarityCache>) -> Self {
        let aligner = StepAligner::new(Arc::clone(&cache));
        Self { cache, aligner }
    }

    /// The step aligner used for workflow comparison.
    pub fn aligner(&self) -> &StepAligner {
        &self.aligner
    }

    /// Compare the transition structures of two workflows under a step-id
    /// correspondence.
    ///
    /// Vacuously 1.0 when neither workflow has transitions, 0.0 when exactly
    /// one has none. Otherwise every A edge takes its best-matching B edge
    /// (B edges may be reused; unlike step alignment there is no
    /// consumption) and the sum is averaged over the larger edge count.
    pub async fn compare_transitions(
        &self,
        a: &Workflow,
        b: &Workflow,
        id_map: &HashMap<StepId, StepId>,
    ) -> Result<f64> {
        let edges_a: Vec<_> = a.edges().collect();
        let edges_b: Vec<_> = b.edges().collect();

        if edges_a.is_empty() && edges_b.is_empty() {
            return Ok(1.0);
        }
        if edges_a.is_empty() || edges_b.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for &(from_a, t_a) in &edges_a {
            let mapped_from = id_map.get(from_a);
            let mapped_to = id_map.get(&t_a.next_step);

            let mut best = 0.0f64;
            for &(from_b, t_b) in &edges_b {
                let mut score = 0.0;
                if mapped_from == Some(from_b) {
                    score += EDGE_FROM_WEIGHT;
                }
                if mapped_to == Some(&t_b.next_step) {
                    score += EDGE_TO_WEIGHT;
                }
                score +=
                    EDGE_CONDITION_WEIGHT * self.cache.score(&t_a.condition, &t_b.condition).await?;
                best = best.max(score);
            }
            total += best;
        }

        Ok(total / edges_a.len().max(edges_b.len()) as f64)
    }

    /// Whole-workflow similarity in `[0, 1]`.
    pub async fn compare(&self, a: &Workflow, b: &Workflow) -> Result<f64> {
        let alignment = self.aligner.align(&a.steps, &b.steps).await?;
        self.compare_aligned(a, b, &alignment).await
    }

    /// Whole-workflow similarity reusing an existing alignment.
    pub async fn compare_aligned(
        &self,
        a: &Workflow,
        b: &Workflow,
        alignment: &StepAlignment,
    ) -> Result<f64> {
        let transition_score = self
            .compare_transitions(a, b, &alignment.id_map())
            .await?;
        let score = STEP_WEIGHT * alignment.average_score + TRANSITION_WEIGHT * transition_score;
        debug!(
            steps = alignment.average_score,
            transitions = transition_score,
            score,
            "workflow comparison"
        );
        Ok(score)
    }

    /// Symmetric pairwise similarity matrix over a batch of workflows.
    pub async fn similarity_matrix(&self, workflows: &[Workflow]) -> Result<SimilarityMatrix> {
        let n = workflows.len();
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let score = self.compare(&workflows[i], &workflows[j]).await?;
                rows[i][j] = score;
                rows[j][i] = score;
            }
        }
        Ok(SimilarityMatrix::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, StaticEmbeddings};

    fn comparator() -> WorkflowComparator {
        let provider = StaticEmbeddings::new().with_fallback(vec![1.0, 0.0]);
        WorkflowComparator::new(Arc::new(SimilarityCache::new(
            Arc::new(provider) as Arc<dyn EmbeddingProvider>
        )))
    }

    fn linear_workflow(ids: [i64; 4]) -> Workflow {
        serde_json::from_str(&format!(
            r#"{{
                "title": "Trip helper",
                "description": "Weather then activities",
                "target_objective": "Plan an afternoon in Paris",
                "metadata": {{ "original_prompt": "Plan my afternoon in Paris" }},
                "steps": [
                    {{ "id": {a}, "thoughts": "fetch weather", "action": "call_tool",
                       "tool_name": "get_weather",
                       "parameters": [ {{ "key": "city", "value": "Paris" }} ],
                       "transitions": [ {{ "condition": "always", "next_step": {b} }} ] }},
                    {{ "id": {b}, "thoughts": "pick activities", "action": "call_tool",
                       "tool_name": "find_attractions",
                       "parameters": [ {{ "key": "city", "value": "Paris" }} ],
                       "transitions": [ {{ "condition": "always", "next_step": {c} }} ] }},
                    {{ "id": {c}, "thoughts": "summarize", "action": "call_llm",
                       "prompt": "Summarize the plan",
                       "transitions": [ {{ "condition": "if summary complete", "next_step": {d} }} ] }},
                    {{ "id": {d}, "is_final": true }}
                ]
            }}"#,
            a = ids[0],
            b = ids[1],
            c = ids[2],
            d = ids[3],
        ))
        .unwrap()
    }

    fn no_transition_workflow(tool: &str) -> Workflow {
        serde_json::from_str(&format!(
            r#"{{
                "title": "t", "description": "d", "target_objective": "o",
                "metadata": {{ "original_prompt": "p" }},
                "steps": [
                    {{ "id": 1, "thoughts": "only step", "action": "call_tool",
                       "tool_name": "{}", "parameters": [] }}
                ]
            }}"#,
            tool
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_renumbered_identical_workflows_score_one() {
        let comparator = comparator();
        let a = linear_workflow([1, 2, 3, 4]);
        let b = linear_workflow([10, 11, 12, 13]);
        let score = comparator.compare(&a, &b).await.unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_self_similarity_is_one() {
        let comparator = comparator();
        let a = linear_workflow([1, 2, 3, 4]);
        let score = comparator.compare(&a, &a).await.unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_transition_vacuity() {
        let comparator = comparator();
        let a = no_transition_workflow("get_weather");
        let b = no_transition_workflow("get_weather");
        assert_eq!(
            comparator
                .compare_transitions(&a, &b, &HashMap::new())
                .await
                .unwrap(),
            1.0
        );

        let with_edges = linear_workflow([1, 2, 3, 4]);
        assert_eq!(
            comparator
                .compare_transitions(&a, &with_edges, &HashMap::new())
                .await
                .unwrap(),
            0.0
        );
    }

    #[tokio::test]
    async fn test_unmapped_ids_only_earn_condition_credit() {
        let comparator = comparator();
        let a = linear_workflow([1, 2, 3, 4]);
        let b = linear_workflow([5, 6, 7, 8]);
        // Empty mapping: endpoint terms can never match, so each edge's best
        // candidate is condition similarity alone. The stub makes every
        // distinct pair score 1.0 and "always"/"always" short-circuits.
        let score = comparator
            .compare_transitions(&a, &b, &HashMap::new())
            .await
            .unwrap();
        assert!((score - EDGE_CONDITION_WEIGHT).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_symmetry() {
        let comparator = comparator();
        let a = linear_workflow([1, 2, 3, 4]);
        let mut b = linear_workflow([1, 2, 3, 4]);
        // Perturb b: different tool in the middle step.
        if let crate::workflow::Step::Tool(step) = &mut b.steps[1] {
            step.tool_name = "search_web".to_string();
        }

        let ab = comparator.compare(&a, &b).await.unwrap();
        let ba = comparator.compare(&b, &a).await.unwrap();
        assert!((ab - ba).abs() < 1e-12);
        assert!(ab < 1.0);
    }

    #[tokio::test]
    async fn test_matrix_is_symmetric_with_unit_diagonal() {
        let comparator = comparator();
        let batch = vec![
            linear_workflow([1, 2, 3, 4]),
            linear_workflow([10, 11, 12, 13]),
            no_transition_workflow("get_weather"),
        ];
        let matrix = comparator.similarity_matrix(&batch).await.unwrap();
        assert_eq!(matrix.len(), 3);
        for i in 0..3 {
            assert!((matrix.get(i, i) - 1.0).abs() < 1e-12);
            for j in 0..3 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
        // The two renumbered twins are more alike than the odd one out.
        assert_eq!(matrix.most_representative(), Some(0));
    }
}
