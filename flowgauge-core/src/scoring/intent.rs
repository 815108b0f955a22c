//! Intent resolution scoring
//!
//! Measures whether a workflow's stated objective matches the prompt that
//! produced it, discounted by signs of over-interpretation: workflow text
//! that drifts from the prompt, and individual steps with little relevance
//! to it.

use crate::embedding::SimilarityCache;
use crate::error::Result;
use crate::workflow::Workflow;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const OBJECTIVE_WEIGHT: f64 = 0.75;
const PENALTY_WEIGHT: f64 = 0.25;

/// Penalty blend: stray steps signal over-interpretation more strongly than
/// overall text drift.
const DRIFT_WEIGHT: f64 = 0.3;
const STRAY_STEP_WEIGHT: f64 = 0.7;

/// A step is prompt-relevant when its text clears this similarity bar.
const RELEVANCE_THRESHOLD: f64 = 0.3;

/// Per-workflow intent-resolution breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentReport {
    /// Similarity of the stated objective to the original prompt
    pub objective_alignment: f64,
    /// Blended over-interpretation penalty in `[0, 1]`
    pub over_interpretation: f64,
    /// Fraction of steps scoring below the relevance threshold
    pub low_relevance_fraction: f64,
    /// `0.75 * alignment + 0.25 * (1 - penalty)`
    pub score: f64,
}

/// Scores goal alignment against the originating prompt.
pub struct IntentScorer {
    cache: Arc<SimilarityCache>,
}

impl IntentScorer {
    /// Create a scorer over the shared similarity cache.
    pub fn new(cache: Arc<SimilarityCache>) -> Self {
        Self { cache }
    }

    /// Score how faithfully the workflow resolves the original request.
    pub async fn resolve(&self, workflow: &Workflow) -> Result<IntentReport> {
        let prompt = &workflow.metadata.original_prompt;

        let objective_alignment = self
            .cache
            .score(&workflow.target_objective, prompt)
            .await?;

        let narrative_similarity = self.cache.score(&workflow.narrative(), prompt).await?;

        let mut low = 0usize;
        let mut total = 0usize;
        for step in workflow.action_steps() {
            let Some(text) = step.text() else { continue };
            total += 1;
            if self.cache.score(text, prompt).await? < RELEVANCE_THRESHOLD {
                low += 1;
            }
        }
        let low_relevance_fraction = if total == 0 {
            0.0
        } else {
            low as f64 / total as f64
        };

        let over_interpretation = DRIFT_WEIGHT * (1.0 - narrative_similarity)
            + STRAY_STEP_WEIGHT * low_relevance_fraction;
        let score =
            OBJECTIVE_WEIGHT * objective_alignment + PENALTY_WEIGHT * (1.0 - over_interpretation);

        debug!(
            objective_alignment,
            over_interpretation, low_relevance_fraction, score, "intent resolved"
        );

        Ok(IntentReport {
            objective_alignment,
            over_interpretation,
            low_relevance_fraction,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, StaticEmbeddings};

    fn workflow(objective: &str, step_thoughts: [&str; 2]) -> Workflow {
        serde_json::from_str(&format!(
            r#"{{
                "title": "title", "description": "description",
                "target_objective": "{objective}",
                "metadata": {{ "original_prompt": "the prompt" }},
                "steps": [
                    {{ "id": 1, "thoughts": "{t0}", "action": "call_tool",
                       "tool_name": "get_weather", "parameters": [] }},
                    {{ "id": 2, "thoughts": "{t1}", "action": "call_tool",
                       "tool_name": "find_attractions", "parameters": [] }},
                    {{ "id": 3, "is_final": true }}
                ]
            }}"#,
            objective = objective,
            t0 = step_thoughts[0],
            t1 = step_thoughts[1],
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_aligned_workflow_scores_high() {
        let provider = StaticEmbeddings::new().with_fallback(vec![1.0, 0.0]);
        let scorer = IntentScorer::new(Arc::new(SimilarityCache::new(
            Arc::new(provider) as Arc<dyn EmbeddingProvider>
        )));

        let report = scorer
            .resolve(&workflow("the objective", ["relevant a", "relevant b"]))
            .await
            .unwrap();
        // Everything embeds identically: alignment 1.0, no drift, no strays.
        assert_eq!(report.objective_alignment, 1.0);
        assert_eq!(report.over_interpretation, 0.0);
        assert_eq!(report.low_relevance_fraction, 0.0);
        assert!((report.score - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_stray_steps_raise_the_penalty() {
        // One step orthogonal to the prompt, one identical to it.
        let wf = workflow("the objective", ["the prompt", "stray thought"]);
        let provider = StaticEmbeddings::new()
            .with_vector("stray thought", vec![0.0, 1.0])
            .with_fallback(vec![1.0, 0.0]);
        let scorer = IntentScorer::new(Arc::new(SimilarityCache::new(
            Arc::new(provider) as Arc<dyn EmbeddingProvider>
        )));

        let report = scorer.resolve(&wf).await.unwrap();
        assert_eq!(report.low_relevance_fraction, 0.5);
        // Penalty: 0.3*(1-1.0) + 0.7*0.5.
        assert!((report.over_interpretation - 0.35).abs() < 1e-12);
        let expected = 0.75 * 1.0 + 0.25 * (1.0 - 0.35);
        assert!((report.score - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_score_stays_in_unit_range() {
        let provider = StaticEmbeddings::new()
            .with_fallback(vec![0.0, 1.0])
            .with_vector("the prompt", vec![1.0, 0.0]);
        let scorer = IntentScorer::new(Arc::new(SimilarityCache::new(
            Arc::new(provider) as Arc<dyn EmbeddingProvider>
        )));

        // Everything orthogonal to the prompt: maximal penalty path.
        let report = scorer
            .resolve(&workflow("unrelated objective", ["stray a", "stray b"]))
            .await
            .unwrap();
        assert_eq!(report.objective_alignment, 0.0);
        assert_eq!(report.low_relevance_fraction, 1.0);
        assert!((report.over_interpretation - 1.0).abs() < 1e-12);
        assert!(report.score >= 0.0 && report.score <= 1.0);
        assert_eq!(report.score, 0.0);
    }
}
