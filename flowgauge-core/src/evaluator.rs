//! Evaluation facade
//!
//! Wires the comparators and scorers over one shared similarity cache and
//! tool catalog. Both collaborators are injected at construction; there is
//! no process-wide state, so independent evaluators never contaminate each
//! other and `reset` scopes cleanly to one batch.

use crate::embedding::{EmbeddingProvider, SimilarityCache};
use crate::error::Result;
use crate::scoring::coherence::{CoherenceAnalyzer, CoherenceReport, StructuralReport};
use crate::scoring::correctness::{CorrectnessReport, score_against_reference};
use crate::scoring::intent::{IntentReport, IntentScorer};
use crate::scoring::reference::ReferenceSpec;
use crate::similarity::{ExecutionComparator, SimilarityMatrix, WorkflowComparator};
use crate::tools::ToolCatalog;
use crate::workflow::{ExecutionState, Workflow};
use std::sync::Arc;

/// One-stop evaluation engine for a batch of generated workflows and their
/// execution traces.
pub struct Evaluator {
    cache: Arc<SimilarityCache>,
    workflows: WorkflowComparator,
    executions: ExecutionComparator,
    coherence: CoherenceAnalyzer,
    intent: IntentScorer,
}

impl Evaluator {
    /// Create an evaluator over an embedding provider and a tool catalog.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, catalog: Arc<ToolCatalog>) -> Self {
        let cache = Arc::new(SimilarityCache::new(provider));
        Self {
            workflows: WorkflowComparator::new(Arc::clone(&cache)),
            executions: ExecutionComparator::new(Arc::clone(&cache)),
            coherence: CoherenceAnalyzer::new(Arc::clone(&cache), catalog),
            intent: IntentScorer::new(Arc::clone(&cache)),
            cache,
        }
    }

    /// The shared similarity cache.
    pub fn cache(&self) -> &SimilarityCache {
        &self.cache
    }

    /// The workflow comparator.
    pub fn workflows(&self) -> &WorkflowComparator {
        &self.workflows
    }

    /// The execution comparator.
    pub fn executions(&self) -> &ExecutionComparator {
        &self.executions
    }

    /// Pairwise similarity matrix over generated workflows.
    pub async fn workflow_similarity(&self, workflows: &[Workflow]) -> Result<SimilarityMatrix> {
        self.workflows.similarity_matrix(workflows).await
    }

    /// Pairwise similarity matrix over captured executions.
    pub async fn execution_similarity(
        &self,
        executions: &[ExecutionState],
    ) -> Result<SimilarityMatrix> {
        self.executions.similarity_matrix(executions).await
    }

    /// Correctness breakdown against a reference constraint document.
    pub fn correctness(&self, workflow: &Workflow, reference: &ReferenceSpec) -> CorrectnessReport {
        score_against_reference(workflow, reference)
    }

    /// Structural defect analysis of a workflow's step graph.
    pub fn analyze_structure(&self, workflow: &Workflow) -> StructuralReport {
        crate::scoring::coherence::analyze_structure(&workflow.steps)
    }

    /// Reasoning-coherence breakdown.
    pub async fn reasoning_coherence(&self, workflow: &Workflow) -> Result<CoherenceReport> {
        self.coherence.reasoning_coherence(workflow).await
    }

    /// Intent-resolution breakdown.
    pub async fn intent_resolution(&self, workflow: &Workflow) -> Result<IntentReport> {
        self.intent.resolve(workflow).await
    }

    /// Clear all cached embeddings and pairwise scores. Call between
    /// independent evaluation batches.
    pub fn reset(&self) {
        self.cache.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::StaticEmbeddings;

    fn evaluator() -> Evaluator {
        let provider = StaticEmbeddings::new().with_fallback(vec![1.0, 0.0]);
        Evaluator::new(
            Arc::new(provider) as Arc<dyn EmbeddingProvider>,
            Arc::new(ToolCatalog::new()),
        )
    }

    fn workflow() -> Workflow {
        serde_json::from_str(
            r#"{
                "title": "t", "description": "d", "target_objective": "o",
                "metadata": { "original_prompt": "p" },
                "steps": [
                    { "id": 1, "thoughts": "use the tool", "action": "call_llm",
                      "prompt": "do the thing",
                      "transitions": [ { "condition": "done", "next_step": 2 } ] },
                    { "id": 2, "is_final": true }
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_facade_produces_all_reports() {
        let evaluator = evaluator();
        let workflows = vec![workflow(), workflow()];

        let matrix = evaluator.workflow_similarity(&workflows).await.unwrap();
        assert_eq!(matrix.len(), 2);
        assert!((matrix.get(0, 1) - 1.0).abs() < 1e-12);

        let structure = evaluator.analyze_structure(&workflows[0]);
        assert_eq!(structure.score, 1.0);

        let coherence = evaluator.reasoning_coherence(&workflows[0]).await.unwrap();
        assert!(coherence.overall > 0.0 && coherence.overall <= 1.0);

        let intent = evaluator.intent_resolution(&workflows[0]).await.unwrap();
        assert!(intent.score > 0.0 && intent.score <= 1.0);
    }

    #[tokio::test]
    async fn test_reset_clears_the_shared_cache() {
        let evaluator = evaluator();
        evaluator.cache().score("a", "b").await.unwrap();
        assert!(evaluator.cache().cached_scores() > 0);
        evaluator.reset();
        assert_eq!(evaluator.cache().cached_scores(), 0);
        assert_eq!(evaluator.cache().cached_vectors(), 0);
    }

    #[tokio::test]
    async fn test_independent_evaluators_do_not_share_state() {
        let first = evaluator();
        let second = evaluator();
        first.cache().score("a", "b").await.unwrap();
        assert_eq!(second.cache().cached_scores(), 0);
    }
}
