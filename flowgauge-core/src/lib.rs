//! # Flowgauge - Workflow Evaluation Engine
//!
//! Flowgauge compares, aligns, and scores LLM-generated workflows and their
//! execution traces:
//! - Step alignment between differently-numbered workflow generations
//! - Structural/semantic similarity at step, transition, and workflow level
//! - Execution-trace comparison over heterogeneous JSON outputs
//! - Correctness scoring against declarative reference constraints
//! - Structural defect detection (invalid targets, dead ends, unreachable
//!   steps, no path to completion)
//! - Reasoning-coherence and intent-resolution heuristics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowgauge_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let provider = Arc::new(HashedNgramEmbeddings::default());
//!     let catalog = Arc::new(ToolCatalog::load("tools.json")?);
//!     let evaluator = Evaluator::new(provider, catalog);
//!
//!     let a = Workflow::load("data/workflows/workflow_1.json")?;
//!     let b = Workflow::load("data/workflows/workflow_2.json")?;
//!     let matrix = evaluator.workflow_similarity(&[a, b]).await?;
//!     println!("similarity: {:.3}", matrix.get(0, 1));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! All scoring flows through one injected [`embedding::SimilarityCache`];
//! semantic scores are memoized per string pair for the lifetime of a batch
//! and cleared with [`evaluator::Evaluator::reset`]. An unavailable
//! embedding provider is a hard error: silently substituting a neutral
//! score would corrupt comparative statistics.

pub mod embedding;
pub mod error;
pub mod evaluator;
pub mod scoring;
pub mod similarity;
pub mod tools;
pub mod workflow;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::embedding::{
        EmbeddingProvider, HashedNgramEmbeddings, SimilarityCache, StaticEmbeddings,
    };
    pub use crate::error::{FlowgaugeError, Result};
    pub use crate::evaluator::Evaluator;
    pub use crate::scoring::{
        BranchPattern, CoherenceAnalyzer, CoherenceReport, CorrectnessReport, CountRange,
        IntentReport, IntentScorer, ReferenceSpec, StructuralIssue, StructuralReport,
        analyze_structure, range_score, score_against_reference,
    };
    pub use crate::similarity::{
        ExecutionComparator, MatrixStats, SimilarityMatrix, StepAligner, StepAlignment, StepMatch,
        WorkflowComparator,
    };
    pub use crate::tools::{ToolCatalog, ToolInput, ToolOutput, ToolSpec};
    pub use crate::workflow::{
        ExecutionState, FinalStep, LlmStep, Metadata, ParamValue, Step, StepId, ToolParameter,
        ToolStep, Transition, Workflow,
    };
}
