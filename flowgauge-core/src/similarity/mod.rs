//! Structural and semantic similarity over workflows and executions
//!
//! Two independently generated workflows for the same request differ in step
//! ids, ordering, and free-text phrasing. This module aligns their steps
//! despite that, scores similarity at step, transition, and whole-workflow
//! granularity, and applies the same treatment to captured execution traces.

pub mod align;
pub mod execution;
pub mod matrix;
pub mod workflow;

pub use align::{StepAligner, StepAlignment, StepMatch};
pub use execution::ExecutionComparator;
pub use matrix::{MatrixStats, SimilarityMatrix};
pub use workflow::WorkflowComparator;
