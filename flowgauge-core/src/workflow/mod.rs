//! Workflow and execution data model
//!
//! Workflows are branch-structured plans mixing tool invocations and LLM
//! reasoning calls. Executions are the captured outputs of replaying a
//! workflow, keyed by step id. Both are value objects: produced elsewhere,
//! never mutated once handed to the evaluation engine.

pub mod execution;
pub mod model;

pub use execution::ExecutionState;
pub use model::{
    FinalStep, LlmStep, Metadata, ParamValue, Step, StepId, ToolParameter, ToolStep, Transition,
    Workflow,
};
