//! Captured execution state
//!
//! Replaying a workflow produces one output per executed step: the tool's
//! return value for tool calls, the raw text response for LLM calls. The
//! comparator consumes the captured mapping wholesale; it is never mutated
//! after capture.

use crate::error::Result;
use crate::workflow::StepId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// The record of outputs produced when a workflow is run, keyed by step id.
///
/// Backed by an ordered map so iteration, and therefore greedy alignment,
/// is deterministic across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionState {
    outputs: BTreeMap<StepId, Value>,
}

impl ExecutionState {
    /// Create an empty execution state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an execution record from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the execution record to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Record a step's output. Used when building fixtures; captured states
    /// handed to the comparator are treated as immutable.
    pub fn insert(&mut self, id: StepId, output: Value) {
        self.outputs.insert(id, output);
    }

    /// The output captured for a step, if any.
    pub fn get(&self, id: &StepId) -> Option<&Value> {
        self.outputs.get(id)
    }

    /// Iterate `(step_id, output)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&StepId, &Value)> {
        self.outputs.iter()
    }

    /// Number of captured step outputs.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether no outputs were captured.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl FromIterator<(StepId, Value)> for ExecutionState {
    fn from_iter<I: IntoIterator<Item = (StepId, Value)>>(iter: I) -> Self {
        Self {
            outputs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_from_step_keyed_object() {
        let state: ExecutionState = serde_json::from_str(
            r#"{ "1": { "temperature": 20 }, "2": "sunny day" }"#,
        )
        .unwrap();
        assert_eq!(state.len(), 2);
        assert_eq!(
            state.get(&StepId::from(1)),
            Some(&json!({ "temperature": 20 }))
        );
        assert_eq!(state.get(&StepId::from(2)), Some(&json!("sunny day")));
    }

    #[test]
    fn test_iteration_is_ordered() {
        let state: ExecutionState =
            serde_json::from_str(r#"{ "2": 2, "1": 1, "3": 3 }"#).unwrap();
        let ids: Vec<&str> = state.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution_1.json");
        let mut state = ExecutionState::new();
        state.insert(StepId::from(1), json!(5));
        state.save(&path).unwrap();
        let loaded = ExecutionState::load(&path).unwrap();
        assert_eq!(loaded.get(&StepId::from(1)), Some(&json!(5)));
    }
}
