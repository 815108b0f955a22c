//! Reference constraint documents
//!
//! A reference spec declares the expected shape of a correct workflow for a
//! task: how many calls to which tools, how much LLM reasoning, how many
//! steps, and which decision branches must exist. Documents are authored by
//! hand in JSON or YAML and loaded read-only.

use crate::error::{FlowgaugeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Inclusive `[min, max]` bound on an occurrence count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    /// Whether a count falls inside the range.
    pub fn contains(&self, count: usize) -> bool {
        self.min <= count && count <= self.max
    }
}

/// A required decision branch: a branching LLM step whose text mentions one
/// of the keywords and which fans out into exactly `transitions` edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchPattern {
    /// Keywords identifying the decision (any one suffices)
    pub keywords: Vec<String>,
    /// Exact number of outgoing transitions the branch must have
    pub transitions: usize,
}

/// Declarative expectations for a correct workflow.
///
/// Tool expectations are grouped by category; within a category any single
/// satisfying tool suffices, so alternative tool choices are not penalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSpec {
    /// category -> tool name -> expected call-count range
    #[serde(default)]
    pub expected_tool_calls: BTreeMap<String, BTreeMap<String, CountRange>>,

    /// Expected number of LLM-call steps
    pub expected_llm_calls: CountRange,

    /// Expected total step count
    pub expected_step_count_range: CountRange,

    /// name -> required branch pattern
    #[serde(default)]
    pub expected_branch_transitions: BTreeMap<String, BranchPattern>,
}

impl ReferenceSpec {
    /// Load a reference document from a JSON or YAML file, chosen by
    /// extension. A missing or malformed document aborts scoring; there is
    /// no degraded default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowgaugeError::Reference(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }
}
