//! Correctness scoring against a reference constraint document

use crate::scoring::reference::{CountRange, ReferenceSpec};
use crate::workflow::{Step, Workflow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Primary-signal weights. Tool usage dominates; step-count and branching
/// shape outrank raw LLM-call volume.
const TOOL_WEIGHT: f64 = 0.40;
const LLM_WEIGHT: f64 = 0.15;
const STEP_WEIGHT: f64 = 0.25;
const TRANSITION_WEIGHT: f64 = 0.20;

/// Per-workflow correctness breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectnessReport {
    /// Mean of per-category scores; each category takes its best tool
    pub tool_score: f64,
    /// Range adherence of the LLM-call count
    pub llm_score: f64,
    /// Range adherence of the total step count
    pub step_score: f64,
    /// Fraction of required branch patterns matched
    pub transition_score: f64,
    /// Unweighted mean of the four components (diagnostic)
    pub mean: f64,
    /// Weighted aggregate (primary signal)
    pub weighted: f64,
    /// Per-category tool scores, for report drill-down
    pub category_scores: BTreeMap<String, f64>,
    /// Names of branch patterns that were satisfied
    pub matched_patterns: Vec<String>,
}

/// Adherence of a count to an inclusive range.
///
/// 1.0 inside the range; outside, the distance to the nearest bound is
/// normalized by the range midpoint and the score floors at zero. A zero
/// midpoint leaves no scale to grade against, so any out-of-range count
/// scores 0.0.
pub fn range_score(count: usize, min: usize, max: usize) -> f64 {
    if min <= count && count <= max {
        return 1.0;
    }
    let midpoint = (min + max) as f64 / 2.0;
    if midpoint == 0.0 {
        return 0.0;
    }
    let distance = if count < min {
        (min - count) as f64
    } else {
        (count - max) as f64
    };
    (1.0 - distance / midpoint).max(0.0)
}

fn range_score_for(count: usize, range: &CountRange) -> f64 {
    range_score(count, range.min, range.max)
}

/// Score a workflow against a reference constraint document.
pub fn score_against_reference(workflow: &Workflow, reference: &ReferenceSpec) -> CorrectnessReport {
    let mut tool_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut llm_count = 0usize;
    for step in &workflow.steps {
        match step {
            Step::Tool(s) => *tool_counts.entry(s.tool_name.as_str()).or_insert(0) += 1,
            Step::Llm(_) => llm_count += 1,
            Step::Final(_) => {}
        }
    }

    // Each category is satisfied by its best-scoring tool: alternative tool
    // choices within a category are not penalized.
    let mut category_scores = BTreeMap::new();
    for (category, tools) in &reference.expected_tool_calls {
        let best = tools
            .iter()
            .map(|(tool, range)| {
                range_score_for(tool_counts.get(tool.as_str()).copied().unwrap_or(0), range)
            })
            .fold(0.0f64, f64::max);
        category_scores.insert(category.clone(), best);
    }
    let tool_score = if category_scores.is_empty() {
        1.0
    } else {
        category_scores.values().sum::<f64>() / category_scores.len() as f64
    };

    let llm_score = range_score_for(llm_count, &reference.expected_llm_calls);
    let step_score = range_score_for(workflow.steps.len(), &reference.expected_step_count_range);

    let mut matched_patterns = Vec::new();
    for (name, pattern) in &reference.expected_branch_transitions {
        let satisfied = workflow.steps.iter().any(|step| {
            let Step::Llm(llm) = step else { return false };
            if llm.transitions.len() <= 1 || llm.transitions.len() != pattern.transitions {
                return false;
            }
            let text = format!("{} {}", llm.prompt, llm.thoughts).to_lowercase();
            pattern
                .keywords
                .iter()
                .any(|k| text.contains(&k.to_lowercase()))
        });
        if satisfied {
            matched_patterns.push(name.clone());
        }
    }
    let transition_score = if reference.expected_branch_transitions.is_empty() {
        1.0
    } else {
        matched_patterns.len() as f64 / reference.expected_branch_transitions.len() as f64
    };

    let mean = (tool_score + llm_score + step_score + transition_score) / 4.0;
    let weighted = TOOL_WEIGHT * tool_score
        + LLM_WEIGHT * llm_score
        + STEP_WEIGHT * step_score
        + TRANSITION_WEIGHT * transition_score;

    debug!(tool_score, llm_score, step_score, transition_score, weighted, "correctness scored");

    CorrectnessReport {
        tool_score,
        llm_score,
        step_score,
        transition_score,
        mean,
        weighted,
        category_scores,
        matched_patterns,
    }
}
