//! Structural defect analysis and reasoning-coherence heuristics
//!
//! Structural analysis walks the step graph looking for defects a generator
//! can introduce: transitions to nonexistent steps, unreachable steps, dead
//! ends, and graphs with no path to completion. Reasoning coherence scores
//! the free-text rationale: do consecutive thoughts build on each other, do
//! transition conditions relate to their step, does the stated reasoning
//! match the action taken.

use crate::embedding::SimilarityCache;
use crate::error::Result;
use crate::tools::ToolCatalog;
use crate::workflow::{Step, StepId, Workflow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

const THOUGHT_CONTINUITY_WEIGHT: f64 = 0.30;
const TRANSITION_VALIDITY_WEIGHT: f64 = 0.25;
const STRUCTURAL_WEIGHT: f64 = 0.25;
const ACTION_ALIGNMENT_WEIGHT: f64 = 0.20;

/// Conventional entry point of a workflow graph.
const ENTRY_STEP: &str = "1";

/// A structural defect found in a workflow's step graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StructuralIssue {
    /// A transition references a step id that does not exist
    InvalidTransitionTarget { step: StepId, target: StepId },
    /// A step is not reachable from the entry step
    UnreachableStep { step: StepId },
    /// A non-final step has no outgoing transitions
    DeadEnd { step: StepId },
    /// No final step is reachable from the entry step
    NoPathToCompletion,
}

impl StructuralIssue {
    /// Issue weight against the check count. Unreachability and dead ends
    /// are half-issues: either can be an intentional stub in a graph the
    /// analyzer does not see in full.
    pub fn weight(&self) -> f64 {
        match self {
            StructuralIssue::InvalidTransitionTarget { .. } => 1.0,
            StructuralIssue::UnreachableStep { .. } => 0.5,
            StructuralIssue::DeadEnd { .. } => 0.5,
            StructuralIssue::NoPathToCompletion => 1.0,
        }
    }
}

/// Result of structural analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralReport {
    /// `1 - issues/checks`, floored at 0; 1.0 with no applicable checks,
    /// 0.0 for an empty workflow
    pub score: f64,
    /// Every defect found, attributable by category
    pub issues: Vec<StructuralIssue>,
    /// Number of checks performed
    pub checks: usize,
}

/// Analyze the step graph for structural defects.
pub fn analyze_structure(steps: &[Step]) -> StructuralReport {
    if steps.is_empty() {
        return StructuralReport {
            score: 0.0,
            issues: Vec::new(),
            checks: 0,
        };
    }

    let ids: HashSet<&StepId> = steps.iter().map(Step::id).collect();
    let mut issues = Vec::new();
    let mut checks = 0usize;

    // Every transition must target a real step.
    for step in steps {
        for transition in step.transitions() {
            checks += 1;
            if !ids.contains(&transition.next_step) {
                issues.push(StructuralIssue::InvalidTransitionTarget {
                    step: step.id().clone(),
                    target: transition.next_step.clone(),
                });
            }
        }
    }

    // Reachability from the conventional entry step, when present.
    let entry = StepId::new(ENTRY_STEP);
    let reachable = ids.contains(&entry).then(|| reachable_from(steps, &entry));
    if let Some(reachable) = &reachable {
        for step in steps {
            if step.id() == &entry {
                continue;
            }
            checks += 1;
            if !reachable.contains(step.id()) {
                issues.push(StructuralIssue::UnreachableStep {
                    step: step.id().clone(),
                });
            }
        }
    }

    // A non-final step with nowhere to go strands execution.
    for step in steps {
        if step.is_final() {
            continue;
        }
        checks += 1;
        if step.transitions().is_empty() {
            issues.push(StructuralIssue::DeadEnd {
                step: step.id().clone(),
            });
        }
    }

    // If the graph has an entry and a terminal marker, completion must be
    // reachable.
    if let Some(reachable) = &reachable {
        let finals: Vec<&StepId> = steps
            .iter()
            .filter(|s| s.is_final())
            .map(Step::id)
            .collect();
        if !finals.is_empty() {
            checks += 1;
            if !finals.iter().any(|id| reachable.contains(*id)) {
                issues.push(StructuralIssue::NoPathToCompletion);
            }
        }
    }

    let score = if checks == 0 {
        1.0
    } else {
        let weight: f64 = issues.iter().map(StructuralIssue::weight).sum();
        (1.0 - weight / checks as f64).max(0.0)
    };

    StructuralReport {
        score,
        issues,
        checks,
    }
}

/// Breadth-first reachability over transition edges.
fn reachable_from(steps: &[Step], entry: &StepId) -> HashSet<StepId> {
    let by_id: HashMap<&StepId, &Step> = steps.iter().map(|s| (s.id(), s)).collect();
    let mut seen: HashSet<StepId> = HashSet::new();
    let mut queue = VecDeque::new();

    seen.insert(entry.clone());
    queue.push_back(entry.clone());
    while let Some(id) = queue.pop_front() {
        let Some(step) = by_id.get(&id) else { continue };
        for transition in step.transitions() {
            if seen.insert(transition.next_step.clone()) {
                queue.push_back(transition.next_step.clone());
            }
        }
    }
    seen
}

/// Per-workflow reasoning-coherence breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoherenceReport {
    /// Do consecutive thoughts build on each other
    pub thought_continuity: f64,
    /// Do transition conditions relate to their originating step
    pub transition_validity: f64,
    /// Structural soundness of the step graph
    pub structural: StructuralReport,
    /// Does the stated reasoning match the action taken
    pub action_alignment: f64,
    /// Weighted blend of the four components
    pub overall: f64,
}

static PROGRESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(then|next|after)\b").expect("valid progression regex"));
static BUILDS_ON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(result|output|using)\b").expect("valid builds-on regex"));
static GROUNDING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(based on|given the)\b").expect("valid grounding regex"));
static ACTION_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(call|use|invoke|get|fetch|compute|analyze|send)\b")
        .expect("valid action-verb regex")
});
static REASONING_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(decide|determine|analyze|reason|evaluate|consider|check|verify)\b")
        .expect("valid reasoning-verb regex")
});

/// Scores reasoning coherence over a workflow's text and graph.
pub struct CoherenceAnalyzer {
    cache: Arc<SimilarityCache>,
    catalog: Arc<ToolCatalog>,
}

impl CoherenceAnalyzer {
    /// Create an analyzer over the shared cache and tool catalog.
    pub fn new(cache: Arc<SimilarityCache>, catalog: Arc<ToolCatalog>) -> Self {
        Self { cache, catalog }
    }

    /// Composite reasoning-coherence score and its components.
    pub async fn reasoning_coherence(&self, workflow: &Workflow) -> Result<CoherenceReport> {
        let thought_continuity = self.thought_continuity(workflow).await?;
        let transition_validity = self.transition_validity(workflow).await?;
        let structural = analyze_structure(&workflow.steps);
        let action_alignment = action_alignment(workflow);

        let overall = THOUGHT_CONTINUITY_WEIGHT * thought_continuity
            + TRANSITION_VALIDITY_WEIGHT * transition_validity
            + STRUCTURAL_WEIGHT * structural.score
            + ACTION_ALIGNMENT_WEIGHT * action_alignment;

        debug!(
            thought_continuity,
            transition_validity,
            structural = structural.score,
            action_alignment,
            overall,
            "reasoning coherence"
        );

        Ok(CoherenceReport {
            thought_continuity,
            transition_validity,
            structural,
            action_alignment,
            overall,
        })
    }

    /// How well each thought follows from its predecessor.
    ///
    /// Semantic similarity of consecutive thoughts carries most of the
    /// score over a flat baseline; explicit progression language in the
    /// follow-up thought earns small bonuses.
    pub async fn thought_continuity(&self, workflow: &Workflow) -> Result<f64> {
        let steps: Vec<&Step> = workflow.action_steps().collect();
        if steps.len() < 2 {
            return Ok(1.0);
        }

        let mut total = 0.0;
        let pairs = steps.len() - 1;
        for window in steps.windows(2) {
            let previous = window[0].thoughts().unwrap_or("").trim();
            let current = window[1].thoughts().unwrap_or("").trim();
            if previous.is_empty() || current.is_empty() {
                total += 0.5;
                continue;
            }

            let mut score = 0.7 * self.cache.score(previous, current).await? + 0.3;
            for pattern in [&*PROGRESSION_RE, &*BUILDS_ON_RE, &*GROUNDING_RE] {
                if pattern.is_match(current) {
                    score += 0.1;
                }
            }
            total += score.min(1.0);
        }

        Ok(total / pairs as f64)
    }

    /// How relevant each transition condition is to its originating step.
    ///
    /// Conditions on tool steps that mention the tool or one of its declared
    /// output fields are credited without an embedding call; everything else
    /// falls back to semantic similarity against the step's text. Relevance
    /// floors at 0.5: a transition is at worst "less relevant", never wholly
    /// irrelevant.
    pub async fn transition_validity(&self, workflow: &Workflow) -> Result<f64> {
        let mut total = 0.0;
        let mut count = 0usize;

        for step in &workflow.steps {
            for transition in step.transitions() {
                count += 1;
                let relevance = match step {
                    Step::Llm(llm) => self.cache.score(&transition.condition, &llm.prompt).await?,
                    Step::Tool(tool) => {
                        let condition = transition.condition.to_lowercase();
                        if self.mentions_tool(&condition, &tool.tool_name)? {
                            0.7
                        } else {
                            self.cache.score(&transition.condition, &tool.thoughts).await?
                        }
                    }
                    Step::Final(_) => unreachable!("final steps have no transitions"),
                };
                total += relevance.max(0.5);
            }
        }

        if count == 0 {
            return Ok(1.0);
        }
        Ok(total / count as f64)
    }

    fn mentions_tool(&self, condition: &str, tool_name: &str) -> Result<bool> {
        if condition.contains(&tool_name.to_lowercase()) {
            return Ok(true);
        }
        let outputs = self.catalog.outputs(tool_name)?;
        Ok(outputs
            .iter()
            .any(|o| condition.contains(&o.key.to_lowercase())))
    }
}

/// How well each step's stated reasoning matches its action.
///
/// Tool steps are graded on tool-name words appearing in the thought plus a
/// generic action-verb bonus; LLM steps on the presence of a reasoning verb.
pub fn action_alignment(workflow: &Workflow) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;

    for step in workflow.action_steps() {
        count += 1;
        total += match step {
            Step::Tool(tool) => {
                let thoughts = tool.thoughts.trim().to_lowercase();
                if thoughts.is_empty() {
                    0.5
                } else {
                    let words: Vec<&str> =
                        tool.tool_name.split('_').filter(|w| !w.is_empty()).collect();
                    let present = words.iter().filter(|w| thoughts.contains(**w)).count();
                    let fraction = if words.is_empty() {
                        0.0
                    } else {
                        present as f64 / words.len() as f64
                    };
                    let verb_bonus = if ACTION_VERB_RE.is_match(&thoughts) { 0.4 } else { 0.2 };
                    (0.6 * fraction + verb_bonus).min(1.0)
                }
            }
            Step::Llm(llm) => {
                let thoughts = llm.thoughts.trim();
                if thoughts.is_empty() {
                    0.5
                } else if REASONING_VERB_RE.is_match(thoughts) {
                    0.8
                } else {
                    0.5
                }
            }
            Step::Final(_) => unreachable!("action_steps filters terminal markers"),
        };
    }

    if count == 0 {
        return 1.0;
    }
    total / count as f64
}
