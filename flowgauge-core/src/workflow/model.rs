//! Workflow definitions
//!
//! The step union is an explicit discriminated type: a step is a tool call,
//! an LLM call, or a terminal marker, and every consumer matches on the
//! variant. Generators persist integer step ids while regenerated workflows
//! may renumber them arbitrarily, so ids are opaque ordered tokens rather
//! than indices.

use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Opaque step identifier.
///
/// Persisted workflows use integer ids starting at 1; the evaluation engine
/// never relies on numbering beyond the conventional entry id `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(String);

impl StepId {
    /// Create a step id from any displayable token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for StepId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for StepId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(i64),
            Str(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Num(n) => StepId(n.to_string()),
            Repr::Str(s) => StepId(s),
        })
    }
}

impl Serialize for StepId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Round-trip numeric ids to the wire form generators persist.
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

/// Provenance information for a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// The verbatim user prompt that initiated workflow generation
    pub original_prompt: String,
}

/// A scalar parameter value, or a `{step_id.output_field}` back-reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{([^.{}]+)\.([^.{}]+)\}$").expect("valid reference regex"));

impl ParamValue {
    /// Parse the value as a back-reference to a prior step's output field.
    ///
    /// Returns `(step_id, output_field)` for values of the form
    /// `{step_id.output_field}`, `None` for literals.
    pub fn as_reference(&self) -> Option<(StepId, &str)> {
        let ParamValue::Str(s) = self else {
            return None;
        };
        let caps = REFERENCE_RE.captures(s)?;
        let field = caps.get(2)?;
        Some((StepId::new(&caps[1]), &s[field.range()]))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A single key/value parameter passed to a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name matching the tool's input schema
    pub key: String,
    /// Literal value or back-reference to a prior step's output
    pub value: ParamValue,
}

/// A conditional edge from one step to a candidate next step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// Natural-language condition guarding this edge
    pub condition: String,
    /// Target step id when the condition holds
    pub next_step: StepId,
}

/// Action discriminator for tool-call steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolAction {
    #[serde(rename = "call_tool")]
    CallTool,
}

/// Action discriminator for LLM-call steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmAction {
    #[serde(rename = "call_llm")]
    CallLlm,
}

/// A step that invokes a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStep {
    pub id: StepId,

    /// Free-text rationale for this step
    #[serde(default)]
    pub thoughts: String,

    pub action: ToolAction,

    /// Name of the tool to invoke
    pub tool_name: String,

    /// Input parameters for the tool
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,

    /// Outgoing edges; empty in linear workflows. Older generators persist a
    /// singular `transition` object, accepted here as a one-element list.
    #[serde(
        default,
        alias = "transition",
        deserialize_with = "one_or_many_transitions"
    )]
    pub transitions: Vec<Transition>,
}

/// A step that invokes LLM reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmStep {
    pub id: StepId,

    /// Free-text rationale for this step
    #[serde(default)]
    pub thoughts: String,

    pub action: LlmAction,

    /// Prompt sent to the LLM, possibly containing back-references
    pub prompt: String,

    /// Outgoing edges; empty in linear workflows
    #[serde(
        default,
        alias = "transition",
        deserialize_with = "one_or_many_transitions"
    )]
    pub transitions: Vec<Transition>,
}

/// Terminal marker step. Has no action and no outgoing transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalStep {
    pub id: StepId,

    #[serde(deserialize_with = "de_literal_true")]
    pub is_final: bool,
}

fn de_literal_true<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flagged = bool::deserialize(deserializer)?;
    if !flagged {
        return Err(D::Error::custom("final steps must set is_final to true"));
    }
    Ok(true)
}

fn one_or_many_transitions<'de, D>(deserializer: D) -> std::result::Result<Vec<Transition>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Transition),
        Many(Vec<Transition>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(t) => vec![t],
        OneOrMany::Many(v) => v,
    })
}

/// A workflow step: tool call, LLM call, or terminal marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Tool(ToolStep),
    Llm(LlmStep),
    Final(FinalStep),
}

const NO_TRANSITIONS: &[Transition] = &[];

impl Step {
    /// The step's id.
    pub fn id(&self) -> &StepId {
        match self {
            Step::Tool(s) => &s.id,
            Step::Llm(s) => &s.id,
            Step::Final(s) => &s.id,
        }
    }

    /// Whether this is a terminal marker step.
    pub fn is_final(&self) -> bool {
        matches!(self, Step::Final(_))
    }

    /// The step's free-text rationale; `None` for terminal markers.
    pub fn thoughts(&self) -> Option<&str> {
        match self {
            Step::Tool(s) => Some(&s.thoughts),
            Step::Llm(s) => Some(&s.thoughts),
            Step::Final(_) => None,
        }
    }

    /// The LLM prompt, for LLM-call steps.
    pub fn prompt(&self) -> Option<&str> {
        match self {
            Step::Llm(s) => Some(&s.prompt),
            _ => None,
        }
    }

    /// Outgoing transitions; terminal markers never have any.
    pub fn transitions(&self) -> &[Transition] {
        match self {
            Step::Tool(s) => &s.transitions,
            Step::Llm(s) => &s.transitions,
            Step::Final(_) => NO_TRANSITIONS,
        }
    }

    /// The step's representative text: the prompt for LLM calls, the
    /// rationale for tool calls. `None` for terminal markers.
    pub fn text(&self) -> Option<&str> {
        match self {
            Step::Tool(s) => Some(&s.thoughts),
            Step::Llm(s) => Some(&s.prompt),
            Step::Final(_) => None,
        }
    }
}

/// A plan composed of ordered, possibly branching steps.
///
/// Step list order is insertion order; execution order is defined by
/// transitions from the conventional entry step id `1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Human-readable title
    pub title: String,

    /// What the workflow does
    pub description: String,

    /// The goal this workflow aims to achieve
    pub target_objective: String,

    /// Provenance, including the original user prompt
    pub metadata: Metadata,

    /// The workflow's steps
    pub steps: Vec<Step>,
}

impl Workflow {
    /// Load a workflow from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the workflow to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// All step ids present in the workflow.
    pub fn step_ids(&self) -> HashSet<&StepId> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    /// Look up a step by id.
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id() == id)
    }

    /// Steps that are not terminal markers, in list order.
    pub fn action_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| !s.is_final())
    }

    /// All transition edges as `(from, transition)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&StepId, &Transition)> {
        self.steps
            .iter()
            .flat_map(|s| s.transitions().iter().map(move |t| (s.id(), t)))
    }

    /// Concatenated narrative text: title, description, and each action
    /// step's rationale and prompt.
    pub fn narrative(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.title, &self.description];
        for step in self.action_steps() {
            if let Some(thoughts) = step.thoughts()
                && !thoughts.is_empty()
            {
                parts.push(thoughts);
            }
            if let Some(prompt) = step.prompt()
                && !prompt.is_empty()
            {
                parts.push(prompt);
            }
        }
        parts.join("\n")
    }
}
