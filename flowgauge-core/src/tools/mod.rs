//! Tool catalog
//!
//! The evaluation engine never executes tools; it only consults their
//! declared schemas. The catalog is an explicitly constructed, injected
//! collaborator rather than a process-wide registry, so parallel test runs
//! cannot contaminate each other.

use crate::error::{FlowgaugeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A declared input parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    /// Parameter name
    pub name: String,
    /// Whether the parameter must be supplied
    #[serde(default)]
    pub required: bool,
}

/// A declared output field of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Output field name
    pub key: String,
}

/// Declared schema of a single tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name (e.g. `get_weather`)
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Classification category (e.g. `weather`, `finance`)
    #[serde(default)]
    pub category: String,

    /// Declared input parameters
    #[serde(default)]
    pub inputs: Vec<ToolInput>,

    /// Declared output fields
    #[serde(default)]
    pub outputs: Vec<ToolOutput>,
}

/// Catalog of tool schemas, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolSpec>,
}

impl ToolCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of specs.
    ///
    /// Fails on duplicate tool names.
    pub fn from_specs(specs: impl IntoIterator<Item = ToolSpec>) -> Result<Self> {
        let mut catalog = Self::new();
        for spec in specs {
            catalog.register(spec)?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file containing an array of tool specs.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let specs: Vec<ToolSpec> = serde_json::from_str(&content)?;
        Self::from_specs(specs)
    }

    /// Register a tool spec.
    ///
    /// Returns an error if a tool with the same name is already registered.
    pub fn register(&mut self, spec: ToolSpec) -> Result<()> {
        if self.tools.contains_key(&spec.name) {
            return Err(FlowgaugeError::DuplicateTool(spec.name));
        }
        self.tools.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Look up a tool by name.
    ///
    /// An unregistered tool is a hard error: a workflow referencing an
    /// unknown tool cannot be scored meaningfully.
    pub fn get(&self, name: &str) -> Result<&ToolSpec> {
        self.tools
            .get(name)
            .ok_or_else(|| FlowgaugeError::ToolNotFound(name.to_string()))
    }

    /// Declared output fields of a tool.
    pub fn outputs(&self, name: &str) -> Result<&[ToolOutput]> {
        Ok(&self.get(name)?.outputs)
    }

    /// Whether a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All registered tool names, in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Union of all declared output field names across the catalog.
    pub fn output_keys(&self) -> BTreeSet<&str> {
        self.tools
            .values()
            .flat_map(|t| t.outputs.iter().map(|o| o.key.as_str()))
            .collect()
    }
}
