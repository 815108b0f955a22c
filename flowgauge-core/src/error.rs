//! Error types for flowgauge operations

/// Result type for flowgauge operations
pub type Result<T> = std::result::Result<T, FlowgaugeError>;

/// Error types for the flowgauge evaluation engine
#[derive(Debug, thiserror::Error)]
pub enum FlowgaugeError {
    /// Embedding provider failed or is unavailable
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Tool not found in the catalog
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool with this name already registered
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// Reference constraint document is missing or malformed
    #[error("Reference error: {0}")]
    Reference(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for FlowgaugeError {
    fn from(s: String) -> Self {
        FlowgaugeError::Other(s)
    }
}

impl From<&str> for FlowgaugeError {
    fn from(s: &str) -> Self {
        FlowgaugeError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for FlowgaugeError {
    fn from(err: anyhow::Error) -> Self {
        FlowgaugeError::Other(err.to_string())
    }
}
