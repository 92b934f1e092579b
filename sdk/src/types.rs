//! Tool input/output types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input to a tool invocation: the named arguments proposed by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolInput {
    pub params: Map<String, Value>,
}

impl ToolInput {
    /// Create an empty ToolInput
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ToolInput from an argument mapping
    pub fn from_params(params: Map<String, Value>) -> Self {
        Self { params }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Get a required string parameter
    pub fn param_str(&self, key: &str) -> Result<String, ToolError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Err(ToolError::MissingParameter(key.to_string())),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ToolError::InvalidParameter(format!(
                "{} must be a string, got {}",
                key, other
            ))),
        }
    }

    /// Get an optional string parameter, falling back to `default` when absent
    pub fn param_str_or(&self, key: &str, default: &str) -> Result<String, ToolError> {
        match self.param_str(key) {
            Err(ToolError::MissingParameter(_)) => Ok(default.to_string()),
            other => other,
        }
    }

    /// Compact JSON rendering of the arguments, used in observation text
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.params).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Output from a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ToolOutput {
    /// Plain text, passed through verbatim
    Text(String),

    /// Structured data, serialized compactly when observed
    Json(Value),

    /// Nothing to report
    Empty,
}

impl ToolOutput {
    /// Create a text output
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a JSON output
    pub fn json(data: Value) -> Self {
        Self::Json(data)
    }

    /// Create an empty output
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Coerce the output to observation text
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(Value::String(text)) => text,
            Self::Json(data) => data.to_string(),
            Self::Empty => String::new(),
        }
    }
}

/// Tool-specific errors
///
/// `MissingParameter` and `InvalidParameter` are argument-validation
/// failures; `Execution` covers every other failure inside a tool.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{message}")]
    Execution { kind: String, message: String },
}

impl ToolError {
    /// Create an execution failure of the given kind
    pub fn execution(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Whether this error is an argument-validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingParameter(_) | Self::InvalidParameter(_))
    }

    /// Failure kind label used in observation text
    pub fn kind(&self) -> &str {
        match self {
            Self::MissingParameter(_) | Self::InvalidParameter(_) => "ValidationError",
            Self::Execution { kind, .. } => kind.as_str(),
        }
    }
}
