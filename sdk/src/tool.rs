//! Tool trait
//!
//! Every capability the agent can invoke implements `Tool`. The engine keeps
//! tools behind `Arc<dyn Tool>` in an immutable registry keyed by `name()`.

use async_trait::async_trait;

use crate::types::{ToolError, ToolInput, ToolOutput};

/// Trait that all agent tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name the model uses to select this tool
    fn name(&self) -> &str;

    /// Returns a one-line description shown to the model
    fn description(&self) -> &str;

    /// Returns the JSON Schema object describing the accepted arguments
    fn parameters(&self) -> serde_json::Value;

    /// Invoke the tool with the model-proposed arguments
    ///
    /// Argument problems are reported as `ToolError::MissingParameter` or
    /// `ToolError::InvalidParameter`; anything else as `ToolError::Execution`.
    async fn invoke(&self, input: ToolInput) -> Result<ToolOutput, ToolError>;
}
