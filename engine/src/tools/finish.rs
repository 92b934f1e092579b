//! `FINISH` descriptor
//!
//! The agent loop intercepts `FINISH` before dispatch; this tool exists so
//! the action is listed alongside the real tools in the prompt.

use async_trait::async_trait;
use serde_json::{json, Value};

use sdk::tool::Tool;
use sdk::types::{ToolError, ToolInput, ToolOutput};

use crate::agent::action::FINISH_ACTION;

#[derive(Debug, Default, Clone, Copy)]
pub struct FinishTool;

#[async_trait]
impl Tool for FinishTool {
    fn name(&self) -> &str {
        FINISH_ACTION
    }

    fn description(&self) -> &str {
        "Signal that the task is complete and the final answer can be written"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(&self, _input: ToolInput) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::empty())
    }
}
