//! Echo tool: returns its `text` argument unchanged

use async_trait::async_trait;
use serde_json::{json, Value};

use sdk::tool::Tool;
use sdk::types::{ToolError, ToolInput, ToolOutput};

#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Repeat the given text back verbatim"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "text to repeat" }
            },
            "required": ["text"]
        })
    }

    async fn invoke(&self, input: ToolInput) -> Result<ToolOutput, ToolError> {
        let text = input.param_str("text")?;
        Ok(ToolOutput::text(text))
    }
}
