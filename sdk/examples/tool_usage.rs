//! Example demonstrating a minimal `Tool` implementation

use async_trait::async_trait;
use sdk::{Tool, ToolError, ToolInput, ToolOutput};
use serde_json::json;

/// Upper-cases its `text` argument
struct ShoutTool;

#[async_trait]
impl Tool for ShoutTool {
    fn name(&self) -> &str {
        "shout"
    }

    fn description(&self) -> &str {
        "Repeat the given text in upper case"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }

    async fn invoke(&self, input: ToolInput) -> Result<ToolOutput, ToolError> {
        let text = input.param_str("text")?;
        Ok(ToolOutput::text(text.to_uppercase()))
    }
}

#[tokio::main]
async fn main() {
    let tool = ShoutTool;

    let input = ToolInput::new().with_param("text", json!("all aboard"));
    match tool.invoke(input.clone()).await {
        Ok(output) => println!("{} {} -> {}", tool.name(), input.to_json(), output.into_text()),
        Err(e) => println!("Error: {}", e),
    }

    // Missing arguments surface as validation errors
    match tool.invoke(ToolInput::new()).await {
        Ok(output) => println!("Unexpected success: {}", output.into_text()),
        Err(e) => println!("Validation error (expected): {} [{}]", e, e.kind()),
    }
}
