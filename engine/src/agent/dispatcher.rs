//! Action Dispatcher
//!
//! Resolves an [`Action`] against the tool registry and runs it. Every
//! outcome, failures included, comes back as observation text so the model
//! can see what went wrong and correct itself on the next step.
//!
//! Each invocation runs in its own tokio task under a deadline: a panicking
//! tool surfaces as a `JoinError` and a slow one is aborted.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use sdk::errors::EngineError;

use super::action::Action;
use crate::tools::ToolRegistry;

/// Observation when there is nothing to dispatch
pub const NO_VALID_ACTION: &str = "No valid action or tool name provided";

/// Executes actions, never failing outward
pub struct ActionDispatcher {
    tools: Arc<ToolRegistry>,
    tool_timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(tools: Arc<ToolRegistry>, tool_timeout: Duration) -> Self {
        Self {
            tools,
            tool_timeout,
        }
    }

    /// Run `action` and return its observation text
    pub async fn execute(&self, action: Option<&Action>) -> String {
        let Some(action) = action.filter(|a| !a.name().trim().is_empty()) else {
            warn!("{}", NO_VALID_ACTION);
            return NO_VALID_ACTION.to_string();
        };

        let name = action.name();
        let Some(tool) = self.tools.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return EngineError::ToolNotFound(name.to_string()).to_string();
        };

        let input = action.to_input();
        let args = input.to_json();
        debug!("Dispatching tool '{}' with args: {}", name, args);

        let mut handle = tokio::spawn(async move { tool.invoke(input).await });

        match timeout(self.tool_timeout, &mut handle).await {
            Ok(Ok(Ok(output))) => output.into_text(),
            Ok(Ok(Err(e))) if e.is_validation() => {
                warn!("Tool '{}' rejected its arguments: {}", name, e);
                format!("Argument validation error: {}, args: {}", e, args)
            }
            Ok(Ok(Err(e))) => {
                warn!("Tool '{}' failed ({}): {}", name, e.kind(), e);
                format!("Execution error: {}, kind: {}, args: {}", e, e.kind(), args)
            }
            Ok(Err(join_error)) if join_error.is_panic() => {
                warn!("Tool '{}' panicked", name);
                format!("Execution error: tool panicked, kind: Panic, args: {}", args)
            }
            Ok(Err(_)) => {
                warn!("Tool '{}' was cancelled", name);
                format!(
                    "Execution error: tool was cancelled, kind: Cancelled, args: {}",
                    args
                )
            }
            Err(_) => {
                handle.abort();
                let secs = self.tool_timeout.as_secs_f64();
                warn!("Tool '{}' timed out after {}s", name, secs);
                format!("Tool timed out after {}s, args: {}", secs, args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;
    use async_trait::async_trait;
    use sdk::tool::Tool;
    use sdk::types::{ToolError, ToolInput, ToolOutput};
    use serde_json::{json, Map, Value};

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }
        async fn invoke(&self, _input: ToolInput) -> Result<ToolOutput, ToolError> {
            Err(ToolError::execution("HttpError", "503 Service Unavailable"))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "explode"
        }
        fn description(&self) -> &str {
            "panics"
        }
        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }
        async fn invoke(&self, _input: ToolInput) -> Result<ToolOutput, ToolError> {
            panic!("boom");
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "sleeps"
        }
        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }
        async fn invoke(&self, _input: ToolInput) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ToolOutput::text("too late"))
        }
    }

    fn dispatcher() -> ActionDispatcher {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(EchoTool),
            Arc::new(FailingTool),
            Arc::new(PanickingTool),
            Arc::new(SlowTool),
        ];
        let registry = ToolRegistry::new(tools).unwrap();
        ActionDispatcher::new(Arc::new(registry), Duration::from_millis(100))
    }

    fn action(name: &str, args: Value) -> Action {
        let args: Map<String, Value> = serde_json::from_value(args).unwrap();
        Action::new(name, args)
    }

    #[tokio::test]
    async fn test_echo_success() {
        let observation = dispatcher()
            .execute(Some(&action("echo", json!({"text": "hi"}))))
            .await;
        assert_eq!(observation, "hi");
    }

    #[tokio::test]
    async fn test_missing_action() {
        assert_eq!(dispatcher().execute(None).await, NO_VALID_ACTION);
        assert_eq!(
            dispatcher().execute(Some(&action("", json!({})))).await,
            NO_VALID_ACTION
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let observation = dispatcher().execute(Some(&action("ghost", json!({})))).await;
        assert_eq!(observation, "Tool not found: ghost");
    }

    #[tokio::test]
    async fn test_validation_error() {
        let observation = dispatcher()
            .execute(Some(&action("echo", json!({"text": 5}))))
            .await;
        assert!(observation.starts_with("Argument validation error: "));
        assert!(observation.ends_with(r#"args: {"text":5}"#));
    }

    #[tokio::test]
    async fn test_execution_error() {
        let observation = dispatcher().execute(Some(&action("fail", json!({})))).await;
        assert_eq!(
            observation,
            "Execution error: 503 Service Unavailable, kind: HttpError, args: {}"
        );
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let observation = dispatcher()
            .execute(Some(&action("explode", json!({"x": 1}))))
            .await;
        assert_eq!(
            observation,
            r#"Execution error: tool panicked, kind: Panic, args: {"x":1}"#
        );
    }

    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let observation = dispatcher().execute(Some(&action("slow", json!({})))).await;
        assert_eq!(observation, "Tool timed out after 0.1s, args: {}");
    }

    #[tokio::test]
    async fn test_dispatch_is_idempotent_for_pure_tool() {
        let dispatcher = dispatcher();
        let echo = action("echo", json!({"text": "same"}));
        let first = dispatcher.execute(Some(&echo)).await;
        let second = dispatcher.execute(Some(&echo)).await;
        assert_eq!(first, second);
    }
}
