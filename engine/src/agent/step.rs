//! Step Executor
//!
//! One reasoning step: render the step prompt from the task and the memory,
//! stream the model's reply through the token sink, and parse the collected
//! text into an [`Action`]. No retries and no caching: a reply that does not
//! parse fails the step.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

use sdk::errors::EngineError;

use super::action::{format_instructions, parse_action, Action};
use super::prompt::PromptTemplate;
use super::sink::TokenSink;
use super::working_memory::BoundedMemory;
use crate::llm::{LLMError, LLMProvider, Message};
use crate::tools::ToolRegistry;

/// Result of one step: the parsed action and the text it was parsed from
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub action: Action,
    pub raw_response: String,
}

/// Issues one model request per step
pub struct StepExecutor {
    provider: Arc<dyn LLMProvider>,
    prompt: PromptTemplate,
    llm_timeout: Duration,
}

impl StepExecutor {
    /// Create an executor; the tool list and format instructions are bound
    /// into the prompt once, here
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        prompt: PromptTemplate,
        tools: &ToolRegistry,
        llm_timeout: Duration,
    ) -> Self {
        let prompt = prompt
            .partial("tools", tools.render_descriptions())
            .partial("format_instructions", format_instructions());

        Self {
            provider,
            prompt,
            llm_timeout,
        }
    }

    /// Run one reasoning step
    ///
    /// Every streamed fragment reaches `sink` as soon as it arrives;
    /// `on_end` fires once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// - `EngineError::Template` if the prompt has an unbound variable
    /// - `EngineError::LLMProvider` / `EngineError::LLMTimeout` on transport failure
    /// - `EngineError::MalformedAction` if the reply is not a valid action
    pub async fn step(
        &self,
        task: &str,
        memory: &BoundedMemory,
        sink: &dyn TokenSink,
    ) -> Result<StepOutcome, EngineError> {
        let transcript = memory.transcript();
        let prompt = self
            .prompt
            .render(&[("task_description", task), ("memory", &transcript)])?;
        let messages = [Message::user(prompt)];

        debug!(
            "Step request: provider={}, prompt_chars={}",
            self.provider.name(),
            messages[0].content.len()
        );

        let collect = async {
            let mut stream = self.provider.stream(&messages).await?;
            let mut response = String::new();
            while let Some(fragment) = stream.next().await {
                let fragment = fragment?;
                sink.on_token(&fragment);
                response.push_str(&fragment);
            }
            Ok::<String, LLMError>(response)
        };

        let raw_response = match timeout(self.llm_timeout, collect).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!("LLM call failed: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                error!("LLM call timed out after {}s", self.llm_timeout.as_secs());
                return Err(EngineError::LLMTimeout);
            }
        };
        sink.on_end();

        debug!("Step response: {}", raw_response);

        let action = parse_action(&raw_response)?;
        Ok(StepOutcome {
            action,
            raw_response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::DEFAULT_TASK_PROMPT;
    use crate::llm::{Result as LLMResult, TokenStream};
    use crate::tools::EchoTool;
    use async_trait::async_trait;
    use sdk::tool::Tool;
    use futures::stream;
    use std::sync::Mutex;

    /// Streams a fixed reply split into fragments, recording every prompt
    struct FragmentProvider {
        fragments: Vec<String>,
        prompts: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl FragmentProvider {
        fn new(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|f| f.to_string()).collect(),
                prompts: Mutex::new(Vec::new()),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl LLMProvider for FragmentProvider {
        fn name(&self) -> &str {
            "fragments"
        }

        fn is_local(&self) -> bool {
            true
        }

        async fn complete(&self, messages: &[Message]) -> LLMResult<String> {
            self.prompts.lock().unwrap().push(messages[0].content.clone());
            Ok(self.fragments.concat())
        }

        async fn stream(&self, messages: &[Message]) -> LLMResult<TokenStream> {
            self.prompts.lock().unwrap().push(messages[0].content.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let items: Vec<LLMResult<String>> = self.fragments.iter().cloned().map(Ok).collect();
            Ok(stream::iter(items).boxed())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        tokens: Mutex<Vec<String>>,
        ends: Mutex<usize>,
    }

    impl TokenSink for RecordingSink {
        fn on_token(&self, token: &str) {
            self.tokens.lock().unwrap().push(token.to_string());
        }

        fn on_end(&self) {
            *self.ends.lock().unwrap() += 1;
        }
    }

    fn executor(provider: Arc<FragmentProvider>, llm_timeout: Duration) -> StepExecutor {
        let echo: Vec<Arc<dyn Tool>> = vec![Arc::new(EchoTool)];
        let tools = ToolRegistry::new(echo).unwrap();
        StepExecutor::new(
            provider,
            PromptTemplate::new(DEFAULT_TASK_PROMPT).unwrap(),
            &tools,
            llm_timeout,
        )
    }

    #[tokio::test]
    async fn test_step_streams_and_parses() {
        let provider = Arc::new(FragmentProvider::new(&[
            "{\"name\": \"ec",
            "ho\", \"args\": {\"text\"",
            ": \"hi\"}}",
        ]));
        let executor = executor(Arc::clone(&provider), Duration::from_secs(5));
        let sink = RecordingSink::default();
        let memory = BoundedMemory::new();

        let outcome = executor.step("say hi", &memory, &sink).await.unwrap();

        assert_eq!(outcome.action.name(), "echo");
        assert_eq!(outcome.raw_response, r#"{"name": "echo", "args": {"text": "hi"}}"#);
        assert_eq!(sink.tokens.lock().unwrap().len(), 3);
        assert_eq!(*sink.ends.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prompt_carries_task_memory_and_tools() {
        let provider = Arc::new(FragmentProvider::new(&[r#"{"name":"FINISH","args":{}}"#]));
        let executor = executor(Arc::clone(&provider), Duration::from_secs(5));
        let mut memory = BoundedMemory::new();
        memory.save("earlier response", "\nObservation:\nearlier result");

        executor
            .step("find a train", &memory, &RecordingSink::default())
            .await
            .unwrap();

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("find a train"));
        assert!(prompts[0].contains("earlier result"));
        assert!(prompts[0].contains("echo: Repeat the given text back verbatim"));
        assert!(prompts[0].contains("\"required\""));
    }

    #[tokio::test]
    async fn test_unparsable_reply_is_malformed_action() {
        let provider = Arc::new(FragmentProvider::new(&["I am not sure what to do."]));
        let executor = executor(provider, Duration::from_secs(5));

        let err = executor
            .step("task", &BoundedMemory::new(), &RecordingSink::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedAction { .. }));
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let mut provider = FragmentProvider::new(&[r#"{"name":"FINISH","args":{}}"#]);
        provider.delay = Some(Duration::from_secs(5));
        let executor = executor(Arc::new(provider), Duration::from_millis(50));
        let sink = RecordingSink::default();

        let err = executor
            .step("task", &BoundedMemory::new(), &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::LLMTimeout));
        assert_eq!(*sink.ends.lock().unwrap(), 0);
    }
}
