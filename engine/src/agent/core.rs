//! Agent Core
//!
//! This module implements the agent loop that drives a task to completion.
//! Each step goes through a think-act-observe cycle:
//!
//! 1. **Thinking**: ask the model for the next action (streamed to the sink)
//! 2. **Acting**: dispatch the action to its tool
//! 3. **Observing**: save the raw response and the observation to memory
//!
//! A `FINISH` action moves to **Finishing**, where one more model call
//! writes the final reply from the memory. Running out of steps moves to
//! **Aborted** and the reply is [`TASK_NOT_COMPLETED`].
//!
//! # Limits
//!
//! - `agent.max_steps` think/act/observe iterations per task (default 3)
//! - `agent.llm_timeout_secs` per model call, fatal when exceeded
//! - `agent.tool_timeout_secs` per tool call, reported as an observation

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sdk::errors::EngineError;

use super::action::Action;
use super::dispatcher::ActionDispatcher;
use super::prompt::{PromptTemplate, DEFAULT_FINAL_PROMPT, DEFAULT_TASK_PROMPT};
use super::sink::{NoopSink, StdoutSink, TokenSink};
use super::step::{StepExecutor, StepOutcome};
use super::working_memory::BoundedMemory;
use crate::config::{AgentConfig, Config};
use crate::llm::{self, LLMProvider, Message};
use crate::tools::ToolRegistry;

/// Reply when the step budget runs out before `FINISH`
pub const TASK_NOT_COMPLETED: &str = "Task not completed!";

/// Prefix of every observation saved to memory
pub const OBSERVATION_PREFIX: &str = "\nObservation:\n";

/// States of the agent loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Thinking,
    Acting,
    Observing,
    Finishing,
    Aborted,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Thinking => "thinking",
            LoopState::Acting => "acting",
            LoopState::Observing => "observing",
            LoopState::Finishing => "finishing",
            LoopState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// How a task invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The model chose `FINISH` and the final reply was written
    Completed,

    /// `max_steps` ran out first
    StepBudgetExhausted,
}

/// One reasoning step in the trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    /// 1-based step number
    pub index: usize,

    /// Model output exactly as streamed
    pub raw_response: String,

    /// The action parsed from it
    pub action: Action,

    /// Dispatch result; `None` for the `FINISH` step
    pub observation: Option<String>,
}

/// Auditable record of one task invocation
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task_id: String,
    pub task: String,
    pub reply: String,
    pub outcome: TaskOutcome,

    /// Number of reasoning steps issued, the `FINISH` step included
    pub steps: usize,

    pub trace: Vec<TraceStep>,
    pub duration_ms: u64,
}

/// Agent Core that runs the agent loop
pub struct AgentCore {
    /// Model used for the final reply (steps go through the executor)
    provider: Arc<dyn LLMProvider>,

    executor: StepExecutor,
    dispatcher: ActionDispatcher,
    final_prompt: PromptTemplate,

    /// Conversation of the current task; reset at the start of each task
    memory: BoundedMemory,

    max_steps: usize,
    llm_timeout: Duration,
    sink: Arc<dyn TokenSink>,
}

impl AgentCore {
    /// Create an agent from an already built provider and tool registry
    ///
    /// Prompt templates are read from `config.task_prompt` /
    /// `config.final_prompt` when set, otherwise the built-in defaults are
    /// used.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Result<Self, EngineError> {
        let task_prompt =
            PromptTemplate::load_or(config.task_prompt.as_deref(), DEFAULT_TASK_PROMPT)?;
        let final_prompt =
            PromptTemplate::load_or(config.final_prompt.as_deref(), DEFAULT_FINAL_PROMPT)?;
        task_prompt.check_variables(&[
            "task_description",
            "memory",
            "tools",
            "format_instructions",
        ])?;
        final_prompt.check_variables(&["task_description", "memory"])?;
        let llm_timeout = Duration::from_secs(config.llm_timeout_secs);

        let executor = StepExecutor::new(Arc::clone(&provider), task_prompt, &tools, llm_timeout);
        let dispatcher =
            ActionDispatcher::new(tools, Duration::from_secs(config.tool_timeout_secs));

        let sink: Arc<dyn TokenSink> = if config.stream_tokens {
            Arc::new(StdoutSink)
        } else {
            Arc::new(NoopSink)
        };

        Ok(Self {
            provider,
            executor,
            dispatcher,
            final_prompt,
            memory: BoundedMemory::with_limit(config.memory_token_limit),
            max_steps: config.max_steps.max(1),
            llm_timeout,
            sink,
        })
    }

    /// Build the provider and tool registry described by `config`, then the agent
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let provider = llm::create_provider(&config.llm)?;
        let tools = ToolRegistry::from_config(&config.tools)?;
        Self::new(provider, Arc::new(tools), &config.agent)
    }

    /// Replace the token sink
    pub fn with_sink(mut self, sink: Arc<dyn TokenSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Memory of the most recent task
    pub fn memory(&self) -> &BoundedMemory {
        &self.memory
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run a task and return only the reply
    pub async fn run(&mut self, task: &str) -> Result<String, EngineError> {
        self.execute(task).await.map(|report| report.reply)
    }

    /// Run a task and return the full report
    ///
    /// Any error from a reasoning step (transport failure, timeout,
    /// malformed action) ends the invocation; memory keeps no entry for
    /// the failed step.
    pub async fn execute(&mut self, task: &str) -> Result<TaskReport, EngineError> {
        let task_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();

        info!("Starting task {}: {}", task_id, task);

        self.memory.reset();
        let mut trace: Vec<TraceStep> = Vec::new();

        match self.run_loop(&task_id, task, &mut trace).await {
            Ok((reply, outcome)) => {
                let duration_ms = start_time.elapsed().as_millis() as u64;
                info!(
                    "Task {} ended ({:?}) in {}ms after {} steps",
                    task_id,
                    outcome,
                    duration_ms,
                    trace.len()
                );

                Ok(TaskReport {
                    task_id,
                    task: task.to_string(),
                    reply,
                    outcome,
                    steps: trace.len(),
                    trace,
                    duration_ms,
                })
            }
            Err(e) => {
                error!("Task {} failed: {}", task_id, e);
                Err(e)
            }
        }
    }

    async fn run_loop(
        &mut self,
        task_id: &str,
        task: &str,
        trace: &mut Vec<TraceStep>,
    ) -> Result<(String, TaskOutcome), EngineError> {
        let mut step_count = 0;

        loop {
            enter(task_id, LoopState::Thinking);
            info!("Thinking step {}/{}", step_count + 1, self.max_steps);

            let StepOutcome {
                action,
                raw_response,
            } = self
                .executor
                .step(task, &self.memory, self.sink.as_ref())
                .await?;

            if action.is_finish() {
                enter(task_id, LoopState::Finishing);
                trace.push(TraceStep {
                    index: trace.len() + 1,
                    raw_response,
                    action,
                    observation: None,
                });
                let reply = self.final_reply(task).await?;
                return Ok((reply, TaskOutcome::Completed));
            }

            enter(task_id, LoopState::Acting);
            let observation = self.dispatcher.execute(Some(&action)).await;

            enter(task_id, LoopState::Observing);
            debug!("Observation: {}", observation);
            self.memory
                .save(raw_response.clone(), format!("{}{}", OBSERVATION_PREFIX, observation));

            trace.push(TraceStep {
                index: trace.len() + 1,
                raw_response,
                action,
                observation: Some(observation),
            });

            step_count += 1;
            if step_count >= self.max_steps {
                enter(task_id, LoopState::Aborted);
                warn!(
                    "Task {} exhausted its step budget ({})",
                    task_id, self.max_steps
                );
                return Ok((TASK_NOT_COMPLETED.to_string(), TaskOutcome::StepBudgetExhausted));
            }
        }
    }

    /// One non-streamed call with the final prompt; not counted as a step
    async fn final_reply(&self, task: &str) -> Result<String, EngineError> {
        let transcript = self.memory.transcript();
        let prompt = self
            .final_prompt
            .render(&[("task_description", task), ("memory", &transcript)])?;

        let reply = match timeout(
            self.llm_timeout,
            self.provider.complete(&[Message::user(prompt)]),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                error!("LLM call failed: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                error!("LLM call timed out after {}s", self.llm_timeout.as_secs());
                return Err(EngineError::LLMTimeout);
            }
        };

        info!("Final reply:\n{}", reply);
        Ok(reply)
    }
}

fn enter(task_id: &str, state: LoopState) {
    debug!("Task {} -> {}", task_id, state);
}
