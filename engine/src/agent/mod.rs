//! Agent Loop
//!
//! A bounded-step reasoning agent: the model proposes one structured action
//! per step, the action is dispatched to a tool, and the observation is fed
//! back through a token-capped memory until the model chooses `FINISH` or
//! the step budget runs out.

pub mod action;
pub mod core;
pub mod dispatcher;
pub mod prompt;
pub mod sink;
pub mod step;
pub mod working_memory;

pub use self::core::{
    AgentCore, LoopState, TaskOutcome, TaskReport, TraceStep, OBSERVATION_PREFIX,
    TASK_NOT_COMPLETED,
};
pub use action::{format_instructions, parse_action, Action, FINISH_ACTION};
pub use dispatcher::{ActionDispatcher, NO_VALID_ACTION};
pub use prompt::{PromptTemplate, DEFAULT_FINAL_PROMPT, DEFAULT_TASK_PROMPT};
pub use sink::{NoopSink, StdoutSink, TokenSink};
pub use step::{StepExecutor, StepOutcome};
pub use working_memory::{BoundedMemory, Exchange, MIN_TOKEN_LIMIT};
