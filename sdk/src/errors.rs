//! Error types and handling
//!
//! This module provides the error types used throughout the Wayfarer engine.
//! All errors implement the `AgentErrorExt` trait which provides user-friendly
//! hints.
//!
//! Tool-level failures never surface as `EngineError` from the agent loop:
//! the dispatcher renders them into observation text.

use thiserror::Error;

/// Trait for Wayfarer error extensions
///
/// This trait provides additional context for errors in the form of
/// user-friendly hints. All engine errors implement this trait.
pub trait AgentErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or raw model output.
    fn user_hint(&self) -> &str;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid or missing configuration, bad prompt templates
/// - **LLM Provider**: transport failures and timeouts
/// - **Action parsing**: model output that is not a valid action
/// - **Tools**: unknown tools, duplicate registrations
///
/// # Examples
///
/// ```
/// use sdk::errors::{AgentErrorExt, EngineError};
///
/// let error = EngineError::MalformedAction {
///     reason: "missing field `name`".to_string(),
///     raw: "{}".to_string(),
/// };
/// println!("Hint: {}", error.user_hint());
/// assert_eq!(error.to_string(), "Malformed action: missing field `name`");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt template error: {0}")]
    Template(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("LLM call timed out")]
    LLMTimeout,

    // Agent loop errors
    #[error("Malformed action: {reason}")]
    MalformedAction { reason: String, raw: String },

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),
}

impl AgentErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Template(_) => "Check the prompt template files referenced in config.toml",

            // LLM provider errors
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::LLMTimeout => "LLM provider took too long to respond. Try again",

            // Agent loop errors
            Self::MalformedAction { .. } => {
                "The model replied with something that is not a valid action. Try again"
            }

            // Tool errors
            Self::ToolNotFound(_) => "The requested tool is not available",
            Self::DuplicateTool(_) => "Two tools share the same name. Rename one of them",
        }
    }
}
