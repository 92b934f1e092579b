//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for talking to a language model
//! (Ollama or any OpenAI-compatible endpoint). The `LLMProvider` trait covers
//! both a single blocking completion and an incremental token stream; the
//! agent streams reasoning steps and uses a plain completion for the final
//! synthesized reply.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use sdk::errors::EngineError;

use crate::config::LLMConfig;

pub mod ollama;
pub mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Ordered sequence of text fragments produced by a streaming completion
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Timeout => EngineError::LLMTimeout,
            other => EngineError::LLMProvider(other.to_string()),
        }
    }
}

/// Message in a conversation sent to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Generate a complete response in one round trip
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Generate a response as an ordered stream of text fragments
    ///
    /// The default implementation yields the full completion as a single
    /// fragment, for providers without incremental output.
    async fn stream(&self, messages: &[Message]) -> Result<TokenStream> {
        let text = self.complete(messages).await?;
        Ok(stream::once(async move { Ok(text) }).boxed())
    }

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Create the provider selected by `config.provider`
pub fn create_provider(config: &LLMConfig) -> std::result::Result<Arc<dyn LLMProvider>, EngineError> {
    match config.provider.as_str() {
        "ollama" => {
            tracing::info!("Using Ollama (model: {})", config.ollama.model);
            Ok(Arc::new(
                OllamaProvider::new(config.ollama.base_url.clone(), config.ollama.model.clone())
                    .with_temperature(config.temperature),
            ))
        }
        "openai" => {
            let api_key = std::env::var(&config.openai.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    EngineError::Config(format!(
                        "{} is not set. Export your OpenAI API key first",
                        config.openai.api_key_env
                    ))
                })?;
            tracing::info!("Using OpenAI (model: {})", config.openai.model);
            Ok(Arc::new(
                OpenAIProvider::new(
                    config.openai.base_url.clone(),
                    config.openai.model.clone(),
                    api_key,
                )
                .with_temperature(config.temperature),
            ))
        }
        other => Err(EngineError::Config(format!(
            "Unknown LLM provider '{}'",
            other
        ))),
    }
}

struct LineState<S> {
    inner: Pin<Box<S>>,
    buf: Vec<u8>,
    done: bool,
}

/// Split a chunked byte stream into complete text lines.
///
/// Both Ollama (newline-delimited JSON) and OpenAI (server-sent events)
/// deliver one record per line, but chunk boundaries fall anywhere.
pub(crate) fn byte_lines<S, B, E>(inner: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = LineState {
        inner: Box::pin(inner),
        buf: Vec::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = st.buf.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line)
                    .trim_end_matches(|c: char| c == '\r' || c == '\n')
                    .to_string();
                return Some((Ok(text), st));
            }

            if st.done {
                if st.buf.is_empty() {
                    return None;
                }
                let rest = std::mem::take(&mut st.buf);
                let text = String::from_utf8_lossy(&rest).trim_end().to_string();
                return Some((Ok(text), st));
            }

            match st.inner.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    st.done = true;
                    st.buf.clear();
                    return Some((Err(LLMError::NetworkError(e.to_string())), st));
                }
                None => st.done = true,
            }
        }
    })
    .boxed()
}

/// Map a non-success HTTP status to an `LLMError`
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: String) -> LLMError {
    match status.as_u16() {
        401 | 403 => LLMError::AuthenticationFailed(body),
        429 => LLMError::RateLimitExceeded,
        _ => LLMError::ProviderUnavailable(format!("{} API error ({}): {}", provider, status, body)),
    }
}

/// Map a reqwest transport error to an `LLMError`
pub(crate) fn transport_error(provider: &str, base_url: &str, e: reqwest::Error) -> LLMError {
    if e.is_timeout() {
        LLMError::Timeout
    } else if e.is_connect() {
        LLMError::ProviderUnavailable(format!(
            "Cannot connect to {} at {}",
            provider, base_url
        ))
    } else {
        LLMError::NetworkError(e.to_string())
    }
}
