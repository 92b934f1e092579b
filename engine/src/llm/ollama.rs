//! Ollama LLM Provider
//!
//! This module implements the LLMProvider trait for Ollama, a local LLM provider.
//! Ollama runs models locally on the user's machine, typically at http://localhost:11434.
//!
//! Key features:
//! - Local execution (no API keys required)
//! - Streaming via newline-delimited JSON chunks on `/api/chat`
//! - Error mapping to LLMError

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    byte_lines, status_error, transport_error, LLMError, LLMProvider, Message, MessageRole,
    Result, TokenStream,
};

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// Model name to use (e.g., "llama3.1:8b")
    model: String,

    /// Sampling temperature
    temperature: f64,

    /// HTTP client for API requests
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Arguments
    /// * `base_url` - Base URL for Ollama API (e.g., "http://localhost:11434")
    /// * `model` - Model name to use (e.g., "llama3.1:8b")
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.0,
            client: Client::new(),
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Convert our Message format to Ollama's format
    fn convert_messages(&self, messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|msg| OllamaMessage {
                role: match msg.role {
                    MessageRole::User => "user".to_string(),
                    MessageRole::Assistant => "assistant".to_string(),
                    MessageRole::System => "system".to_string(),
                },
                content: msg.content.clone(),
            })
            .collect()
    }

    /// POST the chat request and return the raw response
    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response> {
        let ollama_messages = self.convert_messages(messages);

        tracing::debug!(
            "Ollama request: model={}, messages={}, total_chars={}, stream={}",
            self.model,
            ollama_messages.len(),
            ollama_messages
                .iter()
                .map(|m| m.content.len())
                .sum::<usize>(),
            stream
        );

        let request = OllamaRequest {
            model: self.model.clone(),
            messages: ollama_messages,
            stream,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", &self.base_url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error("Ollama", status, error_text));
        }

        Ok(response)
    }
}

/// Decode one NDJSON line into a text fragment (if it carries any)
fn decode_chunk(line: &str) -> Option<Result<String>> {
    if line.trim().is_empty() {
        return None;
    }

    let chunk: OllamaStreamChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(LLMError::ParseError(format!(
                "Failed to parse Ollama stream chunk: {}",
                e
            ))))
        }
    };

    if let Some(error) = chunk.error {
        return Some(Err(LLMError::ProviderUnavailable(error)));
    }

    chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty())
        .map(Ok)
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let start = std::time::Instant::now();
        let response = self.send(messages, false).await?;

        tracing::info!(
            "Ollama response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(ollama_response.message.content)
    }

    async fn stream(&self, messages: &[Message]) -> Result<TokenStream> {
        let response = self.send(messages, true).await?;

        let fragments = byte_lines(response.bytes_stream()).filter_map(|line| async move {
            match line {
                Ok(line) => decode_chunk(&line),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(fragments.boxed())
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Ollama API request format
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

/// Sampling options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama API response format (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[allow(dead_code)]
    done: bool,
}

/// One line of a streaming response
#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
}
