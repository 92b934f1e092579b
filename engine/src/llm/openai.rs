use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use super::{
    byte_lines, status_error, transport_error, LLMError, LLMProvider, Message, Result, TokenStream,
};

/// Provider for OpenAI and OpenAI-compatible chat completion endpoints
pub struct OpenAIProvider {
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            temperature: 0.0,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn payload(&self, messages: &[Message], stream: bool) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        json!({
            "model": self.model,
            "messages": api_messages,
            "temperature": self.temperature,
            "stream": stream,
        })
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.payload(messages, stream))
            .send()
            .await
            .map_err(|e| transport_error("OpenAI", &self.base_url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error("OpenAI", status, text));
        }

        Ok(response)
    }
}

/// Outcome of decoding one server-sent-event line
#[derive(Debug, PartialEq)]
enum SseEvent {
    Fragment(String),
    Skip,
    Done,
}

fn decode_sse_line(line: &str) -> Result<SseEvent> {
    let Some(data) = line.strip_prefix("data:") else {
        // comments, `event:` fields and keep-alive blank lines
        return Ok(SseEvent::Skip);
    };

    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }
    if data.is_empty() {
        return Ok(SseEvent::Skip);
    }

    let chunk: Value = serde_json::from_str(data)
        .map_err(|e| LLMError::ParseError(format!("Invalid OpenAI stream chunk: {}", e)))?;

    if let Some(message) = chunk["error"]["message"].as_str() {
        return Err(LLMError::ProviderUnavailable(message.to_string()));
    }

    match chunk["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => Ok(SseEvent::Fragment(content.to_string())),
        _ => Ok(SseEvent::Skip),
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let response = self.send(messages, false).await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| LLMError::ParseError("Missing content in OpenAI response".to_string()))
    }

    async fn stream(&self, messages: &[Message]) -> Result<TokenStream> {
        let response = self.send(messages, true).await?;

        let fragments = byte_lines(response.bytes_stream())
            .map(|line| line.and_then(|line| decode_sse_line(&line)))
            .take_while(|event| futures::future::ready(!matches!(event, Ok(SseEvent::Done))))
            .filter_map(|event| async move {
                match event {
                    Ok(SseEvent::Fragment(text)) => Some(Ok(text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(fragments.boxed())
    }
}
