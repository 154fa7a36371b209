use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::LlmError;
use crate::llm::{ChatMessage, LlmClient};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434/api/chat";

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaResponseMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

/// Local Ollama server. No credentials required.
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaProvider {
    pub fn new(endpoint: Option<String>, model: String) -> Self {
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        info!("Initialized Ollama provider with endpoint: {}", endpoint);

        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }
}

#[async_trait]
impl LlmClient for OllamaProvider {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let mut wire = vec![OllamaMessage {
            role: "system",
            content: system_prompt,
        }];
        wire.extend(messages.iter().map(|m| OllamaMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        let body = OllamaRequest {
            model: &self.model,
            messages: wire,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        debug!("Sending chat request to Ollama (model {})", self.model);

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!(
                "Ollama request failed with status {}: {}",
                status, response_text
            );
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let parsed: OllamaResponse = serde_json::from_str(&response_text)?;
        if let Some(message) = parsed.error {
            return Err(LlmError::Api { message });
        }

        parsed
            .message
            .map(|m| m.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let provider = OllamaProvider::new(None, "llama3".to_string());
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_response_with_error() {
        let parsed: OllamaResponse =
            serde_json::from_str(r#"{"error":"model not found"}"#).unwrap();
        assert!(parsed.message.is_none());
        assert_eq!(parsed.error.as_deref(), Some("model not found"));
    }

    #[test]
    fn test_request_disables_streaming() {
        let body = OllamaRequest {
            model: "llama3",
            messages: Vec::new(),
            stream: false,
            options: OllamaOptions { temperature: 0.1 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
    }
}
