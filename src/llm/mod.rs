//! Generation-service boundary.
//!
//! Every pipeline stage talks to the service through [`LlmClient`]; the
//! concrete provider is chosen from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};

pub mod providers;
pub mod testing;

pub use providers::{OllamaProvider, OpenAIProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A text-generation service. The returned text is untrusted.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn chat(&self, system_prompt: &str, messages: &[ChatMessage])
        -> Result<String, LlmError>;
}

/// Build the configured provider. Fails fast on missing credentials.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, ConfigError> {
    let timeout = Duration::from_secs(config.request_timeout_seconds);

    let client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "openai-api" => {
            let api_key = config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingApiKey {
                    provider: config.provider.clone(),
                })?;

            Arc::new(
                OpenAIProvider::new(api_key, config.api_endpoint.clone(), config.model.clone())
                    .with_sampling(config.temperature, config.max_tokens)
                    .with_timeout(timeout),
            )
        }
        "ollama" => Arc::new(
            OllamaProvider::new(config.api_endpoint.clone(), config.model.clone())
                .with_temperature(config.temperature)
                .with_timeout(timeout),
        ),
        other => {
            return Err(ConfigError::UnknownProvider {
                name: other.to_string(),
            })
        }
    };

    info!("Using {} for generation (model: {})", client.name(), config.model);
    Ok(client)
}
