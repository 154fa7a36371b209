//! Error types shared across the crate.
//!
//! Only configuration errors are fatal. Generation-service errors are
//! absorbed by the stages and turned into documented fallbacks.

/// Errors raised while talking to the generation service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request to generation service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation service error: {message}")]
    Api { message: String },
    #[error("generation service returned no content")]
    EmptyResponse,
    #[error("failed to decode generation response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised while building the pipeline from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("api_key is required for the {provider} provider (set [llm].api_key or DEBRIEF_API_KEY)")]
    MissingApiKey { provider: String },
    #[error("unknown generation provider '{name}'. Supported providers: openai-api, ollama")]
    UnknownProvider { name: String },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
