pub mod ollama;
pub mod openai_api;

pub use ollama::OllamaProvider;
pub use openai_api::OpenAIProvider;
