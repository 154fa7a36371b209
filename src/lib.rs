pub mod cli;
pub mod config;
pub mod error;
pub mod global;
pub mod llm;
pub mod meeting;
pub mod memory;
pub mod normalizer;
pub mod orchestrator;
pub mod stages;
