use crate::error::ConfigError;
use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variables consulted for the generation API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["DEBRIEF_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub hook: HookConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai-api" or "ollama"
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on a single generation call. Expiry falls back to stage defaults.
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_refinement_passes: u32,
    /// Refinement stops early once the quality score reaches this value
    pub quality_threshold: u8,
    /// Action count at which an owner is flagged to trend detection
    pub overload_threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Shell command to run after a meeting is processed.
    /// Receives the follow-up message via stdin.
    /// Env vars: DEBRIEF_MEETING_ID, DEBRIEF_MEETING_TITLE, DEBRIEF_SUMMARY,
    /// DEBRIEF_ACTION_COUNT, DEBRIEF_QUALITY_SCORE
    pub post_command: String,
    /// Timeout in seconds for the post_command (default: 300)
    pub post_command_timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai-api".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_endpoint: None,
            temperature: 0.2,
            max_tokens: 1500,
            request_timeout_seconds: 120,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_refinement_passes: 2,
            quality_threshold: 85,
            overload_threshold: 3,
        }
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            post_command: String::new(),
            post_command_timeout_seconds: 300,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config = Self::from_toml(&content)?;
            info!("Loaded config from {:?}", config_path);
            config
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Fill the API key from the environment. A set variable wins over the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for name in API_KEY_ENV_VARS {
            if let Some(key) = lookup(name).filter(|k| !k.trim().is_empty()) {
                debug!("Using API key from {}", name);
                self.llm.api_key = Some(key);
                return;
            }
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.pipeline.max_refinement_passes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.max_refinement_passes",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pipeline.quality_threshold > 100 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.quality_threshold",
                reason: format!("{} is outside 0-100", self.pipeline.quality_threshold),
            });
        }
        if self.llm.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.request_timeout_seconds",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
