//! CLI handler for inspecting the configuration.

use crate::cli::{ConfigCliArgs, ConfigCommand};
use crate::config::Config;
use anyhow::Result;

pub fn handle_config_command(args: ConfigCliArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Show => handle_show(),
        ConfigCommand::Path => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
    }
}

fn handle_show() -> Result<()> {
    let config = Config::load()?;
    let llm = &config.llm;

    println!();
    println!("Debrief Configuration");
    println!("=====================");
    println!();
    println!("Provider:     {}", llm.provider);
    println!("Model:        {}", llm.model);
    println!("Key:          {}", mask_secret(&llm.api_key));
    println!("Endpoint:     {}", display_value(&llm.api_endpoint));
    println!("Temperature:  {}", llm.temperature);
    println!("Max tokens:   {}", llm.max_tokens);
    println!("Timeout:      {}s", llm.request_timeout_seconds);
    println!();
    println!("Pipeline:");
    println!("  Refinement passes:  {}", config.pipeline.max_refinement_passes);
    println!("  Quality threshold:  {}", config.pipeline.quality_threshold);
    println!("  Overload threshold: {}", config.pipeline.overload_threshold);
    println!();
    println!(
        "Post-meeting hook: {}",
        if config.hook.post_command.is_empty() {
            "<not set>"
        } else {
            config.hook.post_command.as_str()
        }
    );
    println!();
    println!("Config file:  {}", crate::global::config_file()?.display());

    if let Err(e) = config.validate() {
        println!();
        println!("Warning: {}", e);
    }

    Ok(())
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(secret) if secret.chars().count() > 8 => {
            let prefix: String = secret.chars().take(4).collect();
            let suffix: String = secret.chars().skip(secret.chars().count() - 2).collect();
            format!("{prefix}****{suffix}")
        }
        Some(secret) if !secret.is_empty() => "*".repeat(secret.chars().count()),
        _ => "<not set>".to_string(),
    }
}
