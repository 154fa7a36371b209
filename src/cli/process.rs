//! CLI handler that runs transcripts through the pipeline and prints results.

use crate::cli::ProcessCliArgs;
use crate::config::Config;
use crate::meeting::{MeetingContext, Metadata};
use crate::memory::MemoryReader;
use crate::orchestrator::Orchestrator;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

const TOP_OWNER_LIMIT: usize = 5;

pub async fn handle_process_command(args: ProcessCliArgs) -> Result<()> {
    let config = Config::load()?;
    let orchestrator = Orchestrator::from_config(&config)?;

    // Read everything up front so a bad path fails before any generation call.
    let transcripts = args
        .files
        .iter()
        .map(|path| -> Result<(PathBuf, String)> { Ok((path.clone(), load_transcript(path)?)) })
        .collect::<Result<Vec<_>>>()?;

    let mut results = Vec::with_capacity(transcripts.len());
    for (path, transcript) in transcripts {
        let metadata = meeting_metadata(&path, args.title.as_deref());
        info!("Processing {}", path.display());
        let ctx = orchestrator.process(transcript, metadata).await;
        if !args.json {
            print_meeting(&ctx);
        }
        results.push(ctx);
    }

    let report = CrossMeetingReport::collect(&orchestrator.memory()).await;
    if args.json {
        let output = json!({ "meetings": results, "report": report });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Read a transcript file, rejecting missing or blank input.
pub fn load_transcript(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(anyhow!("Transcript file not found: {}", path.display()));
    }
    let transcript = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    if transcript.trim().is_empty() {
        return Err(anyhow!("Transcript file is empty: {}", path.display()));
    }
    Ok(transcript)
}

/// Title comes from `--title`, else the file stem. The source path is kept too.
pub fn meeting_metadata(path: &Path, title: Option<&str>) -> Metadata {
    let mut metadata = Metadata::new();
    let title = title
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()));
    if let Some(title) = title {
        metadata.insert("title".to_string(), json!(title));
    }
    metadata.insert("source".to_string(), json!(path.display().to_string()));
    metadata
}

#[derive(Debug, Serialize)]
pub struct CrossMeetingReport {
    pub meetings: usize,
    pub total_actions: usize,
    pub top_owners: Vec<(String, usize)>,
}

impl CrossMeetingReport {
    pub async fn collect(memory: &MemoryReader) -> Self {
        Self {
            meetings: memory.len().await,
            total_actions: memory.total_actions().await,
            top_owners: memory
                .compute_owner_stats()
                .await
                .top_owners(TOP_OWNER_LIMIT),
        }
    }
}

fn print_list(heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{heading}:");
    for item in items {
        println!("  - {item}");
    }
}

fn print_meeting(ctx: &MeetingContext) {
    let title = ctx.title().unwrap_or("Untitled meeting");
    println!();
    println!("{title}");
    println!("{}", "=".repeat(title.chars().count()));
    println!();
    println!("{}", ctx.summary);
    println!();

    print_list("Topics", &ctx.topics);
    print_list("Decisions", &ctx.decisions);

    if ctx.actions.is_empty() {
        println!("No action items.");
    } else {
        println!("Action items:");
        for action in &ctx.actions {
            println!(
                "  [{}] {} ({}, due {})",
                action.priority,
                action.description,
                action.effective_owner(),
                action.due_date
            );
        }
    }

    print_list("Risks", &ctx.global_risks);
    print_list("Recurring blockers", &ctx.recurring_blockers);
    print_list("Overloaded", &ctx.overloaded_people);
    print_list("Themes", &ctx.themes);

    println!();
    println!("Follow-up:");
    println!("{}", ctx.followup_message);
    println!();

    if let Some(evaluation) = &ctx.evaluation {
        println!(
            "Quality {} | {} action(s), {}% owned, {} high priority | {:.1}s",
            ctx.quality_score,
            evaluation.total_actions,
            evaluation.actions_with_owner_pct,
            evaluation.high_priority_actions,
            ctx.processing_time_sec.unwrap_or_default()
        );
    }
    for fallback in &ctx.fallbacks {
        println!("Note: {} used defaults ({:?})", fallback.stage, fallback.reason);
    }
}

fn print_report(report: &CrossMeetingReport) {
    println!();
    println!(
        "Across {} meeting(s): {} action item(s)",
        report.meetings, report.total_actions
    );
    for (owner, count) in &report.top_owners {
        println!("  {owner}: {count}");
    }
}
