//! Delivery step that runs once a meeting is stored.
//!
//! The hook is where results leave the process: posting the follow-up to a
//! chat channel, filing notes in a wiki and so on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::meeting::MeetingContext;

/// Environment variables exported to the hook process.
pub mod hook_env {
    pub const MEETING_ID: &str = "DEBRIEF_MEETING_ID";
    pub const MEETING_TITLE: &str = "DEBRIEF_MEETING_TITLE";
    pub const SUMMARY: &str = "DEBRIEF_SUMMARY";
    pub const ACTION_COUNT: &str = "DEBRIEF_ACTION_COUNT";
    pub const QUALITY_SCORE: &str = "DEBRIEF_QUALITY_SCORE";
}

/// The slice of a processed meeting that hooks get to see.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingResult {
    pub meeting_id: Uuid,
    pub title: Option<String>,
    pub summary: String,
    pub followup_message: String,
    pub action_count: usize,
    pub quality_score: u8,
}

impl MeetingResult {
    pub fn from_context(meeting_id: Uuid, ctx: &MeetingContext) -> Self {
        Self {
            meeting_id,
            title: ctx.title().map(str::to_string),
            summary: ctx.summary.clone(),
            followup_message: ctx.followup_message.clone(),
            action_count: ctx.actions.len(),
            quality_score: ctx.quality_score,
        }
    }

    pub fn env_vars(&self) -> [(&'static str, String); 5] {
        [
            (hook_env::MEETING_ID, self.meeting_id.to_string()),
            (hook_env::MEETING_TITLE, self.title.clone().unwrap_or_default()),
            (hook_env::SUMMARY, self.summary.clone()),
            (hook_env::ACTION_COUNT, self.action_count.to_string()),
            (hook_env::QUALITY_SCORE, self.quality_score.to_string()),
        ]
    }
}

#[async_trait]
pub trait PostMeetingHook: Send + Sync {
    async fn execute(&self, result: &MeetingResult) -> Result<()>;
}

/// Runs `sh -c <command>` with the follow-up message on stdin and the
/// meeting fields in `DEBRIEF_*` variables.
///
/// Only a failure to spawn is an error. A non-zero exit or an expired
/// timeout is logged, and the child is killed when the timeout fires.
pub struct ShellCommandHook {
    command: String,
    timeout: Duration,
}

impl ShellCommandHook {
    pub fn new(command: String, timeout_seconds: u64) -> Self {
        Self {
            command,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    fn build(&self, result: &MeetingResult) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .envs(result.env_vars())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

fn report(output: &Output) {
    if !output.status.success() {
        warn!(
            "Hook command failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!("Hook command output: {}", stdout.trim());
    }
    info!("Hook command finished");
}

#[async_trait]
impl PostMeetingHook for ShellCommandHook {
    async fn execute(&self, result: &MeetingResult) -> Result<()> {
        info!("Delivering meeting {} via `{}`", result.meeting_id, self.command);

        let mut child = self
            .build(result)
            .spawn()
            .with_context(|| format!("Failed to start hook command `{}`", self.command))?;

        // Feeding stdin counts against the timeout: a child that never reads
        // would otherwise block on a full pipe.
        let stdin = child.stdin.take();
        let message = result.followup_message.as_bytes();
        let run = async move {
            if let Some(mut stdin) = stdin {
                // The child may exit without reading stdin; a broken pipe is not a failure.
                if let Err(e) = stdin.write_all(message).await {
                    debug!("Hook command did not take stdin: {}", e);
                }
            }
            child.wait_with_output().await
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => report(&output),
            Ok(Err(e)) => warn!("Could not collect hook command result: {}", e),
            Err(_) => warn!("Hook command exceeded {:?}, killing it", self.timeout),
        }

        Ok(())
    }
}
