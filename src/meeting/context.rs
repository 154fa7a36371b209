//! Per-meeting context threaded through every pipeline stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::action_item::ActionItem;
use crate::stages::FallbackReason;

/// Caller-supplied meeting metadata (title, date, attendees, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Score used when the refinement stage produced nothing usable.
pub const DEFAULT_QUALITY_SCORE: u8 = 50;

/// Summary used when transcript analysis produced no text at all.
pub const PLACEHOLDER_SUMMARY: &str = "No summary could be generated for this meeting.";

/// Local metrics computed over the final action list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub total_actions: usize,
    pub actions_with_owner: usize,
    pub actions_with_owner_pct: f64,
    pub high_priority_actions: usize,
}

/// How the refinement loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefinementOutcome {
    Converged { passes: u32 },
    Exhausted { passes: u32 },
}

impl RefinementOutcome {
    pub fn passes(&self) -> u32 {
        match self {
            Self::Converged { passes } | Self::Exhausted { passes } => *passes,
        }
    }
}

/// Raw generation output kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub stage: String,
    pub text: String,
}

/// A stage that fell back to its defaults, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFallback {
    pub stage: String,
    pub reason: FallbackReason,
}

/// The unit of work for one meeting.
///
/// Fields are filled in stage by stage and never removed. Every list is
/// always present; a stage with nothing usable leaves it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingContext {
    pub transcript: String,
    pub metadata: Metadata,

    pub topics: Vec<String>,
    pub decisions: Vec<String>,
    pub summary: String,

    pub actions: Vec<ActionItem>,
    pub global_risks: Vec<String>,
    pub quality_score: u8,
    pub refinement: Option<RefinementOutcome>,

    pub recurring_blockers: Vec<String>,
    pub overloaded_people: Vec<String>,
    pub themes: Vec<String>,

    pub followup_message: String,

    pub evaluation: Option<Evaluation>,
    pub processing_time_sec: Option<f64>,

    pub raw_responses: Vec<RawResponse>,
    pub fallbacks: Vec<StageFallback>,
}

impl MeetingContext {
    pub fn new(transcript: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            transcript: transcript.into(),
            metadata,
            topics: Vec::new(),
            decisions: Vec::new(),
            summary: String::new(),
            actions: Vec::new(),
            global_risks: Vec::new(),
            quality_score: DEFAULT_QUALITY_SCORE,
            refinement: None,
            recurring_blockers: Vec::new(),
            overloaded_people: Vec::new(),
            themes: Vec::new(),
            followup_message: String::new(),
            evaluation: None,
            processing_time_sec: None,
            raw_responses: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    /// Meeting title from metadata, if the caller supplied one.
    pub fn title(&self) -> Option<&str> {
        self.metadata
            .get("title")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn record_raw(&mut self, stage: &str, text: impl Into<String>) {
        self.raw_responses.push(RawResponse {
            stage: stage.to_string(),
            text: text.into(),
        });
    }

    pub fn record_fallback(&mut self, stage: &str, reason: FallbackReason) {
        self.fallbacks.push(StageFallback {
            stage: stage.to_string(),
            reason,
        });
    }

    /// Latest raw response recorded for a stage.
    pub fn raw_response(&self, stage: &str) -> Option<&str> {
        self.raw_responses
            .iter()
            .rev()
            .find(|r| r.stage == stage)
            .map(|r| r.text.as_str())
    }

    pub fn fell_back(&self, stage: &str) -> bool {
        self.fallbacks.iter().any(|f| f.stage == stage)
    }
}
