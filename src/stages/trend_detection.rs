use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::parse::{parse_object, string_list};
use super::{absorb, Generator, Stage, StageOutcome};
use crate::meeting::{ActionItem, MeetingContext, MeetingRecord};
use crate::memory::{MemoryReader, OwnerStats};

pub const STAGE_NAME: &str = "trend_detection";

const SYSTEM_PROMPT: &str = "You look for patterns across a team's meetings. Given the history of \
previous meetings, per-owner action counts and the current meeting, reply with JSON only: \
{\"recurring_blockers\": [string], \"overloaded_people\": [string], \"themes\": [string]}. \
Recurring blockers are issues that came up in more than one meeting. Overloaded people \
carry a clearly larger share of open actions than others.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trends {
    pub recurring_blockers: Vec<String>,
    pub overloaded_people: Vec<String>,
    pub themes: Vec<String>,
}

#[derive(Serialize)]
struct PastMeeting<'a> {
    title: Option<&'a str>,
    recorded_at: String,
    summary: &'a str,
    actions: &'a [ActionItem],
}

#[derive(Serialize)]
struct TrendInput<'a> {
    history: Vec<PastMeeting<'a>>,
    owner_stats: &'a OwnerStats,
    owners_at_or_above_threshold: Vec<String>,
    current_summary: &'a str,
    current_actions: &'a [ActionItem],
}

/// Surfaces recurring issues by comparing the meeting against stored history.
///
/// Sees only meetings already in memory; the current one is appended later.
pub struct TrendDetection {
    generator: Generator,
    memory: MemoryReader,
    overload_threshold: usize,
}

impl TrendDetection {
    pub fn new(generator: Generator, memory: MemoryReader, overload_threshold: usize) -> Self {
        Self {
            generator,
            memory,
            overload_threshold,
        }
    }

    pub fn parse(raw: &str) -> StageOutcome<Trends> {
        parse_object(raw).map(|map| Trends {
            recurring_blockers: string_list(&map, &["recurring_blockers"]),
            overloaded_people: string_list(&map, &["overloaded_people"]),
            themes: string_list(&map, &["themes"]),
        })
    }

    fn build_prompt(
        &self,
        history: &[MeetingRecord],
        owner_stats: &OwnerStats,
        ctx: &MeetingContext,
    ) -> String {
        let input = TrendInput {
            history: history
                .iter()
                .map(|record| PastMeeting {
                    title: record.title(),
                    recorded_at: record.recorded_at.to_rfc3339(),
                    summary: &record.summary,
                    actions: &record.actions,
                })
                .collect(),
            owner_stats,
            owners_at_or_above_threshold: owner_stats.overloaded(self.overload_threshold),
            current_summary: &ctx.summary,
            current_actions: &ctx.actions,
        };

        serde_json::to_string_pretty(&input).unwrap_or_else(|_| "{}".to_string())
    }
}

#[async_trait]
impl Stage for TrendDetection {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn run(&self, mut ctx: MeetingContext) -> MeetingContext {
        let history = self.memory.get_all_meetings().await;
        let owner_stats = self.memory.compute_owner_stats().await;
        debug!(
            "Detecting trends against {} past meetings ({} owners)",
            history.len(),
            owner_stats.len()
        );

        let prompt = self.build_prompt(&history, &owner_stats, &ctx);
        let outcome = match self.generator.ask(SYSTEM_PROMPT, prompt).await {
            Ok(raw) => {
                ctx.record_raw(STAGE_NAME, raw.as_str());
                Self::parse(&raw)
            }
            Err(reason) => StageOutcome::Fallback(reason),
        };

        let trends = match outcome {
            StageOutcome::Parsed(trends) => trends,
            StageOutcome::Fallback(reason) => {
                absorb(&mut ctx, STAGE_NAME, reason);
                Trends::default()
            }
        };

        ctx.recurring_blockers = trends.recurring_blockers;
        ctx.overloaded_people = trends.overloaded_people;
        ctx.themes = trends.themes;
        ctx
    }
}
