//! Persisted summary of one completed meeting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action_item::ActionItem;
use super::context::{MeetingContext, Metadata, DEFAULT_QUALITY_SCORE};

/// Created once per completed run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub summary: String,
    pub actions: Vec<ActionItem>,
    pub metadata: Metadata,
    pub quality_score: u8,
}

impl MeetingRecord {
    pub fn new(summary: String, actions: Vec<ActionItem>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            summary,
            actions,
            metadata,
            quality_score: DEFAULT_QUALITY_SCORE,
        }
    }

    pub fn from_context(ctx: &MeetingContext) -> Self {
        Self {
            quality_score: ctx.quality_score,
            ..Self::new(ctx.summary.clone(), ctx.actions.clone(), ctx.metadata.clone())
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(|v| v.as_str())
    }
}
