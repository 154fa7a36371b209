//! Meeting data model.
//!
//! The context threaded through the pipeline, the action items it carries,
//! the record persisted once a meeting completes, and live pipeline status.

pub mod action_item;
pub mod context;
pub mod record;
pub mod status;

pub use action_item::{ActionItem, Priority, DUE_DATE_TBD, UNASSIGNED};
pub use context::{
    Evaluation, MeetingContext, Metadata, RawResponse, RefinementOutcome, StageFallback,
    DEFAULT_QUALITY_SCORE, PLACEHOLDER_SUMMARY,
};
pub use record::MeetingRecord;
pub use status::{PipelinePhase, PipelineState, PipelineStatusHandle};
