//! Pipeline stages.
//!
//! Each stage reads a few fields of the [`MeetingContext`], writes its own
//! output fields and hands the context back. Stages never fail: a service
//! error, timeout or unusable response becomes a [`FallbackReason`] recorded
//! on the context, and the stage writes its documented defaults instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::llm::{ChatMessage, LlmClient};
use crate::meeting::MeetingContext;

pub mod action_extraction;
pub mod evaluation;
pub mod followup;
pub mod parse;
pub mod refinement;
pub mod transcript_analysis;
pub mod trend_detection;

pub use action_extraction::ActionExtraction;
pub use evaluation::{evaluate, ActionEvaluation};
pub use followup::FollowupComposition;
pub use refinement::PriorityRiskRefinement;
pub use transcript_analysis::TranscriptAnalysis;
pub use trend_detection::TrendDetection;

/// A single pipeline step.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: MeetingContext) -> MeetingContext;
}

/// Why a stage used its defaults instead of generated output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    ServiceError { message: String },
    Timeout { millis: u64 },
    Unparsable { error: String },
    WrongShape { expected: String },
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceError { message } => write!(f, "service error: {}", message),
            Self::Timeout { millis } => write!(f, "timed out after {}ms", millis),
            Self::Unparsable { error } => write!(f, "unparsable response: {}", error),
            Self::WrongShape { expected } => write!(f, "expected {}", expected),
        }
    }
}

/// Result of interpreting a generation response.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Parsed(T),
    Fallback(FallbackReason),
}

impl<T> StageOutcome<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageOutcome<U> {
        match self {
            Self::Parsed(value) => StageOutcome::Parsed(f(value)),
            Self::Fallback(reason) => StageOutcome::Fallback(reason),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> StageOutcome<U>) -> StageOutcome<U> {
        match self {
            Self::Parsed(value) => f(value),
            Self::Fallback(reason) => StageOutcome::Fallback(reason),
        }
    }
}

/// Shared access to the generation service with a per-call time limit.
#[derive(Clone)]
pub struct Generator {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl Generator {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One system prompt, one user turn. Errors and timeouts come back as a
    /// fallback reason so the caller can apply its defaults.
    pub async fn ask(&self, system_prompt: &str, user_prompt: String) -> Result<String, FallbackReason> {
        let messages = [ChatMessage::user(user_prompt)];

        match tokio::time::timeout(self.timeout, self.client.chat(system_prompt, &messages)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(FallbackReason::ServiceError {
                message: e.to_string(),
            }),
            Err(_) => Err(FallbackReason::Timeout {
                millis: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// Log and record a fallback on the context.
pub(crate) fn absorb(ctx: &mut MeetingContext, stage: &str, reason: FallbackReason) {
    warn!("Stage {} fell back to defaults: {}", stage, reason);
    ctx.record_fallback(stage, reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;

    #[tokio::test]
    async fn test_ask_returns_text() {
        let llm = Arc::new(ScriptedLlm::with_replies(["hello"]));
        let generator = Generator::new(llm.clone(), Duration::from_secs(5));

        assert_eq!(generator.ask("sys", "user".into()).await.unwrap(), "hello");
        let call = &llm.calls()[0];
        assert_eq!(call.system_prompt, "sys");
        assert_eq!(call.messages, vec![ChatMessage::user("user")]);
    }

    #[tokio::test]
    async fn test_ask_maps_service_error() {
        let llm = Arc::new(ScriptedLlm::new().then_fail("quota exceeded"));
        let generator = Generator::new(llm, Duration::from_secs(5));

        match generator.ask("sys", "user".into()).await {
            Err(FallbackReason::ServiceError { message }) => {
                assert!(message.contains("quota exceeded"))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ask_times_out() {
        let llm = Arc::new(ScriptedLlm::new().then_hang());
        let generator = Generator::new(llm, Duration::from_millis(50));

        assert_eq!(
            generator.ask("sys", "user".into()).await,
            Err(FallbackReason::Timeout { millis: 50 })
        );
    }

    #[test]
    fn test_fallback_reason_display() {
        let reason = FallbackReason::WrongShape {
            expected: "a JSON array".to_string(),
        };
        assert_eq!(reason.to_string(), "expected a JSON array");
        assert_eq!(
            FallbackReason::Timeout { millis: 3000 }.to_string(),
            "timed out after 3000ms"
        );
    }

    #[test]
    fn test_stage_outcome_combinators() {
        let parsed: StageOutcome<i32> = StageOutcome::Parsed(2);
        assert_eq!(parsed.clone().map(|v| v * 2), StageOutcome::Parsed(4));
        assert!(parsed.is_parsed());

        let fallback: StageOutcome<i32> = StageOutcome::Fallback(FallbackReason::Timeout { millis: 1 });
        assert!(!fallback.clone().and_then(|v| StageOutcome::Parsed(v + 1)).is_parsed());
    }
}
