use async_trait::async_trait;
use tracing::debug;

use super::parse::{parse_object, string_field, string_list};
use super::{absorb, FallbackReason, Generator, Stage, StageOutcome};
use crate::meeting::{MeetingContext, PLACEHOLDER_SUMMARY};

pub const STAGE_NAME: &str = "transcript_analysis";

const ANALYSIS_KEYS: [&str; 3] = ["topics", "decisions", "summary"];

const SYSTEM_PROMPT: &str = "You are a meeting analyst. Read the transcript and reply with JSON only, \
in the form {\"topics\": [string], \"decisions\": [string], \"summary\": string}. \
Topics are the subjects discussed, decisions are conclusions the group agreed on, \
and the summary is 3-5 plain sentences.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub topics: Vec<String>,
    pub decisions: Vec<String>,
    pub summary: String,
}

/// Breaks a transcript into topics, decisions and a summary.
pub struct TranscriptAnalysis {
    generator: Generator,
}

impl TranscriptAnalysis {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// An object carrying none of the analysis keys is the wrong shape, not
    /// an empty analysis.
    pub fn parse(raw: &str) -> StageOutcome<Analysis> {
        parse_object(raw).and_then(|map| {
            if !ANALYSIS_KEYS.iter().any(|key| map.contains_key(*key)) {
                return StageOutcome::Fallback(FallbackReason::WrongShape {
                    expected: "an object with topics, decisions or summary".to_string(),
                });
            }
            StageOutcome::Parsed(Analysis {
                topics: string_list(&map, &["topics"]),
                decisions: string_list(&map, &["decisions"]),
                summary: string_field(&map, "summary").unwrap_or_default(),
            })
        })
    }
}

fn non_empty_summary(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        PLACEHOLDER_SUMMARY.to_string()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Stage for TranscriptAnalysis {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn run(&self, mut ctx: MeetingContext) -> MeetingContext {
        debug!("Analyzing transcript ({} chars)", ctx.transcript.len());

        let prompt = format!("Transcript:\n{}", ctx.transcript);
        let raw = match self.generator.ask(SYSTEM_PROMPT, prompt).await {
            Ok(raw) => raw,
            Err(reason) => {
                absorb(&mut ctx, STAGE_NAME, reason);
                ctx.topics = Vec::new();
                ctx.decisions = Vec::new();
                ctx.summary = PLACEHOLDER_SUMMARY.to_string();
                return ctx;
            }
        };
        ctx.record_raw(STAGE_NAME, raw.as_str());

        match Self::parse(&raw) {
            StageOutcome::Parsed(analysis) => {
                ctx.topics = analysis.topics;
                ctx.decisions = analysis.decisions;
                // No usable summary in the object: keep the reply text instead.
                ctx.summary = if analysis.summary.is_empty() {
                    non_empty_summary(&raw)
                } else {
                    analysis.summary
                };
            }
            StageOutcome::Fallback(reason) => {
                absorb(&mut ctx, STAGE_NAME, reason);
                ctx.topics = Vec::new();
                ctx.decisions = Vec::new();
                ctx.summary = non_empty_summary(&raw);
            }
        }

        debug!(
            "Transcript analysis: {} topics, {} decisions",
            ctx.topics.len(),
            ctx.decisions.len()
        );
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::meeting::Metadata;
    use std::sync::Arc;
    use std::time::Duration;

    fn stage(llm: Arc<ScriptedLlm>) -> TranscriptAnalysis {
        TranscriptAnalysis::new(Generator::new(llm, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn test_structured_response() {
        let llm = Arc::new(ScriptedLlm::with_replies([
            r#"{"topics": ["Q3 roadmap"], "decisions": ["Delay launch"], "summary": "Roadmap review."}"#,
        ]));
        let ctx = stage(llm.clone())
            .run(MeetingContext::new("Alice: let's delay.", Metadata::new()))
            .await;

        assert_eq!(ctx.topics, vec!["Q3 roadmap"]);
        assert_eq!(ctx.decisions, vec!["Delay launch"]);
        assert_eq!(ctx.summary, "Roadmap review.");
        assert!(ctx.fallbacks.is_empty());
        assert!(llm.calls()[0].user_text().contains("Alice: let's delay."));
    }

    #[tokio::test]
    async fn test_unparsable_response_becomes_summary() {
        let llm = Arc::new(ScriptedLlm::with_replies(["not json"]));
        let ctx = stage(llm)
            .run(MeetingContext::new("t", Metadata::new()))
            .await;

        assert_eq!(ctx.summary, "not json");
        assert!(ctx.topics.is_empty());
        assert!(ctx.decisions.is_empty());
        assert!(ctx.fell_back(STAGE_NAME));
        assert_eq!(ctx.raw_response(STAGE_NAME), Some("not json"));
    }

    #[tokio::test]
    async fn test_empty_response_uses_placeholder() {
        let llm = Arc::new(ScriptedLlm::with_replies(["   "]));
        let ctx = stage(llm)
            .run(MeetingContext::new("t", Metadata::new()))
            .await;
        assert_eq!(ctx.summary, PLACEHOLDER_SUMMARY);
    }

    #[tokio::test]
    async fn test_missing_summary_keeps_reply_text() {
        let reply = r#"{"topics": ["Only topics"]}"#;
        let llm = Arc::new(ScriptedLlm::with_replies([reply]));
        let ctx = stage(llm)
            .run(MeetingContext::new("t", Metadata::new()))
            .await;

        assert_eq!(ctx.topics, vec!["Only topics"]);
        assert!(ctx.decisions.is_empty());
        assert_eq!(ctx.summary, reply);
        assert!(ctx.fallbacks.is_empty());
    }

    #[tokio::test]
    async fn test_prose_with_embedded_object_becomes_summary() {
        let reply = r#"The team agreed to raise the retry limit and ship Friday. New config: {"retries": 3}"#;
        let llm = Arc::new(ScriptedLlm::with_replies([reply]));
        let ctx = stage(llm)
            .run(MeetingContext::new("t", Metadata::new()))
            .await;

        assert_eq!(ctx.summary, reply);
        assert!(ctx.topics.is_empty());
        assert!(ctx.fell_back(STAGE_NAME));
    }

    #[tokio::test]
    async fn test_unrelated_object_is_wrong_shape() {
        let reply = r#"{"retries": 3}"#;
        let llm = Arc::new(ScriptedLlm::with_replies([reply]));
        let ctx = stage(llm)
            .run(MeetingContext::new("t", Metadata::new()))
            .await;

        assert_eq!(ctx.summary, reply);
        assert!(matches!(
            ctx.fallbacks[0].reason,
            FallbackReason::WrongShape { .. }
        ));
    }

    #[tokio::test]
    async fn test_service_failure_uses_placeholder() {
        let llm = Arc::new(ScriptedLlm::new().then_fail("unauthorized"));
        let ctx = stage(llm)
            .run(MeetingContext::new("t", Metadata::new()))
            .await;

        assert_eq!(ctx.summary, PLACEHOLDER_SUMMARY);
        assert!(ctx.fell_back(STAGE_NAME));
        assert!(ctx.raw_responses.is_empty());
    }
}
