use async_trait::async_trait;
use tracing::debug;

use super::parse::{action_list, parse_array};
use super::{absorb, Generator, Stage, StageOutcome};
use crate::meeting::{ActionItem, MeetingContext};

pub const STAGE_NAME: &str = "action_extraction";

const SYSTEM_PROMPT: &str = "You extract action items from meetings. Reply with a JSON array only. \
Each element is {\"description\": string, \"owner\": string, \"due_date\": string, \
\"priority\": \"High\" | \"Medium\" | \"Low\"}. Use \"UNASSIGNED\" when no owner was named \
and \"TBD\" when no date was given.";

/// Pulls the list of follow-up tasks out of a transcript.
pub struct ActionExtraction {
    generator: Generator,
}

impl ActionExtraction {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    pub fn parse(raw: &str) -> StageOutcome<Vec<ActionItem>> {
        parse_array(raw).map(|items| action_list(&items))
    }
}

#[async_trait]
impl Stage for ActionExtraction {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn run(&self, mut ctx: MeetingContext) -> MeetingContext {
        let prompt = format!(
            "Meeting summary:\n{}\n\nTranscript:\n{}",
            ctx.summary, ctx.transcript
        );

        let outcome = match self.generator.ask(SYSTEM_PROMPT, prompt).await {
            Ok(raw) => {
                ctx.record_raw(STAGE_NAME, raw.as_str());
                Self::parse(&raw)
            }
            Err(reason) => StageOutcome::Fallback(reason),
        };

        ctx.actions = match outcome {
            StageOutcome::Parsed(actions) => actions,
            StageOutcome::Fallback(reason) => {
                absorb(&mut ctx, STAGE_NAME, reason);
                Vec::new()
            }
        };

        debug!("Extracted {} action items", ctx.actions.len());
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::meeting::{Metadata, Priority, UNASSIGNED};
    use std::sync::Arc;
    use std::time::Duration;

    async fn run_with(reply: &str) -> MeetingContext {
        let llm = Arc::new(ScriptedLlm::with_replies([reply]));
        let stage = ActionExtraction::new(Generator::new(llm, Duration::from_secs(5)));
        let mut ctx = MeetingContext::new("transcript", Metadata::new());
        ctx.summary = "summary".to_string();
        stage.run(ctx).await
    }

    #[tokio::test]
    async fn test_extracts_actions() {
        let ctx = run_with(
            r#"```json
[{"description": "Draft budget", "owner": "Bob", "due_date": "Friday", "priority": "High"},
 {"description": "Book room"}]
```"#,
        )
        .await;

        assert_eq!(ctx.actions.len(), 2);
        assert_eq!(ctx.actions[0].owner, "Bob");
        assert_eq!(ctx.actions[0].priority, Priority::High);
        assert_eq!(ctx.actions[1].owner, UNASSIGNED);
        assert!(ctx.fallbacks.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_gives_empty_actions() {
        let ctx = run_with("{}").await;
        assert!(ctx.actions.is_empty());
        assert!(ctx.fell_back(STAGE_NAME));
    }

    #[tokio::test]
    async fn test_unparsable_gives_empty_actions() {
        let ctx = run_with("I could not find any action items.").await;
        assert!(ctx.actions.is_empty());
        assert!(ctx.fell_back(STAGE_NAME));
    }

    #[tokio::test]
    async fn test_list_inside_prose_is_not_actions() {
        let ctx = run_with(r#"Owners: ["Ann"]"#).await;
        assert!(ctx.actions.is_empty());
        assert!(ctx.fell_back(STAGE_NAME));
    }

    #[tokio::test]
    async fn test_prompt_includes_summary_and_transcript() {
        let llm = Arc::new(ScriptedLlm::with_replies(["[]"]));
        let stage = ActionExtraction::new(Generator::new(llm.clone(), Duration::from_secs(5)));
        let mut ctx = MeetingContext::new("the transcript", Metadata::new());
        ctx.summary = "the summary".to_string();
        stage.run(ctx).await;

        let text = llm.calls()[0].user_text();
        assert!(text.contains("the transcript"));
        assert!(text.contains("the summary"));
    }
}
