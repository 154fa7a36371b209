use async_trait::async_trait;
use std::fmt::Write;
use tracing::debug;

use super::{absorb, Generator, Stage};
use crate::meeting::MeetingContext;

pub const STAGE_NAME: &str = "followup_composition";

const SYSTEM_PROMPT: &str = "You write the follow-up message sent to attendees after a meeting. \
Use a short greeting, a one-paragraph recap, a bulleted list of action items with owner and \
due date, any risks worth flagging, and a brief sign-off. Plain text, no JSON.";

/// Writes the follow-up message. The response is used verbatim.
pub struct FollowupComposition {
    generator: Generator,
}

impl FollowupComposition {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    fn build_prompt(ctx: &MeetingContext) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Summary:\n{}\n", ctx.summary);

        let _ = writeln!(prompt, "Action items:");
        if ctx.actions.is_empty() {
            let _ = writeln!(prompt, "(none)");
        }
        for action in &ctx.actions {
            let _ = writeln!(
                prompt,
                "- {} (owner: {}, due: {}, priority: {})",
                action.description,
                action.effective_owner(),
                action.due_date,
                action.priority
            );
        }

        if !ctx.global_risks.is_empty() {
            let _ = writeln!(prompt, "\nRisks:\n- {}", ctx.global_risks.join("\n- "));
        }
        if !ctx.themes.is_empty() {
            let _ = writeln!(prompt, "\nRecurring themes:\n- {}", ctx.themes.join("\n- "));
        }
        prompt
    }
}

/// Plain follow-up built locally when the service could not be reached.
pub fn compose_locally(ctx: &MeetingContext) -> String {
    let mut message = String::from("Hi all,\n\nThanks for joining. Here is a quick recap.\n\n");
    let _ = writeln!(message, "{}\n", ctx.summary);

    if ctx.actions.is_empty() {
        message.push_str("No action items were recorded.\n");
    } else {
        message.push_str("Action items:\n");
        for action in &ctx.actions {
            let _ = writeln!(
                message,
                "- {} ({}, due {})",
                action.description,
                action.effective_owner(),
                action.due_date
            );
        }
    }

    if !ctx.global_risks.is_empty() {
        let _ = write!(message, "\nRisks:\n- {}\n", ctx.global_risks.join("\n- "));
    }

    message.push_str("\nThanks!");
    message
}

#[async_trait]
impl Stage for FollowupComposition {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn run(&self, mut ctx: MeetingContext) -> MeetingContext {
        let prompt = Self::build_prompt(&ctx);

        match self.generator.ask(SYSTEM_PROMPT, prompt).await {
            Ok(raw) => {
                ctx.record_raw(STAGE_NAME, raw.as_str());
                ctx.followup_message = raw;
            }
            Err(reason) => {
                absorb(&mut ctx, STAGE_NAME, reason);
                ctx.followup_message = compose_locally(&ctx);
            }
        }

        debug!("Follow-up message: {} chars", ctx.followup_message.len());
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::meeting::{ActionItem, Metadata};
    use std::sync::Arc;
    use std::time::Duration;

    fn context() -> MeetingContext {
        let mut ctx = MeetingContext::new("t", Metadata::new());
        ctx.summary = "We planned the offsite.".to_string();
        ctx.actions = vec![ActionItem::new("Book hotel")
            .with_owner("Raj")
            .with_due_date("May 3")];
        ctx.global_risks = vec!["Budget freeze".to_string()];
        ctx.themes = vec!["Travel".to_string()];
        ctx
    }

    #[tokio::test]
    async fn test_response_taken_verbatim() {
        let reply = "  Hi team,\n{\"not\": \"parsed\"}\n";
        let llm = Arc::new(ScriptedLlm::with_replies([reply]));
        let stage = FollowupComposition::new(Generator::new(llm.clone(), Duration::from_secs(5)));

        let ctx = stage.run(context()).await;
        assert_eq!(ctx.followup_message, reply);

        let prompt = llm.calls()[0].user_text();
        assert!(prompt.contains("Book hotel (owner: Raj, due: May 3, priority: Medium)"));
        assert!(prompt.contains("Budget freeze"));
        assert!(prompt.contains("Travel"));
    }

    #[tokio::test]
    async fn test_empty_response_is_kept() {
        let llm = Arc::new(ScriptedLlm::with_replies([""]));
        let stage = FollowupComposition::new(Generator::new(llm, Duration::from_secs(5)));
        let ctx = stage.run(context()).await;
        assert_eq!(ctx.followup_message, "");
        assert!(ctx.fallbacks.is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_composes_locally() {
        let llm = Arc::new(ScriptedLlm::new().then_fail("down"));
        let stage = FollowupComposition::new(Generator::new(llm, Duration::from_secs(5)));
        let ctx = stage.run(context()).await;

        assert!(ctx.fell_back(STAGE_NAME));
        assert!(ctx.followup_message.contains("We planned the offsite."));
        assert!(ctx.followup_message.contains("- Book hotel (Raj, due May 3)"));
        assert!(ctx.followup_message.contains("Budget freeze"));
    }

    #[test]
    fn test_compose_locally_without_actions() {
        let mut ctx = context();
        ctx.actions.clear();
        ctx.global_risks.clear();
        let message = compose_locally(&ctx);
        assert!(message.contains("No action items were recorded."));
        assert!(!message.contains("Risks:"));
    }
}
