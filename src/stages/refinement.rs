use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::parse::{action_list, parse_object, quality_score, string_list};
use super::{absorb, Generator, Stage, StageOutcome};
use crate::meeting::{ActionItem, MeetingContext, DEFAULT_QUALITY_SCORE};

pub const STAGE_NAME: &str = "priority_risk_refinement";

const SYSTEM_PROMPT: &str = "You review meeting action items for clarity and readiness. \
Rewrite vague descriptions, fill in owners, due dates and priorities where the list implies them, \
and list delivery risks across the whole set. Reply with JSON only: \
{\"actions\": [{\"description\": string, \"owner\": string, \"due_date\": string, \
\"priority\": \"High\" | \"Medium\" | \"Low\"}], \"global_risks\": [string], \
\"quality_score\": integer 0-100}.";

#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    /// `None` when the response carried no action array.
    pub actions: Option<Vec<ActionItem>>,
    pub global_risks: Vec<String>,
    pub quality_score: u8,
}

/// Validates and rewrites the action list, scoring its quality.
///
/// Each run is a full rewrite of the list, not a merge with the previous one.
pub struct PriorityRiskRefinement {
    generator: Generator,
}

impl PriorityRiskRefinement {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    pub fn parse(raw: &str) -> StageOutcome<Refinement> {
        parse_object(raw).map(|map| Refinement {
            actions: match map.get("actions") {
                Some(Value::Array(items)) => Some(action_list(items)),
                _ => None,
            },
            global_risks: string_list(&map, &["global_risks", "risks"]),
            quality_score: quality_score(map.get("quality_score")),
        })
    }
}

#[async_trait]
impl Stage for PriorityRiskRefinement {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn run(&self, mut ctx: MeetingContext) -> MeetingContext {
        let actions_json =
            serde_json::to_string_pretty(&ctx.actions).unwrap_or_else(|_| "[]".to_string());
        let prompt = format!("Action items:\n{}", actions_json);

        let outcome = match self.generator.ask(SYSTEM_PROMPT, prompt).await {
            Ok(raw) => {
                ctx.record_raw(STAGE_NAME, raw.as_str());
                Self::parse(&raw)
            }
            Err(reason) => StageOutcome::Fallback(reason),
        };

        match outcome {
            StageOutcome::Parsed(refinement) => {
                if let Some(actions) = refinement.actions {
                    ctx.actions = actions;
                }
                ctx.global_risks = refinement.global_risks;
                ctx.quality_score = refinement.quality_score;
            }
            StageOutcome::Fallback(reason) => {
                absorb(&mut ctx, STAGE_NAME, reason);
                ctx.global_risks = Vec::new();
                ctx.quality_score = DEFAULT_QUALITY_SCORE;
            }
        }

        debug!(
            "Refinement: {} actions, {} risks, quality {}",
            ctx.actions.len(),
            ctx.global_risks.len(),
            ctx.quality_score
        );
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::meeting::{Metadata, Priority};
    use std::sync::Arc;
    use std::time::Duration;

    fn context_with_actions() -> MeetingContext {
        let mut ctx = MeetingContext::new("t", Metadata::new());
        ctx.actions = vec![
            ActionItem::new("do stuff"),
            ActionItem::new("other stuff").with_owner("Kim"),
        ];
        ctx.global_risks = vec!["stale risk".to_string()];
        ctx
    }

    async fn run_with(reply: &str) -> (MeetingContext, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm::with_replies([reply]));
        let stage = PriorityRiskRefinement::new(Generator::new(llm.clone(), Duration::from_secs(5)));
        (stage.run(context_with_actions()).await, llm)
    }

    #[tokio::test]
    async fn test_replaces_actions_wholesale() {
        let (ctx, llm) = run_with(
            r#"{"actions": [{"description": "Write the Q3 budget draft", "owner": "Kim", "priority": "high"}],
                "global_risks": ["Budget owner on leave"],
                "quality_score": 88}"#,
        )
        .await;

        assert_eq!(ctx.actions.len(), 1);
        assert_eq!(ctx.actions[0].description, "Write the Q3 budget draft");
        assert_eq!(ctx.actions[0].priority, Priority::High);
        assert_eq!(ctx.global_risks, vec!["Budget owner on leave"]);
        assert_eq!(ctx.quality_score, 88);
        assert!(llm.calls()[0].user_text().contains("other stuff"));
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_actions() {
        let (ctx, _) = run_with("Looks fine to me!").await;

        assert_eq!(ctx.actions.len(), 2);
        assert!(ctx.global_risks.is_empty());
        assert_eq!(ctx.quality_score, DEFAULT_QUALITY_SCORE);
        assert!(ctx.fell_back(STAGE_NAME));
    }

    #[tokio::test]
    async fn test_missing_action_array_keeps_actions() {
        let (ctx, _) = run_with(r#"{"quality_score": 93, "risks": ["Scope creep"]}"#).await;

        assert_eq!(ctx.actions.len(), 2);
        assert_eq!(ctx.global_risks, vec!["Scope creep"]);
        assert_eq!(ctx.quality_score, 93);
    }

    #[tokio::test]
    async fn test_empty_action_array_clears_actions() {
        let (ctx, _) = run_with(r#"{"actions": [], "global_risks": [], "quality_score": 100}"#).await;
        assert!(ctx.actions.is_empty());
        assert_eq!(ctx.quality_score, 100);
    }

    #[test]
    fn test_parse_unparsable_score_defaults() {
        match PriorityRiskRefinement::parse(r#"{"actions": [], "quality_score": "n/a"}"#) {
            StageOutcome::Parsed(refinement) => {
                assert_eq!(refinement.quality_score, DEFAULT_QUALITY_SCORE)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
