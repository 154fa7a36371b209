use async_trait::async_trait;

use super::Stage;
use crate::meeting::{ActionItem, Evaluation, MeetingContext, Priority};

pub const STAGE_NAME: &str = "evaluation";

/// Ownership and priority metrics over an action list. Pure.
pub fn evaluate(actions: &[ActionItem]) -> Evaluation {
    let total_actions = actions.len();
    let actions_with_owner = actions.iter().filter(|a| a.has_owner()).count();
    let high_priority_actions = actions
        .iter()
        .filter(|a| a.priority == Priority::High)
        .count();

    let actions_with_owner_pct = if total_actions > 0 {
        let pct = actions_with_owner as f64 / total_actions as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    } else {
        0.0
    };

    Evaluation {
        total_actions,
        actions_with_owner,
        actions_with_owner_pct,
        high_priority_actions,
    }
}

/// Local stage that attaches [`evaluate`] output to the context.
#[derive(Debug, Default)]
pub struct ActionEvaluation;

#[async_trait]
impl Stage for ActionEvaluation {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn run(&self, mut ctx: MeetingContext) -> MeetingContext {
        ctx.evaluation = Some(evaluate(&ctx.actions));
        ctx
    }
}
