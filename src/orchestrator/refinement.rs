//! Bounded, score-gated repetition of the refinement stage.
//!
//! Refining(1) -> run stage -> score >= threshold ? Converged
//!                           : pass == max ? Exhausted
//!                           : Refining(pass + 1)

use tracing::{debug, info};

use crate::meeting::{MeetingContext, PipelineStatusHandle, RefinementOutcome};
use crate::stages::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementState {
    Refining { pass: u32 },
    Converged { passes: u32 },
    Exhausted { passes: u32 },
}

impl RefinementState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Refining { .. })
    }

    pub fn outcome(&self) -> Option<RefinementOutcome> {
        match *self {
            Self::Refining { .. } => None,
            Self::Converged { passes } => Some(RefinementOutcome::Converged { passes }),
            Self::Exhausted { passes } => Some(RefinementOutcome::Exhausted { passes }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefinementLoop {
    max_passes: u32,
    quality_threshold: u8,
}

impl Default for RefinementLoop {
    fn default() -> Self {
        Self::new(2, 85)
    }
}

impl RefinementLoop {
    /// `max_passes` below 1 is raised to 1; the loop always runs once.
    pub fn new(max_passes: u32, quality_threshold: u8) -> Self {
        Self {
            max_passes: max_passes.max(1),
            quality_threshold,
        }
    }

    pub fn max_passes(&self) -> u32 {
        self.max_passes
    }

    pub fn initial(&self) -> RefinementState {
        RefinementState::Refining { pass: 1 }
    }

    /// Transition after pass `pass` produced `quality_score`.
    pub fn advance(&self, pass: u32, quality_score: u8) -> RefinementState {
        if quality_score >= self.quality_threshold {
            RefinementState::Converged { passes: pass }
        } else if pass >= self.max_passes {
            RefinementState::Exhausted { passes: pass }
        } else {
            RefinementState::Refining { pass: pass + 1 }
        }
    }

    pub async fn run(
        &self,
        stage: &dyn Stage,
        mut ctx: MeetingContext,
        status: &PipelineStatusHandle,
    ) -> MeetingContext {
        let mut state = self.initial();

        while let RefinementState::Refining { pass } = state {
            status.set_refinement_pass(pass).await;
            ctx = stage.run(ctx).await;
            state = self.advance(pass, ctx.quality_score);
            debug!(
                "Refinement pass {} scored {} -> {:?}",
                pass, ctx.quality_score, state
            );
        }

        let outcome = state.outcome();
        if let Some(outcome) = outcome {
            info!(
                "Refinement finished after {} pass(es) with quality {} ({:?})",
                outcome.passes(),
                ctx.quality_score,
                outcome
            );
        }
        ctx.refinement = outcome;
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meeting::Metadata;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Stage that emits a fixed sequence of scores.
    struct ScoreStage {
        scores: Mutex<Vec<u8>>,
        runs: Mutex<u32>,
    }

    impl ScoreStage {
        fn new(scores: &[u8]) -> Self {
            let mut scores = scores.to_vec();
            scores.reverse();
            Self {
                scores: Mutex::new(scores),
                runs: Mutex::new(0),
            }
        }

        fn runs(&self) -> u32 {
            *self.runs.lock().unwrap()
        }
    }

    #[async_trait]
    impl Stage for ScoreStage {
        fn name(&self) -> &'static str {
            "score"
        }

        async fn run(&self, mut ctx: MeetingContext) -> MeetingContext {
            *self.runs.lock().unwrap() += 1;
            ctx.quality_score = self.scores.lock().unwrap().pop().unwrap_or(0);
            ctx
        }
    }

    #[test]
    fn test_transitions() {
        let refinement = RefinementLoop::new(2, 85);
        assert_eq!(refinement.initial(), RefinementState::Refining { pass: 1 });
        assert_eq!(refinement.advance(1, 85), RefinementState::Converged { passes: 1 });
        assert_eq!(refinement.advance(1, 84), RefinementState::Refining { pass: 2 });
        assert_eq!(refinement.advance(2, 10), RefinementState::Exhausted { passes: 2 });
        assert_eq!(refinement.advance(2, 99), RefinementState::Converged { passes: 2 });
    }

    #[test]
    fn test_zero_passes_raised_to_one() {
        let refinement = RefinementLoop::new(0, 85);
        assert_eq!(refinement.max_passes(), 1);
        assert_eq!(refinement.advance(1, 0), RefinementState::Exhausted { passes: 1 });
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RefinementState::Refining { pass: 1 }.is_terminal());
        assert!(RefinementState::Converged { passes: 1 }.is_terminal());
        assert!(RefinementState::Exhausted { passes: 2 }.is_terminal());
        assert_eq!(RefinementState::Refining { pass: 1 }.outcome(), None);
    }

    #[tokio::test]
    async fn test_single_pass_when_first_score_high() {
        let stage = ScoreStage::new(&[90, 95]);
        let ctx = RefinementLoop::default()
            .run(
                &stage,
                MeetingContext::new("t", Metadata::new()),
                &PipelineStatusHandle::default(),
            )
            .await;

        assert_eq!(stage.runs(), 1);
        assert_eq!(ctx.quality_score, 90);
        assert_eq!(ctx.refinement, Some(RefinementOutcome::Converged { passes: 1 }));
    }

    #[tokio::test]
    async fn test_stops_at_max_passes() {
        let stage = ScoreStage::new(&[40, 60, 99]);
        let status = PipelineStatusHandle::default();
        let ctx = RefinementLoop::default()
            .run(&stage, MeetingContext::new("t", Metadata::new()), &status)
            .await;

        assert_eq!(stage.runs(), 2);
        assert_eq!(ctx.quality_score, 60);
        assert_eq!(ctx.refinement, Some(RefinementOutcome::Exhausted { passes: 2 }));
        assert_eq!(status.get().await.refinement_pass, Some(2));
    }

    #[tokio::test]
    async fn test_converges_on_second_pass() {
        let stage = ScoreStage::new(&[70, 86]);
        let ctx = RefinementLoop::default()
            .run(
                &stage,
                MeetingContext::new("t", Metadata::new()),
                &PipelineStatusHandle::default(),
            )
            .await;

        assert_eq!(stage.runs(), 2);
        assert_eq!(ctx.refinement, Some(RefinementOutcome::Converged { passes: 2 }));
    }
}
