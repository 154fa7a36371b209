//! Meeting pipeline orchestrator.
//!
//! Drives one transcript through the fixed stage order:
//! analysis → extraction → refinement loop → trends → follow-up → evaluation → store → hook
//!
//! The orchestrator is the only writer of the memory store. Runs are
//! serialized so trend detection always sees history from before the
//! current meeting, and a meeting is stored only once its run completes.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ConfigError;
use crate::llm::{self, LlmClient};
use crate::meeting::{MeetingContext, MeetingRecord, Metadata, PipelinePhase, PipelineStatusHandle};
use crate::memory::{MemoryReader, MemoryStore};
use crate::stages::{
    ActionEvaluation, ActionExtraction, FollowupComposition, Generator, PriorityRiskRefinement,
    Stage, TranscriptAnalysis, TrendDetection,
};

pub mod post_meeting_hook;
pub mod refinement;

pub use post_meeting_hook::{MeetingResult, PostMeetingHook, ShellCommandHook};
pub use refinement::{RefinementLoop, RefinementState};

/// Tunables for a pipeline instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub request_timeout: Duration,
    pub max_refinement_passes: u32,
    pub quality_threshold: u8,
    pub overload_threshold: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.llm.request_timeout_seconds),
            max_refinement_passes: config.pipeline.max_refinement_passes,
            quality_threshold: config.pipeline.quality_threshold,
            overload_threshold: config.pipeline.overload_threshold,
        }
    }
}

pub struct Orchestrator {
    analysis: Box<dyn Stage>,
    extraction: Box<dyn Stage>,
    refinement: Box<dyn Stage>,
    trends: Box<dyn Stage>,
    followup: Box<dyn Stage>,
    evaluation: Box<dyn Stage>,
    refinement_loop: RefinementLoop,
    memory: MemoryStore,
    status: PipelineStatusHandle,
    hook: Option<Box<dyn PostMeetingHook>>,
    run_lock: Mutex<()>,
}

impl Orchestrator {
    /// Build from configuration. Fails before any stage runs if the
    /// generation service cannot be configured.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = llm::build_client(&config.llm)?;
        let orchestrator = Self::new(client, PipelineSettings::from(config));

        let command = config.hook.post_command.trim();
        if command.is_empty() {
            return Ok(orchestrator);
        }

        info!("Post-meeting hook enabled: {}", command);
        Ok(orchestrator.with_hook(Box::new(ShellCommandHook::new(
            command.to_string(),
            config.hook.post_command_timeout_seconds,
        ))))
    }

    pub fn new(client: Arc<dyn LlmClient>, settings: PipelineSettings) -> Self {
        let generator = Generator::new(client, settings.request_timeout);
        let memory = MemoryStore::new();

        Self {
            analysis: Box::new(TranscriptAnalysis::new(generator.clone())),
            extraction: Box::new(ActionExtraction::new(generator.clone())),
            refinement: Box::new(PriorityRiskRefinement::new(generator.clone())),
            trends: Box::new(TrendDetection::new(
                generator.clone(),
                memory.reader(),
                settings.overload_threshold,
            )),
            followup: Box::new(FollowupComposition::new(generator)),
            evaluation: Box::new(ActionEvaluation),
            refinement_loop: RefinementLoop::new(
                settings.max_refinement_passes,
                settings.quality_threshold,
            ),
            memory,
            status: PipelineStatusHandle::default(),
            hook: None,
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_hook(mut self, hook: Box<dyn PostMeetingHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Read access to the meetings processed so far.
    pub fn memory(&self) -> MemoryReader {
        self.memory.reader()
    }

    pub fn status(&self) -> PipelineStatusHandle {
        self.status.clone()
    }

    /// Run the full pipeline for one meeting and store the result.
    ///
    /// Always returns a fully populated context; stage failures surface as
    /// defaults and entries in `fallbacks`.
    pub async fn process(&self, transcript: impl Into<String>, metadata: Metadata) -> MeetingContext {
        let _run = self.run_lock.lock().await;
        let started = Instant::now();

        let ctx = MeetingContext::new(transcript, metadata);
        info!(
            "Processing meeting {:?} ({} chars of transcript)",
            ctx.title().unwrap_or("untitled"),
            ctx.transcript.len()
        );
        self.status.start_run(ctx.title().map(str::to_string)).await;

        let ctx = self.analysis.run(ctx).await;

        self.status.set_phase(PipelinePhase::Extracting).await;
        let ctx = self.extraction.run(ctx).await;

        let ctx = self
            .refinement_loop
            .run(self.refinement.as_ref(), ctx, &self.status)
            .await;

        self.status.set_phase(PipelinePhase::DetectingTrends).await;
        let ctx = self.trends.run(ctx).await;

        self.status.set_phase(PipelinePhase::Composing).await;
        let ctx = self.followup.run(ctx).await;

        self.status.set_phase(PipelinePhase::Evaluating).await;
        let mut ctx = self.evaluation.run(ctx).await;

        self.status.set_phase(PipelinePhase::Persisting).await;
        let meeting_id = self
            .memory
            .append_record(MeetingRecord::from_context(&ctx))
            .await;

        if let Some(hook) = &self.hook {
            self.status.set_phase(PipelinePhase::RunningHook).await;
            let result = MeetingResult::from_context(meeting_id, &ctx);
            if let Err(e) = hook.execute(&result).await {
                warn!("Post-meeting hook failed: {}", e);
            }
        }

        // Covers the whole run, including the store write and the hook.
        ctx.processing_time_sec = Some(started.elapsed().as_secs_f64());
        self.status.complete().await;

        info!(
            "Meeting {} processed in {:.2}s: {} actions, quality {}, {} fallback(s)",
            meeting_id,
            ctx.processing_time_sec.unwrap_or_default(),
            ctx.actions.len(),
            ctx.quality_score,
            ctx.fallbacks.len()
        );
        ctx
    }
}
