//! Pipeline status types and shared state handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Phase of a single `process` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Idle,
    Analyzing,
    Extracting,
    Refining,
    DetectingTrends,
    Composing,
    Evaluating,
    Persisting,
    RunningHook,
    Completed,
}

impl PipelinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Extracting => "extracting",
            Self::Refining => "refining",
            Self::DetectingTrends => "detecting_trends",
            Self::Composing => "composing",
            Self::Evaluating => "evaluating",
            Self::Persisting => "persisting",
            Self::RunningHook => "running_hook",
            Self::Completed => "completed",
        }
    }
}

/// Current pipeline state, readable while a meeting is being processed.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub phase: PipelinePhase,
    pub title: Option<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub refinement_pass: Option<u32>,
    pub meetings_processed: usize,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            phase: PipelinePhase::Idle,
            title: None,
            started_at: None,
            refinement_pass: None,
            meetings_processed: 0,
        }
    }
}

impl PipelineState {
    /// Seconds since the current run started.
    pub fn elapsed_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = chrono::Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Thread-safe handle for sharing pipeline state with observers.
#[derive(Clone, Default)]
pub struct PipelineStatusHandle {
    inner: Arc<Mutex<PipelineState>>,
}

impl PipelineStatusHandle {
    pub async fn get(&self) -> PipelineState {
        self.inner.lock().await.clone()
    }

    pub async fn start_run(&self, title: Option<String>) {
        let mut state = self.inner.lock().await;
        state.phase = PipelinePhase::Analyzing;
        state.title = title;
        state.started_at = Some(chrono::Utc::now());
        state.refinement_pass = None;
    }

    pub async fn set_phase(&self, phase: PipelinePhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
    }

    pub async fn set_refinement_pass(&self, pass: u32) {
        let mut state = self.inner.lock().await;
        state.phase = PipelinePhase::Refining;
        state.refinement_pass = Some(pass);
    }

    pub async fn complete(&self) {
        let mut state = self.inner.lock().await;
        state.phase = PipelinePhase::Completed;
        state.meetings_processed += 1;
    }
}
