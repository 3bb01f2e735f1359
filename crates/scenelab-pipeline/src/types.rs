//! Execution policy and run report types.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// What to do when a step exits non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run; steps not reached are recorded as skipped.
    Halt,
    /// Run every step regardless; the run still counts as failed.
    KeepGoing,
}

/// Where step output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child inherits the parent's stdio, training progress stays live.
    Inherit,
    /// Stdout/stderr streamed to per-step files under the log directory.
    Capture,
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
}

/// Record of one step of a run.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub command: String,
    pub status: StepStatus,
    #[serde(rename = "exitCode")]
    pub exit_code: Option<i32>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    /// Launch error or captured stderr tail when the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Record of one pipeline run, persisted as `run-<id>.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(rename = "runId")]
    pub run_id: String,
    pub pipeline: String,
    pub dataset: String,
    #[serde(rename = "startedAt")]
    pub started_at: String,
    pub steps: Vec<StepReport>,
    pub success: bool,
}

impl RunReport {
    /// Write the report as pretty JSON into `dir`, returning the path.
    pub fn save(&self, dir: &Path) -> scenelab_core::Result<PathBuf> {
        let path = dir.join(format!("run-{}.json", self.run_id));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
    }
}
