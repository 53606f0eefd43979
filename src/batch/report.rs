use crate::batch::BatchState;
use crate::tools::ToolResponse;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Success,
    Error,
}

/// Outcome of one attempted step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStepResult {
    /// Zero-based position in the request
    pub index: usize,
    pub tool: String,
    pub outcome: StepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    /// The step's own shaped response; absent when the step was rejected before running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ToolResponse>,
}

impl BatchStepResult {
    pub fn is_success(&self) -> bool {
        self.outcome == StepOutcome::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: Vec<BatchStepResult>,
    pub successful: usize,
    pub failed: usize,
    /// Steps in the request, attempted or not
    pub total_steps: usize,
    pub duration_ms: u64,
    pub status: BatchState,
}

impl BatchReport {
    pub fn new(results: Vec<BatchStepResult>, total_steps: usize, duration_ms: u64, status: BatchState) -> Self {
        let successful = results.iter().filter(|r| r.is_success()).count();
        Self {
            failed: results.len() - successful,
            successful,
            results,
            total_steps,
            duration_ms,
            status,
        }
    }

    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    /// Human readable report, one line per attempted step
    pub fn render_summary(&self) -> String {
        let status = match self.status {
            BatchState::StoppedOnError => "stopped on error",
            BatchState::Completed => "completed",
            BatchState::Running => "running",
            BatchState::Pending => "pending",
        };

        let mut out = format!(
            "Batch {}: {} succeeded, {} failed, {} of {} step(s) attempted in {}ms",
            status,
            self.successful,
            self.failed,
            self.attempted(),
            self.total_steps,
            self.duration_ms
        );

        for result in &self.results {
            let _ = write!(out, "\n{}. {} ", result.index + 1, result.tool);
            match (&result.outcome, &result.error) {
                (StepOutcome::Error, Some(error)) => {
                    let _ = write!(out, "failed ({}ms): {}", result.duration_ms, first_line(error));
                }
                (StepOutcome::Error, None) => {
                    let _ = write!(out, "failed ({}ms)", result.duration_ms);
                }
                (StepOutcome::Success, _) => {
                    let _ = write!(out, "ok ({}ms)", result.duration_ms);
                    if let Some(text) = result.response.as_ref().and_then(|r| r.result.as_deref()) {
                        let _ = write!(out, ": {}", first_line(text));
                    }
                }
            }
        }

        let skipped = self.total_steps.saturating_sub(self.attempted());
        if skipped > 0 {
            let _ = write!(out, "\n{} step(s) not run", skipped);
        }
        out
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
