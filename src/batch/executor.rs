use crate::batch::{BatchExecutionRequest, BatchReport, BatchState, BatchStep, BatchStepResult, StepOutcome};
use crate::error::BrowserError;
use crate::page::Page;
use crate::tools::{ToolRegistry, ToolResponse};
use serde_json::Value;
use tokio::time::Instant;

/// Name under which the batch tool itself is registered
pub const BATCH_TOOL: &str = "batch_execute";

/// Runs the steps of one batch request, in order, against one page
pub struct BatchExecutor<'a> {
    tools: &'a ToolRegistry,
    state: BatchState,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(tools: &'a ToolRegistry) -> Self {
        Self {
            tools,
            state: BatchState::Pending,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Execute `request`; failures are captured in the report, never returned
    pub async fn run(&mut self, request: &BatchExecutionRequest, page: &mut Page) -> BatchReport {
        self.state = BatchState::Running;
        let started = Instant::now();
        let total = request.steps.len();
        let mut results = Vec::with_capacity(total);

        log::debug!("Batch started with {} step(s)", total);

        for (index, step) in request.steps.iter().enumerate() {
            log::debug!("Batch step {}/{}: {} started", index + 1, total, step.tool);
            let result = self.run_step(index, step, request, page).await;
            log::debug!(
                "Batch step {}/{}: {} finished ({:?}, {}ms)",
                index + 1,
                total,
                step.tool,
                result.outcome,
                result.duration_ms
            );

            let failed = !result.is_success();
            results.push(result);

            if failed && !step.continue_on_error && request.stop_on_first_error {
                self.state = BatchState::StoppedOnError;
                break;
            }
        }

        if self.state == BatchState::Running {
            self.state = BatchState::Completed;
        }

        let report = BatchReport::new(results, total, elapsed_ms(started), self.state);
        log::info!(
            "Batch {:?}: {} succeeded, {} failed, {} of {} step(s) attempted in {}ms",
            report.status,
            report.successful,
            report.failed,
            report.attempted(),
            report.total_steps,
            report.duration_ms
        );
        report
    }

    async fn run_step(
        &self,
        index: usize,
        step: &BatchStep,
        request: &BatchExecutionRequest,
        page: &mut Page,
    ) -> BatchStepResult {
        let started = Instant::now();

        let rejection = if step.tool == BATCH_TOOL {
            Some("nested batches are not supported")
        } else if !self.tools.has(&step.tool) {
            Some("unknown tool")
        } else {
            None
        };
        if let Some(reason) = rejection {
            let error = BrowserError::ToolExecutionFailed {
                tool: step.tool.clone(),
                reason: reason.to_string(),
            };
            return BatchStepResult {
                index,
                tool: step.tool.clone(),
                outcome: StepOutcome::Error,
                error: Some(error.to_string()),
                duration_ms: elapsed_ms(started),
                response: None,
            };
        }

        let mut arguments = step.arguments.clone();
        if let Some(expectation) = &step.expectation {
            match serde_json::to_value(expectation) {
                Ok(value) => {
                    arguments.insert("expectation".to_string(), value);
                }
                Err(e) => log::warn!("Dropping expectation of step {}: {}", index + 1, e),
            }
        }

        let response: ToolResponse = self
            .tools
            .execute_with(
                &step.tool,
                Value::Object(arguments),
                page,
                request.global_expectation.as_ref(),
            )
            .await;

        let (outcome, error) = if response.is_error {
            (StepOutcome::Error, response.result.clone())
        } else {
            (StepOutcome::Success, None)
        };

        BatchStepResult {
            index,
            tool: step.tool.clone(),
            outcome,
            error,
            duration_ms: elapsed_ms(started),
            response: Some(response),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::{ExpectationConfig, Section};
    use crate::tools::testing::form_page;
    use serde_json::json;

    fn quiet() -> ExpectationConfig {
        ExpectationConfig::sections(&[])
    }

    fn setup() -> Page {
        let (_engine, page, _input, _button) = form_page();
        page
    }

    fn steps_with_failing_second(continue_on_error: bool) -> Vec<BatchStep> {
        vec![
            BatchStep::new("navigate", json!({"url": "https://example.com"})),
            BatchStep::new("click", json!({"selector": "#missing"})).continue_on_error(continue_on_error),
            BatchStep::new("snapshot", json!({})),
        ]
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let mut page = setup();
        let registry = ToolRegistry::with_defaults();
        let request = BatchExecutionRequest::new(vec![
            BatchStep::new("snapshot", json!({})),
            BatchStep::new("click", json!({"ref": "f0s1e2"})),
            BatchStep::new("press_key", json!({"key": "Tab"})),
        ])
        .stop_on_first_error(true)
        .with_global_expectation(quiet());

        let mut executor = BatchExecutor::new(&registry);
        assert_eq!(executor.state(), BatchState::Pending);
        let report = executor.run(&request, &mut page).await;

        assert_eq!(report.successful, 3, "{}", report.render_summary());
        assert_eq!(report.failed, 0);
        assert_eq!(report.status, BatchState::Completed);
        assert_eq!(executor.state(), BatchState::Completed);
    }

    #[tokio::test]
    async fn test_continue_on_error_runs_every_step() {
        let mut page = setup();
        let registry = ToolRegistry::with_defaults();
        let request = BatchExecutionRequest::new(steps_with_failing_second(true))
            .stop_on_first_error(true)
            .with_global_expectation(quiet());

        let report = BatchExecutor::new(&registry).run(&request, &mut page).await;

        assert_eq!(report.successful, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.status, BatchState::Completed);
        assert!(report.results[1].error.as_ref().unwrap().contains("#missing"));
    }

    #[tokio::test]
    async fn test_stop_on_first_error() {
        let mut page = setup();
        let registry = ToolRegistry::with_defaults();
        let request = BatchExecutionRequest::new(steps_with_failing_second(false))
            .stop_on_first_error(true)
            .with_global_expectation(quiet());

        let report = BatchExecutor::new(&registry).run(&request, &mut page).await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.status, BatchState::StoppedOnError);
        assert_eq!(report.total_steps, 3);
        assert!(report.render_summary().ends_with("1 step(s) not run"));
    }

    #[tokio::test]
    async fn test_failure_without_stop_continues() {
        let mut page = setup();
        let registry = ToolRegistry::with_defaults();
        let request = BatchExecutionRequest::new(steps_with_failing_second(false)).with_global_expectation(quiet());

        let report = BatchExecutor::new(&registry).run(&request, &mut page).await;

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.status, BatchState::Completed);
    }

    #[tokio::test]
    async fn test_nested_and_unknown_tools_are_rejected() {
        let mut page = setup();
        let registry = ToolRegistry::with_defaults();
        let request = BatchExecutionRequest::new(vec![
            BatchStep::new(BATCH_TOOL, json!({"steps": []})),
            BatchStep::new("teleport", json!({})),
        ]);

        let report = BatchExecutor::new(&registry).run(&request, &mut page).await;

        assert_eq!(report.failed, 2);
        assert_eq!(
            report.results[0].error.as_deref(),
            Some("Tool 'batch_execute' failed: nested batches are not supported")
        );
        assert_eq!(report.results[1].error.as_deref(), Some("Tool 'teleport' failed: unknown tool"));
        assert!(report.results[0].response.is_none());
    }

    #[tokio::test]
    async fn test_step_expectation_beats_global() {
        let mut page = setup();
        let registry = ToolRegistry::with_defaults();
        let request = BatchExecutionRequest::new(vec![
            BatchStep::new("snapshot", json!({})),
            BatchStep::new("snapshot", json!({}))
                .with_expectation(ExpectationConfig::new().with_include(Section::Snapshot, true)),
        ])
        .with_global_expectation(quiet());

        let report = BatchExecutor::new(&registry).run(&request, &mut page).await;

        let first = report.results[0].response.as_ref().unwrap();
        let second = report.results[1].response.as_ref().unwrap();
        assert!(first.page_state.is_none());
        assert!(second.page_state.as_ref().unwrap().contains("[ref=f0s2e1]"));
        // global expectation still applies to fields the step leaves unset
        assert!(second.console_messages.is_none());
    }
}
