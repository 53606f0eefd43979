use crate::batch::{BatchExecutionRequest, BatchExecutor};
use crate::error::{BrowserError, Result};
use crate::tools::{Tool, ToolContext, ToolResult};

/// Tool running several tool calls in one request
#[derive(Default)]
pub struct BatchExecuteTool;

#[async_trait::async_trait]
impl Tool for BatchExecuteTool {
    type Params = BatchExecutionRequest;

    fn name(&self) -> &str {
        "batch_execute"
    }

    async fn execute_typed(&self, params: BatchExecutionRequest, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let mut executor = BatchExecutor::new(context.tools);
        let report = executor.run(&params, &mut *context.page).await;

        let text = report.render_summary();
        let data = serde_json::to_value(&report).map_err(|e| BrowserError::ToolExecutionFailed {
            tool: "batch_execute".to_string(),
            reason: format!("report serialization failed: {}", e),
        })?;
        Ok(ToolResult::success_with(data).with_text(text))
    }
}
