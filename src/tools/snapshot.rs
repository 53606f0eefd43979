use crate::error::Result;
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotParams {}

/// Capture an accessibility snapshot and mint a new reference generation
#[derive(Default)]
pub struct SnapshotTool;

#[async_trait::async_trait]
impl Tool for SnapshotTool {
    type Params = SnapshotParams;

    fn name(&self) -> &str {
        "snapshot"
    }

    async fn execute_typed(&self, _params: SnapshotParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let snapshot = context.page.capture().await?;
        let references = context.page.registry().reference_count();

        let text = format!(
            "Captured snapshot generation {} ({} nodes, {} references, {} frame(s))",
            snapshot.generation,
            snapshot.count_nodes(),
            references,
            snapshot.frames.len()
        );
        context.attach_snapshot(snapshot.clone());

        Ok(ToolResult::success_with(serde_json::json!({
            "generation": snapshot.generation,
            "references": references,
        }))
        .with_text(text))
    }
}

#[cfg(test)]
mod tests {
    use crate::tools::ToolRegistry;
    use crate::tools::testing::form_page;
    use serde_json::json;

    #[tokio::test]
    async fn test_snapshot_is_captured_once() {
        let (engine, mut page, _input, _button) = form_page();
        let registry = ToolRegistry::with_defaults();

        let response = registry.execute("snapshot", json!({}), &mut page).await;

        assert!(!response.is_error);
        assert_eq!(engine.tree_reads(), 1);
        assert!(response.result.unwrap().starts_with("Captured snapshot generation 1"));
        let page_state = response.page_state.unwrap();
        assert!(page_state.contains("- textbox \"Query\" [ref=f0s1e1]"));
        assert!(page_state.contains("- button \"Save\" [ref=f0s1e2]"));
        assert!(response.code.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_json_format_and_truncation() {
        let (_engine, mut page, _input, _button) = form_page();
        let registry = ToolRegistry::with_defaults();

        let response = registry
            .execute(
                "snapshot",
                json!({"expectation": {"snapshotOptions": {"format": "json", "maxLength": 20}}}),
                &mut page,
            )
            .await;

        let page_state = response.page_state.unwrap();
        assert!(page_state.contains("- Page Snapshot:\n["));
        assert!(page_state.contains("[... snapshot truncated to 20 characters]"));
    }
}
