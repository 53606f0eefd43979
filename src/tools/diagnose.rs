use crate::error::Result;
use crate::frames::PerformanceIssue;
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DiagnoseParams {}

/// Report tracked frames, performance issues and snapshot statistics
#[derive(Default)]
pub struct DiagnoseTool;

#[async_trait::async_trait]
impl Tool for DiagnoseTool {
    type Params = DiagnoseParams;

    fn name(&self) -> &str {
        "diagnose"
    }

    async fn execute_typed(&self, _params: DiagnoseParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let frames = context.page.frames().clone();
        let cleanup = frames.cleanup_detached().await?;
        let performance = frames.find_performance_issues();
        let active = frames.active_frames();

        let registry = context.page.registry();
        let current = registry.current();

        let mut text = String::from("Frames:\n");
        for record in &active {
            let kind = if record.is_main() { "main" } else { "child" };
            let _ = write!(text, "- {} ({}) {}", record.id, kind, record.url);
            if let Some(count) = record.element_count {
                let _ = write!(text, ", {} nodes", count);
            }
            text.push('\n');
        }
        let _ = writeln!(
            text,
            "Cleanup: checked {}, evicted {} ({} evicted in total)",
            cleanup.checked,
            cleanup.evicted.len(),
            performance.detached_evicted
        );

        write_issues(&mut text, "Large frames", &performance.large_frames);
        write_issues(&mut text, "Stale frames", &performance.stale_frames);

        match &current {
            Some(snapshot) => {
                let _ = write!(
                    text,
                    "Snapshot: generation {}{}, {} nodes, {} references",
                    snapshot.generation,
                    if registry.is_current() { "" } else { " (stale)" },
                    snapshot.count_nodes(),
                    registry.reference_count()
                );
            }
            None => text.push_str("Snapshot: none captured"),
        }

        Ok(ToolResult::success_with(serde_json::json!({
            "frames": active,
            "cleanup": cleanup,
            "performance": performance,
            "generation": registry.generation(),
            "references": registry.reference_count(),
            "snapshotCurrent": registry.is_current(),
        }))
        .with_text(text))
    }
}

fn write_issues(text: &mut String, title: &str, issues: &[PerformanceIssue]) {
    if issues.is_empty() {
        return;
    }
    let _ = writeln!(text, "{}:", title);
    for issue in issues {
        let _ = writeln!(text, "- {} {}: {}", issue.frame_id, issue.url, issue.detail);
    }
}
