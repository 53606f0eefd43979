use crate::engine::ElementAction;
use crate::error::Result;
use crate::tools::utils::{TargetParams, resolve_target};
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HoverParams {
    /// Element reference or CSS selector
    #[serde(flatten)]
    pub target: TargetParams,
}

#[derive(Default)]
pub struct HoverTool;

#[async_trait::async_trait]
impl Tool for HoverTool {
    type Params = HoverParams;

    fn name(&self) -> &str {
        "hover"
    }

    async fn execute_typed(&self, params: HoverParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let target = resolve_target(context, &params.target).await?;
        let engine = context.page.engine().clone();
        engine.perform_action(&target.handle, &ElementAction::Hover).await?;

        context.add_code(format!("await {}.hover();", target.locator()));
        Ok(ToolResult::success().with_text(format!("Hovered {}", target.label)))
    }
}
