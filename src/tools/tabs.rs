use crate::error::Result;
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TabListParams {}

/// List open tabs; the list itself travels in the response's tabs section
#[derive(Default)]
pub struct TabListTool;

#[async_trait::async_trait]
impl Tool for TabListTool {
    type Params = TabListParams;

    fn name(&self) -> &str {
        "tab_list"
    }

    async fn execute_typed(&self, _params: TabListParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let engine = context.page.engine().clone();
        let tabs = engine.tabs().await?;
        let active = tabs.iter().find(|tab| tab.active).map(|tab| tab.index);

        let text = match active {
            Some(index) => format!("{} tab(s) open, tab {} is current", tabs.len(), index),
            None => format!("{} tab(s) open", tabs.len()),
        };
        Ok(ToolResult::success_with(serde_json::json!({ "count": tabs.len(), "active": active })).with_text(text))
    }
}
