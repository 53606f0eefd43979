use crate::error::{BrowserError, Result};
use crate::tools::utils::{js_string, press_enter};
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PressKeyParams {
    /// Key name such as `Enter`, `ArrowLeft` or `a`
    pub key: String,
}

#[derive(Default)]
pub struct PressKeyTool;

#[async_trait::async_trait]
impl Tool for PressKeyTool {
    type Params = PressKeyParams;

    fn name(&self) -> &str {
        "press_key"
    }

    async fn execute_typed(&self, params: PressKeyParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let key = params.key.trim();
        if key.is_empty() {
            return Err(BrowserError::InvalidArgument("Key must not be empty".to_string()));
        }

        if key == "Enter" {
            press_enter(context).await?;
        } else {
            let engine = context.page.engine().clone();
            engine.press_key(key).await?;
        }

        context.add_code(format!("await page.keyboard.press({});", js_string(key)));
        Ok(ToolResult::success().with_text(format!("Pressed {}", key)))
    }
}
