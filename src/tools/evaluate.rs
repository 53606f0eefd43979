use crate::error::{BrowserError, Result};
use crate::tools::utils::{TargetParams, js_string, resolve_target};
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EvaluateParams {
    /// JavaScript function source: `() => { ... }`, or `(element) => { ... }` with a target
    pub function: String,

    /// Element reference to pass to the function
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// CSS selector of the element to pass to the function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Human-readable element description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
}

impl EvaluateParams {
    fn target(&self) -> Option<TargetParams> {
        let mut target = match (&self.reference, &self.selector) {
            (Some(reference), _) => TargetParams::reference(reference.clone()),
            (None, Some(selector)) => TargetParams::selector(selector.clone()),
            (None, None) => return None,
        };
        target.element = self.element.clone();
        Some(target)
    }
}

/// Run JavaScript in the page, optionally against one element
#[derive(Default)]
pub struct EvaluateTool;

#[async_trait::async_trait]
impl Tool for EvaluateTool {
    type Params = EvaluateParams;

    fn name(&self) -> &str {
        "evaluate"
    }

    async fn execute_typed(&self, params: EvaluateParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let function = params.function.trim();
        if function.is_empty() {
            return Err(BrowserError::InvalidArgument("Function must not be empty".to_string()));
        }

        let engine = context.page.engine().clone();
        let value = match params.target() {
            Some(target_params) => {
                let target = resolve_target(context, &target_params).await?;
                let value = engine.evaluate_on_element(&target.handle, function).await?;
                context.add_code(format!("await {}.evaluate({});", target.locator(), js_string(function)));
                value
            }
            None => {
                let script = format!("({})()", function);
                let value = engine.evaluate(&engine.main_frame(), &script).await?;
                context.add_code(format!("await page.evaluate({});", js_string(function)));
                value
            }
        };

        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Ok(ToolResult::success_with(value).with_text(text))
    }
}
