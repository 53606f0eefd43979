use crate::engine::ElementAction;
use crate::error::{BrowserError, Result};
use crate::tools::utils::{TargetParams, js_string, resolve_target};
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SelectOptionParams {
    /// Reference or CSS selector of the `<select>` element
    #[serde(flatten)]
    pub target: TargetParams,

    /// Option values (or labels) to select
    pub values: Vec<String>,
}

#[derive(Default)]
pub struct SelectOptionTool;

#[async_trait::async_trait]
impl Tool for SelectOptionTool {
    type Params = SelectOptionParams;

    fn name(&self) -> &str {
        "select_option"
    }

    async fn execute_typed(&self, params: SelectOptionParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        if params.values.is_empty() {
            return Err(BrowserError::InvalidArgument("At least one value is required".to_string()));
        }

        let target = resolve_target(context, &params.target).await?;
        let engine = context.page.engine().clone();
        engine
            .perform_action(
                &target.handle,
                &ElementAction::SelectOption {
                    values: params.values.clone(),
                },
            )
            .await?;

        let values: Vec<String> = params.values.iter().map(|v| js_string(v)).collect();
        let argument = match values.as_slice() {
            [single] => single.clone(),
            _ => format!("[{}]", values.join(", ")),
        };
        context.add_code(format!("await {}.selectOption({});", target.locator(), argument));

        Ok(ToolResult::success_with(serde_json::json!({ "values": params.values }))
            .with_text(format!("Selected {} in {}", params.values.join(", "), target.label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use crate::tools::testing::form_page;
    use serde_json::json;

    #[tokio::test]
    async fn test_select_multiple_values() {
        let (engine, mut page, input, _button) = form_page();
        page.capture().await.unwrap();
        let registry = ToolRegistry::with_defaults();

        let response = registry
            .execute("select_option", json!({"ref": "f0s1e1", "values": ["red", "blue"]}), &mut page)
            .await;

        assert!(!response.is_error, "{:?}", response.result);
        assert_eq!(
            response.code.as_deref(),
            Some(r#"await page.locator("input[name=\"q\"]").selectOption(["red", "blue"]);"#)
        );
        assert_eq!(
            engine.actions(),
            vec![(
                input,
                ElementAction::SelectOption {
                    values: vec!["red".to_string(), "blue".to_string()]
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_select_requires_values() {
        let (engine, mut page, _input, _button) = form_page();
        let registry = ToolRegistry::with_defaults();

        let response = registry
            .execute("select_option", json!({"selector": "#save", "values": []}), &mut page)
            .await;

        assert!(response.is_error);
        assert!(engine.actions().is_empty());
    }
}
