use crate::engine::ElementAction;
use crate::error::Result;
use crate::tools::utils::{TargetParams, js_string, press_enter, resolve_target};
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypeParams {
    /// Reference or CSS selector of an editable element
    #[serde(flatten)]
    pub target: TargetParams,

    /// Text to type into the element
    pub text: String,

    /// Press Enter afterwards (default: false)
    #[serde(default)]
    pub submit: bool,

    /// Type one character at a time instead of filling the value at once (default: false)
    #[serde(default)]
    pub slowly: bool,
}

#[derive(Default)]
pub struct TypeTool;

#[async_trait::async_trait]
impl Tool for TypeTool {
    type Params = TypeParams;

    fn name(&self) -> &str {
        "type"
    }

    async fn execute_typed(&self, params: TypeParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let target = resolve_target(context, &params.target).await?;
        let engine = context.page.engine().clone();

        let action = if params.slowly {
            ElementAction::Type {
                text: params.text.clone(),
            }
        } else {
            ElementAction::Fill {
                text: params.text.clone(),
            }
        };
        engine.perform_action(&target.handle, &action).await?;

        let locator = target.locator();
        if params.slowly {
            context.add_code(format!("await {}.pressSequentially({});", locator, js_string(&params.text)));
        } else {
            context.add_code(format!("await {}.fill({});", locator, js_string(&params.text)));
        }

        if params.submit {
            press_enter(context).await?;
            context.add_code(format!("await {}.press(\"Enter\");", locator));
        }

        Ok(ToolResult::success_with(serde_json::json!({
            "text_length": params.text.chars().count(),
            "submitted": params.submit,
        }))
        .with_text(format!(
            "Typed {} character(s) into {}{}",
            params.text.chars().count(),
            target.label,
            if params.submit { " and submitted" } else { "" }
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AxNode;
    use crate::error::BrowserError;
    use crate::tools::ToolRegistry;
    use crate::tools::testing::form_page;
    use serde_json::json;

    #[test]
    fn test_type_params_defaults() {
        let params: TypeParams = serde_json::from_value(json!({"ref": "f0s1e1", "text": "hello"})).unwrap();
        assert!(!params.submit);
        assert!(!params.slowly);
    }

    #[tokio::test]
    async fn test_fill_by_default() {
        let (engine, mut page, input, _button) = form_page();
        page.capture().await.unwrap();
        let registry = ToolRegistry::with_defaults();

        let response = registry
            .execute("type", json!({"ref": "f0s1e1", "text": "rust"}), &mut page)
            .await;

        assert!(!response.is_error, "{:?}", response.result);
        assert_eq!(engine.actions(), vec![(input, ElementAction::Fill { text: "rust".to_string() })]);
        assert_eq!(
            response.code.as_deref(),
            Some(r#"await page.locator("input[name=\"q\"]").fill("rust");"#)
        );
        assert!(engine.pressed_keys().is_empty());
    }

    #[tokio::test]
    async fn test_submit_attaches_pre_action_snapshot() {
        let (engine, mut page, input, _button) = form_page();
        engine.add_page("https://example.com/results", "Results", vec![AxNode::new("heading", "Results")]);
        engine.navigate_on_key("Enter", "https://example.com/results");
        page.capture().await.unwrap();
        let registry = ToolRegistry::with_defaults();

        let response = registry
            .execute(
                "type",
                json!({"ref": "f0s1e1", "text": "rust", "slowly": true, "submit": true}),
                &mut page,
            )
            .await;

        assert!(!response.is_error, "{:?}", response.result);
        assert_eq!(engine.actions(), vec![(input, ElementAction::Type { text: "rust".to_string() })]);
        assert_eq!(engine.pressed_keys(), vec!["Enter".to_string()]);

        let page_state = response.page_state.unwrap();
        assert!(page_state.contains("- textbox \"Query\" [ref=f0s2e1]"), "{}", page_state);
        assert!(!page_state.contains("Results"));

        // the page moved on: references of the attached snapshot are stale
        assert!(matches!(
            page.resolve("f0s2e1").await,
            Err(BrowserError::StaleReference { .. })
        ));
    }

    #[tokio::test]
    async fn test_submit_without_navigation_keeps_references() {
        let (engine, mut page, input, _button) = form_page();
        engine.set_focus_submits(true);
        page.capture().await.unwrap();
        let registry = ToolRegistry::with_defaults();

        let response = registry
            .execute("type", json!({"ref": "f0s1e1", "text": "rust", "submit": true}), &mut page)
            .await;

        assert!(!response.is_error, "{:?}", response.result);
        assert_eq!(engine.pressed_keys(), vec!["Enter".to_string()]);
        let page_state = response.page_state.unwrap();
        assert!(page_state.contains("- textbox \"Query\" [ref=f0s3e1]"), "{}", page_state);
        assert_eq!(page.resolve("f0s3e1").await.unwrap(), input);
    }
}
