use crate::engine::{ElementAction, MouseButton};
use crate::error::Result;
use crate::tools::utils::{TargetParams, resolve_target};
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the click tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClickParams {
    /// Element reference or CSS selector
    #[serde(flatten)]
    pub target: TargetParams,

    /// Double click instead of a single click
    #[serde(default)]
    pub double_click: bool,

    /// Mouse button (default: left)
    #[serde(default)]
    pub button: MouseButton,
}

/// Tool for clicking elements
#[derive(Default)]
pub struct ClickTool;

#[async_trait::async_trait]
impl Tool for ClickTool {
    type Params = ClickParams;

    fn name(&self) -> &str {
        "click"
    }

    async fn execute_typed(&self, params: ClickParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let target = resolve_target(context, &params.target).await?;

        let engine = context.page.engine().clone();
        engine
            .perform_action(
                &target.handle,
                &ElementAction::Click {
                    button: params.button,
                    double: params.double_click,
                },
            )
            .await?;

        let method = if params.double_click { "dblclick" } else { "click" };
        let options = match params.button {
            MouseButton::Left => String::new(),
            MouseButton::Right => "{ button: 'right' }".to_string(),
            MouseButton::Middle => "{ button: 'middle' }".to_string(),
        };
        context.add_code(format!("await {}.{}({});", target.locator(), method, options));

        let verb = if params.double_click { "Double clicked" } else { "Clicked" };
        Ok(ToolResult::success_with(serde_json::json!({
            "target": target.label,
            "selector": target.selector,
        }))
        .with_text(format!("{} {}", verb, target.label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use crate::tools::testing::form_page;
    use crate::tools::utils::Target;
    use serde_json::json;

    #[test]
    fn test_click_params_ref() {
        let params: ClickParams = serde_json::from_value(json!({"ref": "f0s2e4", "double_click": true})).unwrap();
        assert_eq!(
            params.target.target,
            Target::Reference {
                reference: "f0s2e4".to_string()
            }
        );
        assert!(params.double_click);
        assert_eq!(params.button, MouseButton::Left);
    }

    #[test]
    fn test_click_params_css() {
        let params: ClickParams = serde_json::from_value(json!({"selector": "#my-button", "button": "right"})).unwrap();
        assert_eq!(params.target, TargetParams::selector("#my-button"));
        assert_eq!(params.button, MouseButton::Right);
    }

    #[tokio::test]
    async fn test_click_by_reference() {
        let (engine, mut page, _input, button) = form_page();
        page.capture().await.unwrap();

        let registry = ToolRegistry::with_defaults();
        let response = registry.execute("click", json!({"ref": "f0s1e2"}), &mut page).await;

        assert!(!response.is_error, "{:?}", response.result);
        assert_eq!(response.result.as_deref(), Some("Clicked f0s1e2"));
        assert_eq!(response.code.as_deref(), Some(r#"await page.locator("button#save").click();"#));
        assert_eq!(
            engine.actions(),
            vec![(
                button,
                ElementAction::Click {
                    button: MouseButton::Left,
                    double: false
                }
            )]
        );
        // the response snapshot is a new generation
        assert!(response.page_state.unwrap().contains("[ref=f0s2e2]"));
    }

    #[tokio::test]
    async fn test_click_by_selector() {
        let (engine, mut page, _input, button) = form_page();
        let registry = ToolRegistry::with_defaults();

        let response = registry
            .execute(
                "click",
                json!({"selector": "#save", "double_click": true, "expectation": {"includeSnapshot": false}}),
                &mut page,
            )
            .await;

        assert!(!response.is_error, "{:?}", response.result);
        assert_eq!(response.code.as_deref(), Some(r#"await page.locator("button#save").dblclick();"#));
        assert_eq!(engine.actions()[0].0, button);
        assert!(response.page_state.is_none());
    }

    #[tokio::test]
    async fn test_click_stale_reference() {
        let (engine, mut page, _input, _button) = form_page();
        page.capture().await.unwrap();
        page.capture().await.unwrap();

        let registry = ToolRegistry::with_defaults();
        let response = registry.execute("click", json!({"ref": "f0s1e2"}), &mut page).await;

        assert!(response.is_error);
        assert!(response.result.unwrap().contains("capture a new snapshot"));
        assert!(engine.actions().is_empty());
    }

    #[tokio::test]
    async fn test_click_failure_is_reported() {
        let (engine, mut page, _input, button) = form_page();
        engine.fail_actions_on(&button, "covered by overlay");
        page.capture().await.unwrap();

        let registry = ToolRegistry::with_defaults();
        let response = registry.execute("click", json!({"ref": "f0s1e2"}), &mut page).await;

        assert!(response.is_error);
        let text = response.result.unwrap();
        assert!(text.starts_with("Tool 'click' failed"), "{}", text);
        assert!(text.contains("covered by overlay"), "{}", text);
    }
}
