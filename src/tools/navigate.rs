use crate::error::Result;
use crate::tools::utils::{js_string, normalize_url};
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the navigate tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
}

/// Parameters of tools that take none
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoParams {}

/// Tool for navigating to a URL
#[derive(Default)]
pub struct NavigateTool;

#[async_trait::async_trait]
impl Tool for NavigateTool {
    type Params = NavigateParams;

    fn name(&self) -> &str {
        "navigate"
    }

    async fn execute_typed(&self, params: NavigateParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let normalized_url = normalize_url(&params.url);

        // references of the old document die with it, even if the load fails halfway
        context.page.invalidate();
        let engine = context.page.engine().clone();
        engine.navigate(&normalized_url).await?;

        context.add_code(format!("await page.goto({});", js_string(&normalized_url)));

        Ok(ToolResult::success_with(serde_json::json!({
            "original_url": params.url,
            "normalized_url": normalized_url,
        }))
        .with_text(format!("Navigated to {}", normalized_url)))
    }
}

/// Tool for going back in history
#[derive(Default)]
pub struct NavigateBackTool;

#[async_trait::async_trait]
impl Tool for NavigateBackTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "navigate_back"
    }

    async fn execute_typed(&self, _params: NoParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        context.page.invalidate();
        let engine = context.page.engine().clone();
        engine.go_back().await?;

        context.add_code("await page.goBack();");
        Ok(ToolResult::success().with_text("Navigated back"))
    }
}

/// Tool for going forward in history
#[derive(Default)]
pub struct NavigateForwardTool;

#[async_trait::async_trait]
impl Tool for NavigateForwardTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "navigate_forward"
    }

    async fn execute_typed(&self, _params: NoParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        context.page.invalidate();
        let engine = context.page.engine().clone();
        engine.go_forward().await?;

        context.add_code("await page.goForward();");
        Ok(ToolResult::success().with_text("Navigated forward"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::engine::{AxNode, BrowserEngine, ElementHandle, FakeEngine, FrameId};
    use crate::error::BrowserError;
    use crate::page::Page;
    use crate::tools::ToolRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<FakeEngine>, Page) {
        let engine = Arc::new(FakeEngine::new());
        engine.add_page(
            "https://example.com",
            "Example",
            vec![AxNode::new("heading", "Example Domain")],
        );
        let page = Page::new(engine.clone(), &ServerConfig::default());
        (engine, page)
    }

    #[test]
    fn test_navigate_params() {
        let params: NavigateParams = serde_json::from_value(json!({"url": "https://example.com"})).unwrap();
        assert_eq!(params.url, "https://example.com");
    }

    #[test]
    fn test_navigate_tool_metadata() {
        let tool = NavigateTool;
        assert_eq!(Tool::name(&tool), "navigate");
        assert!(Tool::parameters_schema(&tool).is_object());
    }

    #[tokio::test]
    async fn test_navigate_normalizes_and_snapshots() {
        let (engine, mut page) = setup();
        let registry = ToolRegistry::with_defaults();

        let response = registry.execute("navigate", json!({"url": "example.com"}), &mut page).await;
        assert!(!response.is_error, "{:?}", response.result);
        assert_eq!(engine.page_info().await.unwrap().url, "https://example.com");
        assert_eq!(response.result.as_deref(), Some("Navigated to https://example.com"));
        assert_eq!(response.code.as_deref(), Some(r#"await page.goto("https://example.com");"#));
        assert!(response.page_state.unwrap().contains("- heading \"Example Domain\""));
        assert!(response.console_messages.is_some());
        assert!(response.tabs.is_none());
    }

    #[tokio::test]
    async fn test_navigate_invalidates_references() {
        let (engine, mut page) = setup();
        engine.set_main_tree(vec![
            AxNode::new("button", "Go").with_handle(ElementHandle::new(FrameId::main(), "go")),
        ]);
        page.capture().await.unwrap();

        let registry = ToolRegistry::with_defaults();
        let response = registry
            .execute(
                "navigate",
                json!({"url": "https://example.com", "expectation": {"includeSnapshot": false}}),
                &mut page,
            )
            .await;
        assert!(!response.is_error);
        assert!(response.page_state.is_none());

        let err = page.resolve("f0s1e1").await.unwrap_err();
        assert!(matches!(err, BrowserError::StaleReference { current: 1, .. }));
    }

    #[tokio::test]
    async fn test_back_and_forward() {
        let (_engine, mut page) = setup();
        let registry = ToolRegistry::with_defaults();

        registry.execute("navigate", json!({"url": "https://example.com"}), &mut page).await;
        let back = registry.execute("navigate_back", json!({}), &mut page).await;
        assert!(!back.is_error);
        assert_eq!(back.code.as_deref(), Some("await page.goBack();"));

        let forward = registry.execute("navigate_forward", serde_json::Value::Null, &mut page).await;
        assert!(forward.is_error);
        assert!(forward.result.unwrap().contains("No next page"));
    }
}
