//! MCP (Model Context Protocol) server for browser automation
//!
//! Every rmcp tool here forwards to the [`ToolRegistry`](crate::tools::ToolRegistry)
//! tool of the same name (minus the `browser_` prefix), so MCP clients and
//! batch steps run exactly the same code.

pub mod handler;
pub use handler::BrowserServer;

use crate::batch::BatchExecutionRequest;
use crate::expectation::ExpectationConfig;
use crate::tools::{
    ClickParams, ConsoleMessagesParams, DiagnoseParams, EvaluateParams, HoverParams, NavigateParams, NoParams,
    PressKeyParams, ScreenshotParams, SelectOptionParams, SnapshotParams, TabListParams, TypeParams, WaitForParams,
};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::{ErrorData as McpError, tool, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool parameters plus the optional per-call expectation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WithExpectation<P> {
    #[serde(flatten)]
    pub params: P,

    /// Which page state sections to return with the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation: Option<ExpectationConfig>,
}

impl<P> WithExpectation<P> {
    pub fn new(params: P) -> Self {
        Self {
            params,
            expectation: None,
        }
    }

    pub fn with_expectation(mut self, expectation: ExpectationConfig) -> Self {
        self.expectation = Some(expectation);
        self
    }
}

fn arguments<P: Serialize>(params: &WithExpectation<P>) -> Result<Value, McpError> {
    serde_json::to_value(params).map_err(|e| McpError::invalid_params(e.to_string(), None))
}

#[tool_router]
impl BrowserServer {
    #[tool(description = "Navigate to a URL. Invalidates every element reference of the previous page")]
    pub async fn browser_navigate(
        &self,
        Parameters(params): Parameters<WithExpectation<NavigateParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("navigate", arguments(&params)?).await
    }

    #[tool(description = "Go back to the previous page in history")]
    pub async fn browser_navigate_back(
        &self,
        Parameters(params): Parameters<WithExpectation<NoParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("navigate_back", arguments(&params)?).await
    }

    #[tool(description = "Go forward to the next page in history")]
    pub async fn browser_navigate_forward(
        &self,
        Parameters(params): Parameters<WithExpectation<NoParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("navigate_forward", arguments(&params)?).await
    }

    #[tool(description = "Click an element given by snapshot reference (`ref`) or unique CSS `selector`")]
    pub async fn browser_click(
        &self,
        Parameters(params): Parameters<WithExpectation<ClickParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("click", arguments(&params)?).await
    }

    #[tool(description = "Hover over an element given by snapshot reference or unique CSS selector")]
    pub async fn browser_hover(
        &self,
        Parameters(params): Parameters<WithExpectation<HoverParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("hover", arguments(&params)?).await
    }

    #[tool(description = "Type text into an editable element, optionally pressing Enter afterwards")]
    pub async fn browser_type(
        &self,
        Parameters(params): Parameters<WithExpectation<TypeParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("type", arguments(&params)?).await
    }

    #[tool(description = "Select one or more options in a dropdown")]
    pub async fn browser_select_option(
        &self,
        Parameters(params): Parameters<WithExpectation<SelectOptionParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("select_option", arguments(&params)?).await
    }

    #[tool(description = "Press a key on the keyboard, e.g. `Enter`, `ArrowDown` or `a`")]
    pub async fn browser_press_key(
        &self,
        Parameters(params): Parameters<WithExpectation<PressKeyParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("press_key", arguments(&params)?).await
    }

    #[tool(description = "Capture an accessibility snapshot of the page, minting fresh element references")]
    pub async fn browser_snapshot(
        &self,
        Parameters(params): Parameters<WithExpectation<SnapshotParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("snapshot", arguments(&params)?).await
    }

    #[tool(description = "Take a screenshot of the viewport")]
    pub async fn browser_take_screenshot(
        &self,
        Parameters(params): Parameters<WithExpectation<ScreenshotParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("take_screenshot", arguments(&params)?).await
    }

    #[tool(description = "Evaluate a JavaScript function on the page, or on one element when a target is given")]
    pub async fn browser_evaluate(
        &self,
        Parameters(params): Parameters<WithExpectation<EvaluateParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("evaluate", arguments(&params)?).await
    }

    #[tool(description = "Wait for a duration, for text to appear or for text to disappear")]
    pub async fn browser_wait_for(
        &self,
        Parameters(params): Parameters<WithExpectation<WaitForParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("wait_for", arguments(&params)?).await
    }

    #[tool(description = "List open tabs")]
    pub async fn browser_tab_list(
        &self,
        Parameters(params): Parameters<WithExpectation<TabListParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("tab_list", arguments(&params)?).await
    }

    #[tool(description = "Return console messages of the current page")]
    pub async fn browser_console_messages(
        &self,
        Parameters(params): Parameters<WithExpectation<ConsoleMessagesParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("console_messages", arguments(&params)?).await
    }

    #[tool(
        description = "Run several tools in order in one call. Each step names a tool and its arguments; \
                       `globalExpectation` applies to every step that does not set its own"
    )]
    pub async fn browser_batch_execute(
        &self,
        Parameters(params): Parameters<WithExpectation<BatchExecutionRequest>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("batch_execute", arguments(&params)?).await
    }

    #[tool(description = "Report tracked frames, evict detached ones and flag oversized or stale frames")]
    pub async fn browser_diagnose(
        &self,
        Parameters(params): Parameters<WithExpectation<DiagnoseParams>>,
    ) -> Result<CallToolResult, McpError> {
        self.call("diagnose", arguments(&params)?).await
    }
}
