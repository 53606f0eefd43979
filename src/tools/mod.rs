//! Browser automation tools
//!
//! Every tool implements [`Tool`] with a typed parameter struct. The
//! [`ToolRegistry`] erases the parameter type behind [`DynTool`] so tools can
//! be looked up by name and fed plain JSON, which is how both the MCP layer
//! and the batch engine call them.
//!
//! A call always ends in a [`ToolResponse`]: errors become responses with
//! `isError` set, and optional sections (snapshot, console, tabs, ...) are
//! built only when the resolved expectation asks for them.

pub mod batch;
pub mod click;
pub mod console;
pub mod diagnose;
pub mod evaluate;
pub mod hover;
pub mod input;
pub mod navigate;
pub mod press_key;
pub mod response;
pub mod screenshot;
pub mod select_option;
pub mod snapshot;
pub mod tabs;
pub mod utils;
pub mod wait;

pub use batch::BatchExecuteTool;
pub use click::{ClickParams, ClickTool};
pub use console::{ConsoleMessagesParams, ConsoleMessagesTool};
pub use diagnose::{DiagnoseParams, DiagnoseTool};
pub use evaluate::{EvaluateParams, EvaluateTool};
pub use hover::{HoverParams, HoverTool};
pub use input::{TypeParams, TypeTool};
pub use navigate::{NavigateBackTool, NavigateForwardTool, NavigateParams, NavigateTool, NoParams};
pub use press_key::{PressKeyParams, PressKeyTool};
pub use response::{Attachment, ToolResponse};
pub use screenshot::{ScreenshotParams, ScreenshotTool};
pub use select_option::{SelectOptionParams, SelectOptionTool};
pub use snapshot::{SnapshotParams, SnapshotTool};
pub use tabs::{TabListParams, TabListTool};
pub use utils::{Target, TargetParams};
pub use wait::{WaitForParams, WaitForTool};

use crate::dom::Snapshot;
use crate::error::{BrowserError, Result};
use crate::expectation::{self, ExpectationConfig, ResolvedExpectation, Section};
use crate::page::Page;
use async_trait::async_trait;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of a tool's own work, before response shaping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    /// Human readable summary; replaces `data` in the rendered result when set
    pub text: Option<String>,
}

impl ToolResult {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn success_with(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Text shown to the caller
    pub fn render(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        if let Some(error) = &self.error {
            return error.clone();
        }
        match &self.data {
            Some(data) => serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()),
            None => "Success".to_string(),
        }
    }
}

/// State shared between a tool and the response builder for one call
pub struct ToolContext<'a> {
    pub page: &'a mut Page,
    pub tools: &'a ToolRegistry,
    pub expectation: ResolvedExpectation,
    code: Vec<String>,
    attachments: Vec<Attachment>,
    attached_snapshot: Option<Arc<Snapshot>>,
}

impl<'a> ToolContext<'a> {
    pub fn new(page: &'a mut Page, tools: &'a ToolRegistry, expectation: ResolvedExpectation) -> Self {
        Self {
            page,
            tools,
            expectation,
            code: Vec::new(),
            attachments: Vec::new(),
            attached_snapshot: None,
        }
    }

    pub fn should_include(&self, section: Section) -> bool {
        expectation::should_include(&self.expectation, section)
    }

    /// Record an equivalent automation code line; skipped when code is not wanted
    pub fn add_code(&mut self, line: impl Into<String>) {
        if self.should_include(Section::Code) {
            self.code.push(line.into());
        }
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Use `snapshot` as the response's page state instead of capturing a new one
    pub fn attach_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        self.attached_snapshot = Some(snapshot);
    }

    /// Capture the page before an action that may navigate away
    ///
    /// Only runs when the response will carry a snapshot. A failed capture is
    /// logged and leaves the post-action capture to the response builder.
    pub async fn capture_pre_action_snapshot(&mut self) {
        if !self.should_include(Section::Snapshot) {
            return;
        }
        match self.page.capture().await {
            Ok(snapshot) => self.attached_snapshot = Some(snapshot),
            Err(e) => log::warn!("Pre-action snapshot failed: {}", e),
        }
    }

    /// Drop a pre-action snapshot so the response captures the page afresh
    pub fn discard_attached_snapshot(&mut self) {
        self.attached_snapshot = None;
    }

    pub fn code(&self) -> &[String] {
        &self.code
    }
}

/// A browser automation tool with typed parameters
#[async_trait]
pub trait Tool: Send + Sync {
    type Params: DeserializeOwned + JsonSchema + Send;

    /// Registry name of the tool
    fn name(&self) -> &str;

    /// JSON schema of the parameters
    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(Self::Params)).unwrap_or(Value::Null)
    }

    async fn execute_typed(&self, params: Self::Params, context: &mut ToolContext<'_>) -> Result<ToolResult>;
}

/// Type-erased [`Tool`] taking JSON parameters
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    async fn execute(&self, params: Value, context: &mut ToolContext<'_>) -> Result<ToolResult>;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn parameters_schema(&self) -> Value {
        Tool::parameters_schema(self)
    }

    async fn execute(&self, params: Value, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };
        let typed: T::Params = serde_json::from_value(params).map_err(|e| {
            BrowserError::InvalidArgument(format!("Invalid parameters for '{}': {}", Tool::name(self), e))
        })?;
        self.execute_typed(typed, context).await
    }
}

/// Tools by name, in registration order
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn DynTool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: IndexMap::new() }
    }

    /// Registry with every built-in tool
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(NavigateTool);
        registry.register(NavigateBackTool);
        registry.register(NavigateForwardTool);
        registry.register(ClickTool);
        registry.register(HoverTool);
        registry.register(TypeTool);
        registry.register(SelectOptionTool);
        registry.register(PressKeyTool);
        registry.register(SnapshotTool);
        registry.register(ScreenshotTool);
        registry.register(EvaluateTool);
        registry.register(WaitForTool);
        registry.register(TabListTool);
        registry.register(ConsoleMessagesTool);
        registry.register(BatchExecuteTool);
        registry.register(DiagnoseTool);
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = Tool::name(&tool).to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynTool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn list_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Run `name` outside a batch
    pub async fn execute(&self, name: &str, params: Value, page: &mut Page) -> ToolResponse {
        self.execute_with(name, params, page, None).await
    }

    /// Run `name`, layering `batch_global` under the call's own expectation
    ///
    /// Never fails: every error ends up in a response with `isError` set.
    pub async fn execute_with(
        &self,
        name: &str,
        params: Value,
        page: &mut Page,
        batch_global: Option<&ExpectationConfig>,
    ) -> ToolResponse {
        let Some(tool) = self.tools.get(name).cloned() else {
            return ToolResponse::from_error(&BrowserError::UnknownTool(name.to_string()));
        };

        let (params, per_call) = match split_expectation(params) {
            Ok(split) => split,
            Err(e) => return ToolResponse::from_error(&e),
        };
        let resolved = expectation::resolve(name, per_call.as_ref(), batch_global);

        let mut context = ToolContext::new(page, self, resolved);
        match tool.execute(params, &mut context).await {
            Ok(result) if result.success => response::build(result, context).await,
            Ok(result) => {
                log::debug!("Tool '{}' reported failure: {}", name, result.render());
                ToolResponse::error_text(result.render())
            }
            Err(e) => {
                log::debug!("Tool '{}' failed: {}", name, e);
                ToolResponse::from_error(&e)
            }
        }
    }
}

/// Pull the optional `expectation` key out of a parameter object
fn split_expectation(params: Value) -> Result<(Value, Option<ExpectationConfig>)> {
    let Value::Object(mut map) = params else {
        return Ok((params, None));
    };
    let expectation = match map.remove("expectation") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            serde_json::from_value(raw)
                .map_err(|e| BrowserError::InvalidArgument(format!("Invalid expectation: {}", e)))?,
        ),
    };
    Ok((Value::Object(map), expectation))
}
