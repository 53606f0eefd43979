use crate::browser::LaunchOptions;
use crate::config::ServerConfig;
use crate::engine::BrowserEngine;
use crate::error::Result as BrowserResult;
use crate::page::Page;
use crate::tools::{ToolRegistry, ToolResponse};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool_handler};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// MCP server exposing one automated page
///
/// Tool calls are serialized on the page lock, so references minted by one
/// call are never invalidated halfway through another.
#[derive(Clone)]
pub struct BrowserServer {
    page: Arc<Mutex<Page>>,
    tools: Arc<ToolRegistry>,
    pub(crate) tool_router: ToolRouter<Self>,
}

impl BrowserServer {
    /// Launch a browser with `options` and default settings otherwise
    pub fn with_options(options: LaunchOptions) -> BrowserResult<Self> {
        Self::with_config(&ServerConfig::new().with_launch(options))
    }

    /// Launch or connect to a browser as `config` describes
    pub fn with_config(config: &ServerConfig) -> BrowserResult<Self> {
        let engine = config.create_engine()?;
        Ok(Self::with_engine(engine, config))
    }

    /// Serve an already running engine
    pub fn with_engine(engine: Arc<dyn BrowserEngine>, config: &ServerConfig) -> Self {
        Self {
            page: Arc::new(Mutex::new(Page::new(engine, config))),
            tools: Arc::new(ToolRegistry::with_defaults()),
            tool_router: Self::tool_router(),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run `name` with MCP arguments and convert the shaped response
    pub(crate) async fn call(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let mut page = self.page.lock().await;
        let response = self.tools.execute(name, arguments, &mut page).await;
        drop(page);

        if response.is_error {
            log::debug!("Tool {} returned an error: {:?}", name, response.result);
        }
        Ok(into_call_result(response))
    }

    /// Stop background frame tracking
    pub async fn shutdown(&self) -> BrowserResult<()> {
        self.page.lock().await.dispose().await
    }
}

fn into_call_result(response: ToolResponse) -> CallToolResult {
    let mut content = vec![Content::text(response.to_markdown())];
    for attachment in &response.attachments {
        content.push(Content::image(attachment.data.clone(), attachment.mime_type.clone()));
    }

    if response.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

#[tool_handler]
impl ServerHandler for BrowserServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Browser automation. Call browser_snapshot to get element references like f0s1e3, \
                 then pass them as `ref` to browser_click, browser_type and friends. References are \
                 tied to one snapshot generation: after a navigation or a new snapshot, take the \
                 references from the latest snapshot. Every tool accepts an optional `expectation` \
                 object choosing which page state sections come back."
                    .to_string(),
            ),
        }
    }
}
