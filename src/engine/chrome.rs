//! [`BrowserEngine`] over a real Chrome driven by `headless_chrome`.
//!
//! DOM work runs inside the page through a small agent script
//! (`page_agent.js`) that is injected on demand. Every call returns a JSON
//! string which is decoded here. `headless_chrome` is blocking, so each call
//! runs on the blocking thread pool.

use crate::browser::{BrowserSession, ConnectionOptions, LaunchOptions};
use crate::dom::ElementDescription;
use crate::engine::{
    AxNode, BrowserEngine, ConsoleLevel, ConsoleMessage, ElementAction, ElementHandle, FrameId, FrameInfo,
    PageInfo, TabInfo,
};
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use headless_chrome::Tab;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

const PAGE_AGENT_JS: &str = include_str!("page_agent.js");

/// Chrome-backed engine; one session, actions go to its active tab
pub struct ChromeEngine {
    session: Arc<BrowserSession>,
}

#[derive(Debug, Deserialize)]
struct AgentReply {
    #[serde(default)]
    ok: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentConsoleEntry {
    method: String,
    text: String,
}

impl ChromeEngine {
    pub fn new(session: BrowserSession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    pub fn launch(options: LaunchOptions) -> Result<Self> {
        Ok(Self::new(BrowserSession::launch(options)?))
    }

    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        Ok(Self::new(BrowserSession::connect(options)?))
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    /// Run blocking `headless_chrome` work off the async runtime
    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&BrowserSession) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || work(&session))
            .await
            .map_err(|e| BrowserError::TabOperationFailed(format!("Browser task failed: {}", e)))?
    }

    /// Call a page agent function on the active tab and decode its result
    async fn agent<T>(&self, function: &'static str, args: Value) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.blocking(move |session| {
            let tab = session.tab()?;
            invoke_agent(&tab, function, &args)
        })
        .await
    }
}

fn invoke_agent<T: DeserializeOwned>(tab: &Arc<Tab>, function: &str, args: &Value) -> Result<T> {
    let script = format!(
        "(function() {{\n{}\nreturn window.__browserUse.invoke({}, {});\n}})()",
        PAGE_AGENT_JS,
        json!(function),
        args
    );

    let result = tab
        .evaluate(&script, true)
        .map_err(|e| BrowserError::EvaluationFailed(format!("Failed to run page agent '{}': {}", function, e)))?;

    let json_value = result
        .value
        .ok_or_else(|| BrowserError::EvaluationFailed(format!("Page agent '{}' returned no value", function)))?;

    // The agent returns a JSON string, so parse it as a string first
    let json_str: String = serde_json::from_value(json_value)
        .map_err(|e| BrowserError::EvaluationFailed(format!("Page agent '{}' returned a non-string: {}", function, e)))?;

    let reply: AgentReply = serde_json::from_str(&json_str)
        .map_err(|e| BrowserError::EvaluationFailed(format!("Failed to parse page agent reply: {}", e)))?;

    if let Some(error) = reply.error {
        return Err(BrowserError::EvaluationFailed(error));
    }

    serde_json::from_value(reply.ok)
        .map_err(|e| BrowserError::EvaluationFailed(format!("Unexpected page agent '{}' result: {}", function, e)))
}

fn chrome_error(context: &'static str) -> impl FnOnce(anyhow::Error) -> BrowserError {
    move |e| BrowserError::TabOperationFailed(format!("{}: {}", context, e))
}

#[async_trait]
impl BrowserEngine for ChromeEngine {
    async fn frame_info(&self, frame: &FrameId) -> Result<FrameInfo> {
        self.agent("frameInfo", json!([frame])).await
    }

    async fn frame_url(&self, frame: &FrameId) -> Result<String> {
        self.agent("frameUrl", json!([frame])).await
    }

    async fn read_accessibility_tree(&self, frame: &FrameId) -> Result<Vec<AxNode>> {
        self.agent("snapshot", json!([frame])).await
    }

    async fn count_matches(&self, frame: &FrameId, selector: &str) -> Result<usize> {
        self.agent("count", json!([frame, selector])).await
    }

    async fn query_unique(&self, frame: &FrameId, selector: &str) -> Result<Option<ElementHandle>> {
        self.agent("queryUnique", json!([frame, selector])).await
    }

    async fn describe_element(&self, handle: &ElementHandle) -> Result<ElementDescription> {
        self.agent("describe", json!([handle]))
            .await
            .map_err(|e| BrowserError::ElementNotFound(e.to_string()))
    }

    async fn is_element_live(&self, handle: &ElementHandle) -> Result<bool> {
        self.agent("isLive", json!([handle])).await
    }

    async fn perform_action(&self, handle: &ElementHandle, action: &ElementAction) -> Result<()> {
        let kind = action.kind();
        let _: Value = self
            .agent("act", json!([handle, action]))
            .await
            .map_err(|e| BrowserError::ToolExecutionFailed {
                tool: kind.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |session| {
            let tab = session.tab()?;
            tab.press_key(&key).map_err(|e| BrowserError::ToolExecutionFailed {
                tool: "press_key".to_string(),
                reason: e.to_string(),
            })?;
            Ok(())
        })
        .await
    }

    async fn focus_submits(&self) -> Result<bool> {
        self.agent("focusSubmits", json!([])).await
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.blocking(move |session| session.navigate(&url)).await
    }

    async fn go_back(&self) -> Result<()> {
        self.blocking(|session| session.go_back()).await
    }

    async fn go_forward(&self) -> Result<()> {
        self.blocking(|session| session.go_forward()).await
    }

    async fn evaluate(&self, frame: &FrameId, script: &str) -> Result<Value> {
        self.agent("evaluate", json!([frame, script])).await
    }

    async fn evaluate_on_element(&self, handle: &ElementHandle, function: &str) -> Result<Value> {
        self.agent("evaluateOn", json!([handle, function])).await
    }

    async fn page_info(&self) -> Result<PageInfo> {
        self.blocking(|session| {
            let tab = session.tab()?;
            let title = tab.get_title().map_err(chrome_error("Failed to read title"))?;
            Ok(PageInfo { url: tab.get_url(), title })
        })
        .await
    }

    async fn console_messages(&self) -> Result<Vec<ConsoleMessage>> {
        let entries: Vec<AgentConsoleEntry> = self.agent("consoleMessages", json!([])).await?;
        Ok(entries
            .into_iter()
            .map(|entry| ConsoleMessage::new(ConsoleLevel::from_method(&entry.method), entry.text))
            .collect())
    }

    async fn tabs(&self) -> Result<Vec<TabInfo>> {
        self.blocking(|session| {
            let active = session.tab()?;
            let tabs = session.get_tabs()?;
            Ok(tabs
                .iter()
                .enumerate()
                .map(|(index, tab)| TabInfo {
                    index,
                    url: tab.get_url(),
                    title: tab.get_title().unwrap_or_default(),
                    active: Arc::ptr_eq(tab, &active),
                })
                .collect())
        })
        .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.blocking(|session| {
            let tab = session.tab()?;
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(chrome_error("Failed to capture screenshot"))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_reply_parsing() {
        let reply: AgentReply = serde_json::from_str(r#"{"ok": [{"role": "button", "name": "Go"}]}"#).unwrap();
        assert!(reply.error.is_none());
        let nodes: Vec<AxNode> = serde_json::from_value(reply.ok).unwrap();
        assert_eq!(nodes[0].role, "button");

        let reply: AgentReply = serde_json::from_str(r#"{"error": "Frame frame-1 is detached"}"#).unwrap();
        assert_eq!(reply.error.as_deref(), Some("Frame frame-1 is detached"));
    }

    #[test]
    fn test_page_agent_exposes_invoke() {
        assert!(PAGE_AGENT_JS.contains("window.__browserUse"));
        assert!(PAGE_AGENT_JS.contains("invoke(name, args)"));
    }

    #[tokio::test]
    #[ignore] // requires Chrome
    async fn test_chrome_snapshot_of_blank_page() {
        let engine = ChromeEngine::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
        engine.navigate("about:blank").await.unwrap();

        let tree = engine.read_accessibility_tree(&FrameId::main()).await.unwrap();
        assert!(tree.is_empty());
    }
}
