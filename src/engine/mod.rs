//! Browser engine seam
//!
//! Everything the automation layer needs from the browser goes through the
//! [`BrowserEngine`] trait. [`ChromeEngine`] drives a real Chrome through
//! `headless_chrome`; [`FakeEngine`] is an in-memory page used by the tests.

pub mod chrome;
pub mod fake;

pub use chrome::ChromeEngine;
pub use fake::FakeEngine;

use crate::dom::ElementDescription;
use crate::error::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-issued identity of a frame (main document or nested iframe)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub String);

impl FrameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn main() -> Self {
        Self("main".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live handle to one element inside one frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Frame whose document owns the element
    pub frame: FrameId,

    /// Engine-side handle id
    pub id: String,
}

impl ElementHandle {
    pub fn new(frame: FrameId, id: impl Into<String>) -> Self {
        Self { frame, id: id.into() }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.frame, self.id)
    }
}

/// Metadata read from a live frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInfo {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub parent: Option<FrameId>,
}

/// One node of an engine accessibility tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxNode {
    /// Semantic role (button, link, textbox, ...)
    pub role: String,

    /// Accessible name
    #[serde(default)]
    pub name: String,

    /// Handle of the backing element, if the node is addressable
    #[serde(default)]
    pub handle: Option<ElementHandle>,

    /// State flags such as `checked` or `level=2`
    #[serde(default)]
    pub states: Vec<String>,

    #[serde(default)]
    pub children: Vec<AxNode>,

    /// Set on iframe nodes: the nested frame to descend into
    #[serde(default)]
    pub child_frame: Option<FrameId>,
}

impl AxNode {
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_handle(mut self, handle: ElementHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.states.push(state.into());
        self
    }

    pub fn with_children(mut self, children: Vec<AxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child_frame(mut self, frame: FrameId) -> Self {
        self.child_frame = Some(frame);
        self
    }
}

/// DOM action delegated to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementAction {
    Click {
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        double: bool,
    },
    Hover,
    Focus,
    /// Type text key by key, appending to the current value
    Type { text: String },
    /// Replace the current value in one step
    Fill { text: String },
    SelectOption { values: Vec<String> },
}

impl ElementAction {
    pub fn kind(&self) -> &'static str {
        match self {
            ElementAction::Click { double: true, .. } => "double_click",
            ElementAction::Click { .. } => "click",
            ElementAction::Hover => "hover",
            ElementAction::Focus => "focus",
            ElementAction::Type { .. } => "type",
            ElementAction::Fill { .. } => "fill",
            ElementAction::SelectOption { .. } => "select_option",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Console severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warning,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub const ALL: [ConsoleLevel; 5] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Warning,
        ConsoleLevel::Error,
        ConsoleLevel::Debug,
    ];

    /// Map a console API method name (`warn`, `error`, ...) to a level
    pub fn from_method(method: &str) -> Self {
        match method {
            "info" => ConsoleLevel::Info,
            "warn" | "warning" => ConsoleLevel::Warning,
            "error" | "assert" => ConsoleLevel::Error,
            "debug" | "trace" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Log,
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warning => "warning",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub text: String,
}

impl ConsoleMessage {
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self { level, text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub index: usize,
    pub url: String,
    pub title: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub url: String,
    pub file_name: String,
    pub finished: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

/// Interface of the external browser-automation collaborator
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Id of the top-level frame
    fn main_frame(&self) -> FrameId {
        FrameId::main()
    }

    async fn frame_info(&self, frame: &FrameId) -> Result<FrameInfo>;

    /// Liveness probe: reads the frame's current URL. Callers bound it with a timeout.
    async fn frame_url(&self, frame: &FrameId) -> Result<String>;

    async fn read_accessibility_tree(&self, frame: &FrameId) -> Result<Vec<AxNode>>;

    /// Number of elements in the frame's document matching `selector`
    async fn count_matches(&self, frame: &FrameId, selector: &str) -> Result<usize>;

    /// Handle of the single element matching `selector`, or `None` when zero or several match
    async fn query_unique(&self, frame: &FrameId, selector: &str) -> Result<Option<ElementHandle>>;

    async fn describe_element(&self, handle: &ElementHandle) -> Result<ElementDescription>;

    async fn is_element_live(&self, handle: &ElementHandle) -> Result<bool>;

    async fn perform_action(&self, handle: &ElementHandle, action: &ElementAction) -> Result<()>;

    /// Press a key on whatever element has focus
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Whether Enter on the focused element submits a form or follows a link
    async fn focus_submits(&self) -> Result<bool>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn go_back(&self) -> Result<()>;

    async fn go_forward(&self) -> Result<()>;

    async fn evaluate(&self, frame: &FrameId, script: &str) -> Result<serde_json::Value>;

    /// Call `function` (JavaScript function source) with the element as its argument
    async fn evaluate_on_element(&self, handle: &ElementHandle, function: &str) -> Result<serde_json::Value>;

    async fn page_info(&self) -> Result<PageInfo>;

    async fn console_messages(&self) -> Result<Vec<ConsoleMessage>>;

    async fn tabs(&self) -> Result<Vec<TabInfo>>;

    async fn downloads(&self) -> Result<Vec<DownloadInfo>> {
        Ok(Vec::new())
    }

    /// Description of an open modal dialog, if any
    async fn modal_state(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind() {
        assert_eq!(ElementAction::Click { button: MouseButton::Left, double: false }.kind(), "click");
        assert_eq!(ElementAction::Click { button: MouseButton::Left, double: true }.kind(), "double_click");
        assert_eq!(ElementAction::SelectOption { values: vec![] }.kind(), "select_option");
    }

    #[test]
    fn test_console_level_from_method() {
        assert_eq!(ConsoleLevel::from_method("warn"), ConsoleLevel::Warning);
        assert_eq!(ConsoleLevel::from_method("error"), ConsoleLevel::Error);
        assert_eq!(ConsoleLevel::from_method("log"), ConsoleLevel::Log);
        assert_eq!(ConsoleLevel::from_method("whatever"), ConsoleLevel::Log);
    }

    #[test]
    fn test_ax_node_deserialization() {
        let json = r#"{"role":"button","name":"Go","handle":{"frame":"main","id":"7"}}"#;
        let node: AxNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.role, "button");
        assert_eq!(node.handle, Some(ElementHandle::new(FrameId::main(), "7")));
        assert!(node.children.is_empty());
        assert!(node.child_frame.is_none());
    }
}
