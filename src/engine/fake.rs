//! In-memory engine for tests and offline runs.
//!
//! The page is a scripted set of frames and accessibility trees. Tests mutate
//! it between tool calls to simulate navigation, detachment and hung probes.

use crate::dom::ElementDescription;
use crate::engine::{
    AxNode, BrowserEngine, ConsoleMessage, DownloadInfo, ElementAction, ElementHandle, FrameId,
    FrameInfo, PageInfo, TabInfo,
};
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct FakeFrame {
    info: FrameInfo,
    tree: Vec<AxNode>,
    detached: bool,
    hung: bool,
    unreadable: bool,
}

#[derive(Debug, Clone)]
struct FakePage {
    title: String,
    tree: Vec<AxNode>,
}

#[derive(Debug, Default)]
struct FakeState {
    url: String,
    title: String,
    frames: IndexMap<FrameId, FakeFrame>,
    pages: HashMap<String, FakePage>,
    history: Vec<String>,
    elements: HashMap<ElementHandle, ElementDescription>,
    dead_elements: HashSet<ElementHandle>,
    failing_elements: HashMap<ElementHandle, String>,
    match_counts: HashMap<(FrameId, String), usize>,
    unique: HashMap<(FrameId, String), ElementHandle>,
    key_navigations: HashMap<String, String>,
    focus_submits: bool,
    invalid_selectors: HashSet<String>,
    evaluations: HashMap<String, serde_json::Value>,
    actions: Vec<(ElementHandle, ElementAction)>,
    keys: Vec<String>,
    console: Vec<ConsoleMessage>,
    tabs: Vec<TabInfo>,
    downloads: Vec<DownloadInfo>,
    modal: Option<String>,
    screenshot: Vec<u8>,
    tree_reads: usize,
}

/// Scriptable [`BrowserEngine`] with no browser behind it
#[derive(Debug)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    /// Blank page with only a main frame
    pub fn new() -> Self {
        let mut state = FakeState {
            url: "about:blank".to_string(),
            ..Default::default()
        };
        state.frames.insert(
            FrameId::main(),
            FakeFrame {
                info: FrameInfo {
                    url: "about:blank".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        Self { state: Mutex::new(state) }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the current URL and title without touching the tree
    pub fn set_page(&self, url: &str, title: &str) {
        let mut state = self.state();
        state.url = url.to_string();
        state.title = title.to_string();
        if let Some(main) = state.frames.get_mut(&FrameId::main()) {
            main.info.url = url.to_string();
        }
    }

    pub fn set_main_tree(&self, tree: Vec<AxNode>) {
        if let Some(main) = self.state().frames.get_mut(&FrameId::main()) {
            main.tree = tree;
        }
    }

    /// Register a nested frame and its accessibility tree
    pub fn add_frame(&self, id: FrameId, info: FrameInfo, tree: Vec<AxNode>) {
        self.state().frames.insert(id, FakeFrame { info, tree, ..Default::default() });
    }

    pub fn set_frame_tree(&self, id: &FrameId, tree: Vec<AxNode>) {
        if let Some(frame) = self.state().frames.get_mut(id) {
            frame.tree = tree;
        }
    }

    /// Detach a frame: probes fail and its elements die
    pub fn detach_frame(&self, id: &FrameId) {
        let mut state = self.state();
        if let Some(frame) = state.frames.get_mut(id) {
            frame.detached = true;
        }
        let dead: Vec<ElementHandle> = state.elements.keys().filter(|h| &h.frame == id).cloned().collect();
        state.dead_elements.extend(dead);
    }

    /// Probes of this frame never answer
    pub fn hang_frame(&self, id: &FrameId) {
        if let Some(frame) = self.state().frames.get_mut(id) {
            frame.hung = true;
        }
    }

    /// Reading this frame's accessibility tree fails, while probes still succeed
    pub fn fail_frame_reads(&self, id: &FrameId) {
        if let Some(frame) = self.state().frames.get_mut(id) {
            frame.unreadable = true;
        }
    }

    pub fn add_element(&self, handle: ElementHandle, description: ElementDescription) {
        self.state().elements.insert(handle, description);
    }

    /// Remove an element from the document
    pub fn kill_element(&self, handle: &ElementHandle) {
        self.state().dead_elements.insert(handle.clone());
    }

    pub fn set_match_count(&self, frame: &FrameId, selector: &str, count: usize) {
        self.state().match_counts.insert((frame.clone(), selector.to_string()), count);
    }

    /// Make `selector` match exactly `handle`
    pub fn set_unique(&self, frame: &FrameId, selector: &str, handle: ElementHandle) {
        let mut state = self.state();
        state.match_counts.insert((frame.clone(), selector.to_string()), 1);
        state.unique.insert((frame.clone(), selector.to_string()), handle);
    }

    /// Actions on `handle` fail with `reason`
    pub fn fail_actions_on(&self, handle: &ElementHandle, reason: &str) {
        self.state().failing_elements.insert(handle.clone(), reason.to_string());
    }

    /// Register a page that `navigate(url)` switches to
    pub fn add_page(&self, url: &str, title: &str, tree: Vec<AxNode>) {
        self.state().pages.insert(
            url.to_string(),
            FakePage { title: title.to_string(), tree },
        );
    }

    /// Pressing `key` navigates to `url`
    pub fn navigate_on_key(&self, key: &str, url: &str) {
        self.state().key_navigations.insert(key.to_string(), url.to_string());
    }

    /// Report the focused element as a form field or link
    pub fn set_focus_submits(&self, submits: bool) {
        self.state().focus_submits = submits;
    }

    /// `count_matches` rejects `selector` as a syntax error
    pub fn reject_selector(&self, selector: &str) {
        self.state().invalid_selectors.insert(selector.to_string());
    }

    pub fn set_evaluation(&self, script: &str, value: serde_json::Value) {
        self.state().evaluations.insert(script.to_string(), value);
    }

    pub fn push_console(&self, message: ConsoleMessage) {
        self.state().console.push(message);
    }

    pub fn set_tabs(&self, tabs: Vec<TabInfo>) {
        self.state().tabs = tabs;
    }

    pub fn set_downloads(&self, downloads: Vec<DownloadInfo>) {
        self.state().downloads = downloads;
    }

    pub fn set_modal(&self, modal: Option<String>) {
        self.state().modal = modal;
    }

    pub fn set_screenshot(&self, png: Vec<u8>) {
        self.state().screenshot = png;
    }

    /// Actions performed so far, in order
    pub fn actions(&self) -> Vec<(ElementHandle, ElementAction)> {
        self.state().actions.clone()
    }

    pub fn pressed_keys(&self) -> Vec<String> {
        self.state().keys.clone()
    }

    /// Number of accessibility tree reads served
    pub fn tree_reads(&self) -> usize {
        self.state().tree_reads
    }

    fn load(state: &mut FakeState, url: &str) {
        let page = state.pages.get(url).cloned();
        state.url = url.to_string();
        state.title = page.as_ref().map(|p| p.title.clone()).unwrap_or_default();

        // every element and nested frame of the old document goes away
        let all: Vec<ElementHandle> = state.elements.keys().cloned().collect();
        state.dead_elements.extend(all);
        for (id, frame) in state.frames.iter_mut() {
            if *id == FrameId::main() {
                frame.info.url = url.to_string();
                frame.tree = page.as_ref().map(|p| p.tree.clone()).unwrap_or_default();
            } else {
                frame.detached = true;
            }
        }
    }

    fn live_frame(state: &FakeState, id: &FrameId) -> Result<FakeFrame> {
        match state.frames.get(id) {
            Some(frame) if !frame.detached => Ok(frame.clone()),
            _ => Err(BrowserError::TabOperationFailed(format!("Frame {} is detached", id))),
        }
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn frame_info(&self, frame: &FrameId) -> Result<FrameInfo> {
        let state = self.state();
        Self::live_frame(&state, frame).map(|f| f.info)
    }

    async fn frame_url(&self, frame: &FrameId) -> Result<String> {
        let hung = {
            let state = self.state();
            Self::live_frame(&state, frame)?.hung
        };
        if hung {
            return std::future::pending().await;
        }
        let state = self.state();
        Self::live_frame(&state, frame).map(|f| f.info.url)
    }

    async fn read_accessibility_tree(&self, frame: &FrameId) -> Result<Vec<AxNode>> {
        let mut state = self.state();
        let found = Self::live_frame(&state, frame)?;
        if found.unreadable {
            return Err(BrowserError::EvaluationFailed(format!(
                "Cannot read accessibility tree of frame {}",
                frame
            )));
        }
        state.tree_reads += 1;
        Ok(found.tree)
    }

    async fn count_matches(&self, frame: &FrameId, selector: &str) -> Result<usize> {
        let state = self.state();
        if state.invalid_selectors.contains(selector) {
            return Err(BrowserError::InvalidArgument(format!(
                "'{}' is not a valid selector",
                selector
            )));
        }
        Ok(state
            .match_counts
            .get(&(frame.clone(), selector.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn query_unique(&self, frame: &FrameId, selector: &str) -> Result<Option<ElementHandle>> {
        let state = self.state();
        let key = (frame.clone(), selector.to_string());
        if state.match_counts.get(&key).copied().unwrap_or(0) != 1 {
            return Ok(None);
        }
        Ok(state.unique.get(&key).cloned())
    }

    async fn describe_element(&self, handle: &ElementHandle) -> Result<ElementDescription> {
        let state = self.state();
        if state.dead_elements.contains(handle) {
            return Err(BrowserError::ElementNotFound(format!("{} is detached", handle)));
        }
        state
            .elements
            .get(handle)
            .cloned()
            .ok_or_else(|| BrowserError::ElementNotFound(format!("No element {}", handle)))
    }

    async fn is_element_live(&self, handle: &ElementHandle) -> Result<bool> {
        let state = self.state();
        let frame_live = state.frames.get(&handle.frame).is_some_and(|f| !f.detached);
        Ok(frame_live && !state.dead_elements.contains(handle))
    }

    async fn perform_action(&self, handle: &ElementHandle, action: &ElementAction) -> Result<()> {
        let mut state = self.state();
        if state.dead_elements.contains(handle) {
            return Err(BrowserError::ElementNotFound(format!("{} is detached", handle)));
        }
        if let Some(reason) = state.failing_elements.get(handle) {
            return Err(BrowserError::ToolExecutionFailed {
                tool: action.kind().to_string(),
                reason: reason.clone(),
            });
        }
        state.actions.push((handle.clone(), action.clone()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut state = self.state();
        state.keys.push(key.to_string());
        if let Some(url) = state.key_navigations.get(key).cloned() {
            let previous = state.url.clone();
            state.history.push(previous);
            Self::load(&mut state, &url);
        }
        Ok(())
    }

    async fn focus_submits(&self) -> Result<bool> {
        let state = self.state();
        Ok(state.focus_submits || state.key_navigations.contains_key("Enter"))
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        let previous = state.url.clone();
        state.history.push(previous);
        Self::load(&mut state, url);
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        let mut state = self.state();
        let previous = state
            .history
            .pop()
            .ok_or_else(|| BrowserError::NavigationFailed("No previous page in history".to_string()))?;
        Self::load(&mut state, &previous);
        Ok(())
    }

    async fn go_forward(&self) -> Result<()> {
        Err(BrowserError::NavigationFailed("No next page in history".to_string()))
    }

    async fn evaluate(&self, frame: &FrameId, script: &str) -> Result<serde_json::Value> {
        let state = self.state();
        Self::live_frame(&state, frame)?;
        state
            .evaluations
            .get(script)
            .cloned()
            .ok_or_else(|| BrowserError::EvaluationFailed(format!("Unexpected script: {}", script)))
    }

    async fn evaluate_on_element(&self, handle: &ElementHandle, function: &str) -> Result<serde_json::Value> {
        let state = self.state();
        if state.dead_elements.contains(handle) {
            return Err(BrowserError::ElementNotFound(format!("{} is detached", handle)));
        }
        state
            .evaluations
            .get(function)
            .cloned()
            .ok_or_else(|| BrowserError::EvaluationFailed(format!("Unexpected function: {}", function)))
    }

    async fn page_info(&self) -> Result<PageInfo> {
        let state = self.state();
        Ok(PageInfo { url: state.url.clone(), title: state.title.clone() })
    }

    async fn console_messages(&self) -> Result<Vec<ConsoleMessage>> {
        Ok(self.state().console.clone())
    }

    async fn tabs(&self) -> Result<Vec<TabInfo>> {
        let state = self.state();
        if state.tabs.is_empty() {
            return Ok(vec![TabInfo {
                index: 0,
                url: state.url.clone(),
                title: state.title.clone(),
                active: true,
            }]);
        }
        Ok(state.tabs.clone())
    }

    async fn downloads(&self) -> Result<Vec<DownloadInfo>> {
        Ok(self.state().downloads.clone())
    }

    async fn modal_state(&self) -> Result<Option<String>> {
        Ok(self.state().modal.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let state = self.state();
        if state.screenshot.is_empty() {
            return Err(BrowserError::TabOperationFailed("No screenshot configured".to_string()));
        }
        Ok(state.screenshot.clone())
    }
}
