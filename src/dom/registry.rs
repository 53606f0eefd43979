//! Snapshot capture and reference resolution for one page

use crate::dom::reference::Reference;
use crate::dom::reference_map::ReferenceMap;
use crate::dom::snapshot::{FrameBoundary, FrameContent, FrameSummary, Snapshot, SnapshotNode};
use crate::engine::{AxNode, BrowserEngine, ElementHandle, FrameId};
use crate::error::{BrowserError, Result};
use crate::frames::FrameTracker;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Limits applied while walking a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Nested frames deeper than this are not entered
    pub max_frame_depth: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { max_frame_depth: 8 }
    }
}

/// Owns the snapshot generations and the reference index of one page
pub struct ReferenceRegistry {
    engine: Arc<dyn BrowserEngine>,
    frames: Arc<FrameTracker>,
    config: SnapshotConfig,
    generation: u64,
    current: Option<Arc<Snapshot>>,
    index: ReferenceMap,
    invalidated: bool,
}

impl ReferenceRegistry {
    pub fn new(engine: Arc<dyn BrowserEngine>, frames: Arc<FrameTracker>, config: SnapshotConfig) -> Self {
        Self {
            engine,
            frames,
            config,
            generation: 0,
            current: None,
            index: ReferenceMap::new(),
            invalidated: false,
        }
    }

    /// Generation of the latest capture (0 before the first one)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.clone()
    }

    /// Whether the latest snapshot still describes the page
    pub fn is_current(&self) -> bool {
        self.current.is_some() && !self.invalidated
    }

    pub fn reference_count(&self) -> usize {
        self.index.len()
    }

    /// Capture a new snapshot generation, walking into live child frames
    pub async fn capture(&mut self) -> Result<Arc<Snapshot>> {
        let report = self.frames.cleanup_detached().await?;
        if !report.evicted.is_empty() {
            log::debug!("Evicted {} detached frame(s) before capture", report.evicted.len());
        }

        let main = self.engine.main_frame();
        let main_record = self.frames.track(&main).await?;
        let roots = self.engine.read_accessibility_tree(&main).await?;
        let page = self.engine.page_info().await.unwrap_or_default();

        let generation = self.generation + 1;
        let mut walker = Walker {
            engine: self.engine.as_ref(),
            frames: self.frames.as_ref(),
            max_depth: self.config.max_frame_depth,
            generation,
            ordinals: vec![0],
            index: ReferenceMap::new(),
            summaries: Vec::new(),
        };

        let main_url = main_record.map(|record| record.url).unwrap_or_else(|| page.url.clone());
        let nodes = walker.walk_frame(0, main.clone(), main_url, roots, 0).await;

        let Walker { index, mut summaries, .. } = walker;
        summaries.sort_by_key(|summary| summary.index);

        let snapshot = Arc::new(Snapshot {
            generation,
            url: page.url,
            title: page.title,
            nodes,
            frames: summaries,
        });

        log::debug!(
            "Captured snapshot generation {} ({} nodes, {} references, {} frame(s))",
            generation,
            snapshot.count_nodes(),
            index.len(),
            snapshot.frames.len()
        );

        self.generation = generation;
        self.index = index;
        self.current = Some(snapshot.clone());
        self.invalidated = false;
        Ok(snapshot)
    }

    /// Mark the current generation stale without capturing
    pub fn invalidate(&mut self) {
        if self.current.is_some() && !self.invalidated {
            log::debug!("Snapshot generation {} invalidated", self.generation);
        }
        self.invalidated = true;
        self.index.clear();
    }

    /// Resolve a reference string to a live handle
    pub async fn resolve(&self, raw: &str) -> Result<ElementHandle> {
        let reference: Reference = raw.parse()?;

        if self.current.is_none() {
            return Err(BrowserError::InvalidReference(format!(
                "'{}' cannot be resolved before a snapshot has been captured",
                raw
            )));
        }

        if self.invalidated || reference.generation != self.generation {
            return Err(BrowserError::StaleReference {
                reference: raw.to_string(),
                current: self.generation,
            });
        }

        let handle = self.index.get(&reference).cloned().ok_or_else(|| {
            BrowserError::InvalidReference(format!(
                "'{}' does not exist in snapshot generation {}",
                raw, self.generation
            ))
        })?;

        if self.frames.is_detached(&handle.frame) {
            return Err(BrowserError::DetachedElement(raw.to_string()));
        }

        let probe_timeout = self.frames.config().probe_timeout;
        match tokio::time::timeout(probe_timeout, self.engine.is_element_live(&handle)).await {
            Ok(Ok(true)) => Ok(handle),
            Ok(Ok(false)) | Err(_) => Err(BrowserError::DetachedElement(raw.to_string())),
            Ok(Err(e)) => {
                log::debug!("Liveness check for {} failed: {}", raw, e);
                Err(BrowserError::DetachedElement(raw.to_string()))
            }
        }
    }

    /// Reference minted for `handle` in the current generation, if any
    pub fn reference_for(&self, handle: &ElementHandle) -> Option<Reference> {
        if self.invalidated {
            return None;
        }
        self.index.find_by_handle(handle)
    }
}

struct Walker<'a> {
    engine: &'a dyn BrowserEngine,
    frames: &'a FrameTracker,
    max_depth: usize,
    generation: u64,
    ordinals: Vec<usize>,
    index: ReferenceMap,
    summaries: Vec<FrameSummary>,
}

impl<'a> Walker<'a> {
    fn walk_frame<'w>(
        &'w mut self,
        frame_index: usize,
        frame: FrameId,
        url: String,
        roots: Vec<AxNode>,
        depth: usize,
    ) -> BoxFuture<'w, Vec<SnapshotNode>> {
        Box::pin(async move {
            let before = self.index.count_in_frame(frame_index);
            let mut nodes = Vec::with_capacity(roots.len());
            for root in roots {
                nodes.push(self.convert(frame_index, root, depth).await);
            }

            let node_count: usize = nodes.iter().map(own_frame_nodes).sum();
            self.frames.record_element_count(&frame, node_count);
            self.summaries.push(FrameSummary {
                index: frame_index,
                frame_id: frame,
                url,
                node_count,
                reference_count: self.index.count_in_frame(frame_index) - before,
            });
            nodes
        })
    }

    fn convert<'w>(&'w mut self, frame_index: usize, node: AxNode, depth: usize) -> BoxFuture<'w, SnapshotNode> {
        Box::pin(async move {
            let AxNode { role, name, handle, states, children, child_frame } = node;

            let mut converted = SnapshotNode::new(role, name);
            converted.states = states;

            // pre-order: the node takes its ordinal before its children
            if let Some(handle) = handle {
                self.ordinals[frame_index] += 1;
                let reference = Reference::new(frame_index, self.generation, self.ordinals[frame_index]);
                self.index.insert(reference, handle);
                converted.reference = Some(reference);
            }

            for child in children {
                let child = self.convert(frame_index, child, depth).await;
                converted.children.push(child);
            }

            if let Some(child_frame) = child_frame {
                converted.frame = Some(self.enter_frame(child_frame, depth + 1).await);
            }

            converted
        })
    }

    async fn enter_frame(&mut self, frame: FrameId, depth: usize) -> FrameBoundary {
        let mut boundary = FrameBoundary {
            index: None,
            frame_id: frame.clone(),
            url: String::new(),
            name: None,
            content: FrameContent::Detached,
        };

        if depth > self.max_depth {
            boundary.content = FrameContent::Failed(format!("frame depth limit {} reached", self.max_depth));
            return boundary;
        }

        if self.frames.is_detached(&frame) {
            log::debug!("Skipping detached frame {}", frame);
            return boundary;
        }

        let record = match self.frames.track(&frame).await {
            Ok(Some(record)) => record,
            Ok(None) => return boundary,
            Err(e) => {
                boundary.content = FrameContent::Failed(e.to_string());
                return boundary;
            }
        };

        boundary.url = record.url.clone();
        boundary.name = record.name.clone();

        match self.engine.read_accessibility_tree(&frame).await {
            Ok(roots) => {
                let frame_index = self.ordinals.len();
                self.ordinals.push(0);
                boundary.index = Some(frame_index);

                let nodes = self.walk_frame(frame_index, frame, record.url, roots, depth).await;
                boundary.content = FrameContent::Captured(nodes);
            }
            Err(e) => {
                log::warn!("Failed to capture frame {} ({}): {}", frame, record.url, e);
                boundary.content = FrameContent::Failed(e.to_string());
            }
        }

        boundary
    }
}

/// Node count of a subtree, not counting nested frames
fn own_frame_nodes(node: &SnapshotNode) -> usize {
    1 + node.children.iter().map(own_frame_nodes).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::snapshot::SnapshotFormat;
    use crate::engine::{FakeEngine, FrameInfo};
    use crate::frames::FrameTrackerConfig;

    fn main_handle(id: &str) -> ElementHandle {
        ElementHandle::new(FrameId::main(), id)
    }

    fn setup() -> (Arc<FakeEngine>, ReferenceRegistry) {
        let engine = Arc::new(FakeEngine::new());
        engine.set_page("https://example.com/", "Example");
        engine.set_main_tree(vec![
            AxNode::new("heading", "Welcome"),
            AxNode::new("button", "Sign in").with_handle(main_handle("b1")),
            AxNode::new("iframe", "Widget")
                .with_handle(main_handle("f1"))
                .with_child_frame(FrameId::new("widget")),
            AxNode::new("link", "Help").with_handle(main_handle("l1")),
        ]);
        engine.add_frame(
            FrameId::new("widget"),
            FrameInfo {
                url: "https://widget.example.com/".to_string(),
                name: Some("widget".to_string()),
                parent: Some(FrameId::main()),
            },
            vec![AxNode::new("textbox", "Email").with_handle(ElementHandle::new(FrameId::new("widget"), "t1"))],
        );

        let tracker = Arc::new(FrameTracker::new(engine.clone(), FrameTrackerConfig::default()));
        let registry = ReferenceRegistry::new(engine.clone(), tracker, SnapshotConfig::default());
        (engine, registry)
    }

    #[tokio::test]
    async fn test_capture_assigns_references_in_walk_order() {
        let (_engine, mut registry) = setup();
        let snapshot = registry.capture().await.unwrap();

        let refs: Vec<String> = snapshot.references().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["f0s1e1", "f0s1e2", "f1s1e1", "f0s1e3"]);
        assert_eq!(snapshot.frames.len(), 2);
        assert_eq!(snapshot.frames[1].url, "https://widget.example.com/");
        assert_eq!(registry.reference_count(), 4);
    }

    #[tokio::test]
    async fn test_unchanged_dom_gets_identical_references() {
        let (_engine, mut registry) = setup();
        let first = registry.capture().await.unwrap();
        let second = registry.capture().await.unwrap();

        let positions = |snapshot: &Snapshot| -> Vec<(usize, usize)> {
            snapshot.references().iter().map(|r| (r.frame, r.ordinal)).collect()
        };
        assert_eq!(positions(&first), positions(&second));
        assert_eq!(positions(&second), vec![(0, 1), (0, 2), (1, 1), (0, 3)]);
        assert_eq!(
            first.render(SnapshotFormat::Outline).unwrap().replace("s1e", "s2e"),
            second.render(SnapshotFormat::Outline).unwrap()
        );

        let widget = ElementHandle::new(FrameId::new("widget"), "t1");
        assert_eq!(registry.resolve("f1s2e1").await.unwrap(), widget);
        assert_eq!(registry.reference_for(&widget).map(|r| r.to_string()).as_deref(), Some("f1s2e1"));
    }

    #[tokio::test]
    async fn test_resolve_current_reference() {
        let (_engine, mut registry) = setup();
        registry.capture().await.unwrap();

        let handle = registry.resolve("f1s1e1").await.unwrap();
        assert_eq!(handle, ElementHandle::new(FrameId::new("widget"), "t1"));
    }

    #[tokio::test]
    async fn test_stale_generation_is_rejected() {
        let (_engine, mut registry) = setup();
        registry.capture().await.unwrap();
        registry.capture().await.unwrap();

        let err = registry.resolve("f0s1e1").await.unwrap_err();
        assert!(matches!(err, BrowserError::StaleReference { current: 2, .. }));
        assert!(registry.resolve("f0s2e1").await.is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_makes_references_stale() {
        let (_engine, mut registry) = setup();
        registry.capture().await.unwrap();
        registry.invalidate();

        assert!(!registry.is_current());
        let err = registry.resolve("f0s1e1").await.unwrap_err();
        assert!(matches!(err, BrowserError::StaleReference { .. }));
    }

    #[tokio::test]
    async fn test_dead_element_is_detached() {
        let (engine, mut registry) = setup();
        registry.capture().await.unwrap();
        engine.kill_element(&main_handle("b1"));

        let err = registry.resolve("f0s1e1").await.unwrap_err();
        assert!(matches!(err, BrowserError::DetachedElement(_)));
    }

    #[tokio::test]
    async fn test_unknown_and_premature_references() {
        let (_engine, mut registry) = setup();
        assert!(matches!(
            registry.resolve("f0s1e1").await,
            Err(BrowserError::InvalidReference(_))
        ));

        registry.capture().await.unwrap();
        assert!(matches!(
            registry.resolve("f0s1e99").await,
            Err(BrowserError::InvalidReference(_))
        ));
        assert!(matches!(registry.resolve("e5").await, Err(BrowserError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn test_failed_frame_does_not_abort_capture() {
        let (engine, mut registry) = setup();
        engine.fail_frame_reads(&FrameId::new("widget"));

        let snapshot = registry.capture().await.unwrap();
        let refs: Vec<String> = snapshot.references().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["f0s1e1", "f0s1e2", "f0s1e3"]);

        let outline = snapshot.render(crate::dom::SnapshotFormat::Outline).unwrap();
        assert!(outline.contains("- link \"Help\" [ref=f0s1e3]"));
        assert!(!outline.contains("- frame"));
    }

    #[tokio::test]
    async fn test_detached_frame_is_skipped() {
        let (engine, mut registry) = setup();
        registry.capture().await.unwrap();
        engine.detach_frame(&FrameId::new("widget"));

        let snapshot = registry.capture().await.unwrap();
        assert_eq!(snapshot.frames.len(), 1);
        assert!(matches!(
            registry.resolve("f1s2e1").await,
            Err(BrowserError::InvalidReference(_))
        ));
        assert!(matches!(
            registry.resolve("f1s1e1").await,
            Err(BrowserError::StaleReference { current: 2, .. })
        ));
    }
}
