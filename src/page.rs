use crate::config::ServerConfig;
use crate::dom::{ReferenceRegistry, SelectorSynthesizer, Snapshot};
use crate::engine::{BrowserEngine, ElementHandle};
use crate::error::Result;
use crate::frames::FrameTracker;
use std::sync::Arc;

/// One automated page: the engine plus its tracker, registry and synthesizer
///
/// The registry and tracker are owned here and mutated only through
/// [`capture`](Page::capture), [`invalidate`](Page::invalidate) and the
/// tracker's own operations.
pub struct Page {
    engine: Arc<dyn BrowserEngine>,
    frames: Arc<FrameTracker>,
    registry: ReferenceRegistry,
    selectors: SelectorSynthesizer,
}

impl Page {
    /// Build a page over `engine`; starts the periodic frame cleanup when a
    /// tokio runtime is available
    pub fn new(engine: Arc<dyn BrowserEngine>, config: &ServerConfig) -> Self {
        let frames = Arc::new(FrameTracker::new(engine.clone(), config.frames.clone()));
        frames.start_cleanup_timer();

        let registry = ReferenceRegistry::new(engine.clone(), frames.clone(), config.snapshot.clone());
        let selectors = SelectorSynthesizer::new(engine.clone(), config.selectors.clone());

        Self {
            engine,
            frames,
            registry,
            selectors,
        }
    }

    pub fn engine(&self) -> &Arc<dyn BrowserEngine> {
        &self.engine
    }

    pub fn frames(&self) -> &Arc<FrameTracker> {
        &self.frames
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    pub fn selectors(&self) -> &SelectorSynthesizer {
        &self.selectors
    }

    /// Capture a new snapshot generation
    pub async fn capture(&mut self) -> Result<Arc<Snapshot>> {
        self.registry.capture().await
    }

    /// Resolve a reference printed in the current snapshot
    pub async fn resolve(&self, reference: &str) -> Result<ElementHandle> {
        self.registry.resolve(reference).await
    }

    /// The page navigated (or is about to): references of the current generation die
    pub fn invalidate(&mut self) {
        self.registry.invalidate();
    }

    /// Stop frame tracking; the page is unusable for snapshots afterwards
    pub async fn dispose(&self) -> Result<()> {
        self.frames.dispose().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AxNode, FakeEngine, FrameId};
    use crate::error::BrowserError;

    #[tokio::test]
    async fn test_capture_and_resolve() {
        let engine = Arc::new(FakeEngine::new());
        engine.set_main_tree(vec![
            AxNode::new("button", "OK").with_handle(ElementHandle::new(FrameId::main(), "ok")),
        ]);

        let mut page = Page::new(engine, &ServerConfig::default());
        let snapshot = page.capture().await.unwrap();
        assert_eq!(snapshot.generation, 1);

        let handle = page.resolve("f0s1e1").await.unwrap();
        assert_eq!(handle.id, "ok");

        page.invalidate();
        assert!(matches!(page.resolve("f0s1e1").await, Err(BrowserError::StaleReference { .. })));
    }

    #[tokio::test]
    async fn test_capture_after_dispose_fails() {
        let engine = Arc::new(FakeEngine::new());
        let mut page = Page::new(engine, &ServerConfig::default());

        page.dispose().await.unwrap();
        assert!(matches!(page.capture().await, Err(BrowserError::ManagerDisposed)));
    }
}
