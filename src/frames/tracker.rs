use crate::engine::{BrowserEngine, FrameId};
use crate::error::{BrowserError, Result};
use crate::frames::{BLANK_PAGE_URL, FrameTrackerConfig};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Detached frame ids remembered so snapshot walks can skip them
const TOMBSTONE_CAPACITY: usize = 256;

/// Metadata kept for one known frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub id: FrameId,
    pub url: String,
    pub name: Option<String>,
    pub parent: Option<FrameId>,
    pub detached: bool,
    pub element_count: Option<usize>,
    #[serde(skip)]
    pub first_seen: Instant,
    #[serde(skip)]
    pub last_seen: Instant,
}

impl FrameRecord {
    pub fn is_main(&self) -> bool {
        self.parent.is_none()
    }

    /// Time since the frame was first observed
    pub fn age(&self) -> Duration {
        self.first_seen.elapsed()
    }
}

/// Outcome of one cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub checked: usize,
    pub evicted: Vec<FrameId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceIssue {
    pub frame_id: FrameId,
    pub url: String,
    pub element_count: Option<usize>,
    pub age_secs: u64,
    pub detail: String,
}

/// Advisory findings from [`FrameTracker::find_performance_issues`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub large_frames: Vec<PerformanceIssue>,
    pub stale_frames: Vec<PerformanceIssue>,
    pub active_frames: usize,

    /// Frames evicted as detached over the tracker's lifetime
    pub detached_evicted: usize,
}

impl PerformanceReport {
    pub fn has_issues(&self) -> bool {
        !self.large_frames.is_empty() || !self.stale_frames.is_empty()
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    active: IndexMap<FrameId, FrameRecord>,
    tombstones: IndexSet<FrameId>,
    evicted_total: usize,
    disposed: bool,
}

impl TrackerState {
    fn ensure_open(&self) -> Result<()> {
        if self.disposed {
            return Err(BrowserError::ManagerDisposed);
        }
        Ok(())
    }

    fn bury(&mut self, id: FrameId) {
        self.tombstones.insert(id);
        while self.tombstones.len() > TOMBSTONE_CAPACITY {
            self.tombstones.shift_remove_index(0);
        }
    }
}

/// Identity-keyed table of the frames of one page
pub struct FrameTracker {
    engine: Arc<dyn BrowserEngine>,
    config: FrameTrackerConfig,
    state: Mutex<TrackerState>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl FrameTracker {
    pub fn new(engine: Arc<dyn BrowserEngine>, config: FrameTrackerConfig) -> Self {
        Self {
            engine,
            config,
            state: Mutex::new(TrackerState::default()),
            cleanup_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &FrameTrackerConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.cleanup_task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start the periodic cleanup. The task only holds a weak reference, so it
    /// ends by itself once the tracker is dropped. A zero interval disables it.
    pub fn start_cleanup_timer(self: &Arc<Self>) {
        if self.state().disposed {
            return;
        }
        if self.config.cleanup_interval.is_zero() {
            log::debug!("Cleanup interval is zero; periodic frame cleanup disabled");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::warn!("No tokio runtime available; periodic frame cleanup disabled");
                return;
            }
        };

        let mut task = self.task();
        if task.is_some() {
            return;
        }

        let weak = Arc::downgrade(self);
        let period = self.config.cleanup_interval;
        *task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(tracker) = weak.upgrade() else {
                    break;
                };
                match tracker.cleanup_detached().await {
                    Ok(report) if !report.evicted.is_empty() => {
                        log::info!("Periodic cleanup evicted {} detached frame(s)", report.evicted.len());
                    }
                    Ok(_) => {}
                    Err(BrowserError::ManagerDisposed) => break,
                    Err(e) => log::warn!("Periodic frame cleanup failed: {}", e),
                }
            }
        }));
    }

    /// Register a frame. Frames whose metadata cannot be read are skipped and
    /// `Ok(None)` is returned.
    pub async fn track(&self, frame: &FrameId) -> Result<Option<FrameRecord>> {
        {
            let state = self.state();
            state.ensure_open()?;
            if state.tombstones.contains(frame) {
                return Ok(None);
            }
        }

        let info = match tokio::time::timeout(self.config.probe_timeout, self.engine.frame_info(frame)).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                log::debug!("Skipping frame {}: {}", frame, e);
                return Ok(None);
            }
            Err(_) => {
                log::debug!("Skipping frame {}: metadata read timed out", frame);
                return Ok(None);
            }
        };

        let mut state = self.state();
        state.ensure_open()?;

        let now = Instant::now();
        let url = if info.url.is_empty() { BLANK_PAGE_URL.to_string() } else { info.url };
        let name = info.name.filter(|name| !name.is_empty());

        let record = state
            .active
            .entry(frame.clone())
            .and_modify(|record| {
                record.url = url.clone();
                record.name = name.clone();
                record.parent = info.parent.clone();
                record.last_seen = now;
            })
            .or_insert_with(|| FrameRecord {
                id: frame.clone(),
                url: url.clone(),
                name: name.clone(),
                parent: info.parent.clone(),
                detached: false,
                element_count: None,
                first_seen: now,
                last_seen: now,
            });

        Ok(Some(record.clone()))
    }

    /// Remove a frame from the active set
    pub fn untrack(&self, frame: &FrameId) -> Result<bool> {
        let mut state = self.state();
        state.ensure_open()?;
        Ok(state.active.shift_remove(frame).is_some())
    }

    /// Probe every active frame and evict the ones that fail or time out
    pub async fn cleanup_detached(&self) -> Result<CleanupReport> {
        self.state().ensure_open()?;
        self.sweep().await
    }

    async fn sweep(&self) -> Result<CleanupReport> {
        let frames: Vec<FrameId> = self.state().active.keys().cloned().collect();

        let mut live = Vec::new();
        let mut dead = Vec::new();
        for id in frames {
            match self.probe(&id).await {
                Some(url) => live.push((id, url)),
                None => dead.push(id),
            }
        }

        let mut state = self.state();
        let now = Instant::now();
        for (id, url) in &live {
            if let Some(record) = state.active.get_mut(id) {
                record.last_seen = now;
                if !url.is_empty() {
                    record.url = url.clone();
                }
            }
        }

        let mut evicted = Vec::new();
        for id in dead {
            if let Some(mut record) = state.active.shift_remove(&id) {
                record.detached = true;
                log::debug!("Evicting detached frame {} ({})", record.id, record.url);
                state.evicted_total += 1;
                state.bury(id.clone());
                evicted.push(id);
            }
        }

        Ok(CleanupReport {
            checked: live.len() + evicted.len(),
            evicted,
        })
    }

    /// Bounded liveness probe; `None` means the frame is presumed detached
    async fn probe(&self, frame: &FrameId) -> Option<String> {
        match tokio::time::timeout(self.config.probe_timeout, self.engine.frame_url(frame)).await {
            Ok(Ok(url)) => Some(url),
            Ok(Err(e)) => {
                log::debug!("Liveness probe failed for frame {}: {}", frame, e);
                None
            }
            Err(_) => {
                log::debug!("Liveness probe timed out for frame {}", frame);
                None
            }
        }
    }

    pub fn active_frames(&self) -> Vec<FrameRecord> {
        self.state().active.values().cloned().collect()
    }

    pub fn get(&self, frame: &FrameId) -> Option<FrameRecord> {
        self.state().active.get(frame).cloned()
    }

    pub fn is_active(&self, frame: &FrameId) -> bool {
        self.state().active.contains_key(frame)
    }

    /// Whether the frame has been observed detached
    pub fn is_detached(&self, frame: &FrameId) -> bool {
        let state = self.state();
        state.tombstones.contains(frame) || state.active.get(frame).is_some_and(|record| record.detached)
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    /// Cache the element count observed for a frame by the last snapshot walk
    pub fn record_element_count(&self, frame: &FrameId, count: usize) {
        if let Some(record) = self.state().active.get_mut(frame) {
            record.element_count = Some(count);
        }
    }

    /// Report frames that are unusually large or old. Advisory only.
    pub fn find_performance_issues(&self) -> PerformanceReport {
        let state = self.state();
        let mut report = PerformanceReport {
            active_frames: state.active.len(),
            detached_evicted: state.evicted_total,
            ..Default::default()
        };

        for record in state.active.values() {
            let age = record.age();

            if let Some(count) = record.element_count.filter(|&c| c > self.config.large_frame_elements) {
                report.large_frames.push(PerformanceIssue {
                    frame_id: record.id.clone(),
                    url: record.url.clone(),
                    element_count: Some(count),
                    age_secs: age.as_secs(),
                    detail: format!(
                        "{} elements (threshold {})",
                        count, self.config.large_frame_elements
                    ),
                });
            }

            if age > self.config.stale_frame_age {
                report.stale_frames.push(PerformanceIssue {
                    frame_id: record.id.clone(),
                    url: record.url.clone(),
                    element_count: record.element_count,
                    age_secs: age.as_secs(),
                    detail: format!(
                        "tracked for {}s (threshold {}s)",
                        age.as_secs(),
                        self.config.stale_frame_age.as_secs()
                    ),
                });
            }
        }

        report
    }

    /// Stop the timer, run a final cleanup and clear the active set. Idempotent.
    pub async fn dispose(&self) -> Result<()> {
        if self.state().disposed {
            return Ok(());
        }

        if let Some(task) = self.task().take() {
            task.abort();
        }

        if let Err(e) = self.sweep().await {
            log::warn!("Final frame cleanup failed: {}", e);
        }

        let mut state = self.state();
        state.disposed = true;
        state.active.clear();
        log::debug!("Frame tracker disposed");
        Ok(())
    }
}

impl Drop for FrameTracker {
    fn drop(&mut self) {
        let task = self.cleanup_task.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = task.take() {
            task.abort();
        }
    }
}
