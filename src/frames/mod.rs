//! Frame lifecycle tracking
//!
//! Keeps the set of frames known for a page, probes them for liveness and
//! evicts the ones that detached. Nothing here owns engine objects; frames are
//! known only by their [`FrameId`](crate::engine::FrameId).

pub mod tracker;

pub use tracker::{CleanupReport, FrameRecord, FrameTracker, PerformanceIssue, PerformanceReport};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// URL recorded for frames that report none
pub const BLANK_PAGE_URL: &str = "about:blank";

/// Timing and threshold settings for a [`FrameTracker`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameTrackerConfig {
    /// How often detached frames are swept; zero turns the periodic sweep off
    #[serde(with = "duration_millis")]
    pub cleanup_interval: Duration,

    /// Bound on each liveness probe; no answer in time means detached
    #[serde(with = "duration_millis")]
    pub probe_timeout: Duration,

    /// Element count above which a frame is reported as large
    pub large_frame_elements: usize,

    /// Age above which a frame is reported as stale
    #[serde(with = "duration_millis")]
    pub stale_frame_age: Duration,
}

impl Default for FrameTrackerConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(1),
            large_frame_elements: 1000,
            stale_frame_age: Duration::from_secs(10 * 60),
        }
    }
}

impl FrameTrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn large_frame_elements(mut self, count: usize) -> Self {
        self.large_frame_elements = count;
        self
    }

    pub fn stale_frame_age(mut self, age: Duration) -> Self {
        self.stale_frame_age = age;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
