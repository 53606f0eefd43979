//! Server-wide configuration
//!
//! Every component receives its settings from a [`ServerConfig`] value at
//! construction; nothing is read from globals.

use crate::browser::{ConnectionOptions, LaunchOptions};
use crate::dom::{SelectorPolicy, SnapshotConfig};
use crate::engine::{BrowserEngine, ChromeEngine};
use crate::error::Result;
use crate::frames::FrameTrackerConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Used when no `connection` is set
    pub launch: LaunchOptions,

    /// Attach to a running browser instead of launching one
    pub connection: Option<ConnectionOptions>,

    pub frames: FrameTrackerConfig,

    pub selectors: SelectorPolicy,

    pub snapshot: SnapshotConfig,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_launch(mut self, launch: LaunchOptions) -> Self {
        self.launch = launch;
        self
    }

    pub fn with_connection(mut self, connection: ConnectionOptions) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_frames(mut self, frames: FrameTrackerConfig) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_selectors(mut self, selectors: SelectorPolicy) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_snapshot(mut self, snapshot: SnapshotConfig) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Launch or connect to Chrome as configured
    pub fn create_engine(&self) -> Result<Arc<dyn BrowserEngine>> {
        let engine = match &self.connection {
            Some(connection) => ChromeEngine::connect(connection.clone())?,
            None => ChromeEngine::launch(self.launch.clone())?,
        };
        Ok(Arc::new(engine))
    }
}
