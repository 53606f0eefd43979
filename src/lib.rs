//! # browser-use
//!
//! Reference-aware browser automation over the Chrome DevTools Protocol,
//! served to AI agents through the Model Context Protocol (MCP).
//!
//! ## Features
//!
//! - **Element references**: snapshots print handles like `f0s1e3` (frame,
//!   snapshot generation, ordinal). References from an older generation are
//!   rejected instead of silently hitting the wrong element.
//! - **Frame tracking**: child frames are tracked with liveness probes and a
//!   periodic cleanup of detached frames.
//! - **Selector synthesis**: every element action can be replayed as a
//!   Playwright-style line of code built on a unique CSS selector.
//! - **Expectations**: each call chooses which page state comes back
//!   (snapshot, console, tabs, downloads, code, images).
//! - **Batch execution**: run several tools in one call with per-step error
//!   policy.
//!
//! ## Running the MCP Server
//!
//! ```bash
//! # Run headless browser
//! cargo run --features mcp-server --bin mcp-server
//!
//! # Run with visible browser (useful for debugging)
//! cargo run --features mcp-server --bin mcp-server -- --headed
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use browser_use::{Page, ServerConfig, ToolRegistry};
//! use serde_json::json;
//!
//! # async fn run() -> browser_use::Result<()> {
//! let config = ServerConfig::default();
//! let mut page = Page::new(config.create_engine()?, &config);
//! let registry = ToolRegistry::with_defaults();
//!
//! let response = registry.execute("navigate", json!({"url": "example.com"}), &mut page).await;
//! println!("{}", response.to_markdown());
//!
//! // click by the reference printed in the snapshot above
//! registry.execute("click", json!({"ref": "f0s1e2"}), &mut page).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`engine`]: the [`BrowserEngine`](engine::BrowserEngine) seam, Chrome and in-memory implementations
//! - [`frames`]: frame lifecycle tracking
//! - [`dom`]: snapshots, references and selector synthesis
//! - [`expectation`]: response shaping options and per-tool defaults
//! - [`tools`]: the browser tools and their registry
//! - [`batch`]: multi-step execution
//! - [`mcp`]: rmcp server (requires the `mcp-handler` feature)

pub mod batch;
pub mod browser;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod expectation;
pub mod frames;
pub mod page;
pub mod tools;

#[cfg(feature = "mcp-handler")]
pub mod mcp;

pub use batch::{BatchExecutionRequest, BatchExecutor, BatchReport, BatchStep};
pub use browser::{ConnectionOptions, LaunchOptions};
pub use config::ServerConfig;
pub use dom::{Reference, Snapshot, SnapshotFormat};
pub use engine::{BrowserEngine, ElementHandle, FrameId};
pub use error::{BrowserError, Result};
pub use expectation::{ExpectationConfig, Section};
pub use frames::{FrameTracker, FrameTrackerConfig};
pub use page::Page;
pub use tools::{Tool, ToolContext, ToolRegistry, ToolResponse, ToolResult};

#[cfg(feature = "mcp-handler")]
pub use mcp::BrowserServer;
#[cfg(feature = "mcp-handler")]
pub use rmcp::ServiceExt;
