//! Chrome process management
//!
//! Launching or attaching to Chrome/Chromium through `headless_chrome`.
//! The automation layer talks to the browser through
//! [`ChromeEngine`](crate::engine::ChromeEngine), which wraps a [`BrowserSession`].

pub mod config;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use session::BrowserSession;
