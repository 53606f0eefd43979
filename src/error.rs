use thiserror::Error;

/// Errors produced by the browser automation layer
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Browser process could not be started
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Remote browser could not be reached
    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The underlying action failed
    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    /// Reference minted by an older snapshot generation
    #[error(
        "Reference '{reference}' is stale (current snapshot generation is {current}); capture a new snapshot and retry"
    )]
    StaleReference { reference: String, current: u64 },

    /// Handle failed its liveness check
    #[error("Element '{0}' is no longer attached to the page; capture a new snapshot and retry")]
    DetachedElement(String),

    /// Selector synthesis exhausted every strategy
    #[error("Could not build a unique selector: {0}")]
    AmbiguousSelector(String),

    /// Reference string is malformed or unknown to the current snapshot
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Frame tracker was used after teardown
    #[error("Frame manager has been disposed")]
    ManagerDisposed,
}

impl BrowserError {
    /// Whether the caller can recover by capturing a fresh snapshot
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BrowserError::StaleReference { .. } | BrowserError::DetachedElement(_)
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BrowserError>;
