//! Error types for link enrichment and capture.

use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur while fetching or capturing pages.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The browser session could not be started.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Navigation failed.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Navigation did not finish in time.
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Page evaluation failed.
    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    /// The browser cannot perform this operation.
    #[error("unsupported browser operation: {0}")]
    Unsupported(&'static str),

    /// The session was closed.
    #[error("browser session closed")]
    SessionClosed,

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
