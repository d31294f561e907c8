//! Error types for workspace resolution.

use std::path::Path;

use thiserror::Error;

/// Result type alias for workspace operations.
pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// Errors that can occur while reading the workspace.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Input could not be turned into a local path.
    #[error("invalid resource: {0}")]
    InvalidResource(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkspaceError {
    /// Classify an IO error for `path`.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(path.display().to_string())
            }
            _ => Self::Io(err),
        }
    }
}
