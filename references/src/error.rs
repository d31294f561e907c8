//! Error types for the reference model.

use thiserror::Error;

/// Result type alias for reference operations.
pub type Result<T> = std::result::Result<T, ReferenceError>;

/// Errors that can occur while handling references.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A kind tag other than `file`, `folder` or `link`.
    #[error("unknown reference kind: {0}")]
    UnknownKind(String),
}
