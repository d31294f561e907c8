//! Error types for the context service.

use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced while configuring or shutting down the service.
///
/// Resolution itself never fails: misses are dropped and enrichment errors
/// are reported as events.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed configuration file.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Workspace error.
    #[error("workspace error: {0}")]
    Workspace(#[from] mentions_workspace::WorkspaceError),

    /// Link or browser error.
    #[error("link error: {0}")]
    Link(#[from] mentions_links::LinkError),
}
