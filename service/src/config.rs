//! Configuration for the context service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mentions_links::{CaptureService, LaunchOptions, LinkCache, NavigationOptions};
use mentions_workspace::WorkspaceConfig;

use crate::error::{Result, ServiceError};

/// Default cap on filesystem completion candidates.
pub const DEFAULT_COMPLETION_LIMIT: usize = 50;

/// Default navigation timeout for enrichment, in milliseconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 10_000;

/// Default buffer of the enrichment event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Configuration for the context service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Workspace roots searched by file and folder mentions.
    pub workspace: WorkspaceConfig,

    /// Maximum filesystem candidates per completion request.
    pub completion_limit: usize,

    /// Maximum number of cached link references.
    pub link_cache_capacity: usize,

    /// Navigation timeout for link enrichment.
    pub navigation_timeout_ms: u64,

    /// Browser launch options.
    pub launch: LaunchOptions,

    /// Resolve untyped `@text` mentions in submitted text by probing file,
    /// then folder, then link.
    pub infer_untyped: bool,

    /// Skip enrichment of a link whose enrichment is already running.
    pub coalesce_enrichment: bool,

    /// Directory captured pages are written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_dir: Option<PathBuf>,

    /// Maximum number of captured pages kept in memory.
    pub capture_capacity: usize,

    /// Buffer of the enrichment event channel.
    pub event_capacity: usize,
}

impl ServiceConfig {
    /// Create a configuration for a single workspace root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            workspace: WorkspaceConfig::new(root),
            ..Self::default()
        }
    }

    /// Add a workspace root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace.roots.push(root.into());
        self
    }

    /// Set the completion limit.
    pub fn with_completion_limit(mut self, limit: usize) -> Self {
        self.completion_limit = limit;
        self
    }

    /// Set the link cache capacity.
    pub fn with_link_cache_capacity(mut self, capacity: usize) -> Self {
        self.link_cache_capacity = capacity;
        self
    }

    /// Set the navigation timeout.
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the browser launch options.
    pub fn with_launch_options(mut self, launch: LaunchOptions) -> Self {
        self.launch = launch;
        self
    }

    /// Enable or disable kind inference for untyped mentions.
    pub fn with_infer_untyped(mut self, enabled: bool) -> Self {
        self.infer_untyped = enabled;
        self
    }

    /// Enable or disable enrichment coalescing.
    pub fn with_coalesce_enrichment(mut self, enabled: bool) -> Self {
        self.coalesce_enrichment = enabled;
        self
    }

    /// Persist captured pages under `dir`.
    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = Some(dir.into());
        self
    }

    /// Set how many captured pages stay in memory.
    pub fn with_capture_capacity(mut self, capacity: usize) -> Self {
        self.capture_capacity = capacity;
        self
    }

    /// Navigation options derived from the timeout.
    pub fn navigation(&self) -> NavigationOptions {
        NavigationOptions::with_timeout(Duration::from_millis(self.navigation_timeout_ms))
    }

    /// Parse a TOML configuration.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&contents)
    }

    /// Check values that would make the service unusable.
    pub fn validate(&self) -> Result<()> {
        if self.completion_limit == 0 {
            return Err(ServiceError::Config(
                "completion_limit must be at least 1".to_string(),
            ));
        }
        if self.navigation_timeout_ms == 0 {
            return Err(ServiceError::Config(
                "navigation_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ServiceError::Config(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig::default(),
            completion_limit: DEFAULT_COMPLETION_LIMIT,
            link_cache_capacity: LinkCache::DEFAULT_CAPACITY,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            launch: LaunchOptions::default(),
            infer_untyped: false,
            coalesce_enrichment: false,
            capture_dir: None,
            capture_capacity: CaptureService::DEFAULT_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
