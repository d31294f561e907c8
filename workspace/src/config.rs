//! Configuration for the workspace being referenced.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The workspace roots that bound file and folder resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Top-level folders of the open project, in display order.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

impl WorkspaceConfig {
    /// Create a config with a single root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
        }
    }

    /// Add a root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Whether any root is configured.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
