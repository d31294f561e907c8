//! Filesystem collaborator used for resolution.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use mentions_references::ReferenceKind;

use crate::config::WorkspaceConfig;
use crate::error::{Result, WorkspaceError};

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file (or anything that is not a directory).
    File,

    /// Directory.
    Directory,
}

impl EntryKind {
    /// The reference kind produced for entries of this type.
    pub fn reference_kind(self) -> ReferenceKind {
        match self {
            Self::File => ReferenceKind::File,
            Self::Directory => ReferenceKind::Folder,
        }
    }
}

/// A resolved filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Path of the entry.
    pub path: PathBuf,

    /// Whether the entry is a directory.
    pub is_directory: bool,

    /// Direct children, listed only when a directory was resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileStat>>,
}

impl FileStat {
    /// A file entry.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            children: None,
        }
    }

    /// A directory entry without a listing.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            children: None,
        }
    }

    /// Attach a directory listing.
    pub fn with_children(mut self, children: Vec<FileStat>) -> Self {
        self.children = Some(children);
        self
    }

    /// The entry type.
    pub fn kind(&self) -> EntryKind {
        if self.is_directory {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }
}

/// Read-only access to the workspace filesystem.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Resolve an entry; directories include one level of children.
    async fn resolve(&self, path: &Path) -> Result<FileStat>;

    /// Resolve an entry without listing children.
    async fn stat(&self, path: &Path) -> Result<FileStat> {
        let mut stat = self.resolve(path).await?;
        stat.children = None;
        Ok(stat)
    }

    /// The configured workspace roots.
    fn workspace_roots(&self) -> Vec<PathBuf>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    config: WorkspaceConfig,
}

impl LocalFileSystem {
    /// Create a filesystem over the given workspace.
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }

    async fn entry_is_dir(entry: &fs::DirEntry) -> bool {
        match entry.file_type().await {
            Ok(file_type) if file_type.is_symlink() => fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false),
            Ok(file_type) => file_type.is_dir(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn resolve(&self, path: &Path) -> Result<FileStat> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| WorkspaceError::from_io(path, e))?;

        if !metadata.is_dir() {
            return Ok(FileStat::file(path));
        }

        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| WorkspaceError::from_io(path, e))?;

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let child = entry.path();
            if Self::entry_is_dir(&entry).await {
                children.push(FileStat::directory(child));
            } else {
                children.push(FileStat::file(child));
            }
        }
        children.sort_by(|a, b| a.path.cmp(&b.path));

        debug!("Listed {} entries in {}", children.len(), path.display());
        Ok(FileStat::directory(path).with_children(children))
    }

    async fn stat(&self, path: &Path) -> Result<FileStat> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| WorkspaceError::from_io(path, e))?;

        if metadata.is_dir() {
            Ok(FileStat::directory(path))
        } else {
            Ok(FileStat::file(path))
        }
    }

    fn workspace_roots(&self) -> Vec<PathBuf> {
        self.config.roots.clone()
    }
}
