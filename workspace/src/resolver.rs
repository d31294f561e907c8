//! File and folder resolution for `@file:` / `@folder:` tokens.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use mentions_references::{Reference, ResourceLocator};

use crate::fs::{EntryKind, FileSystem};
use crate::labels::Labeler;

/// Resolves workspace paths into references and completion candidates.
///
/// Nothing here is cached: every call reflects the live filesystem.
#[derive(Clone)]
pub struct FileResolver {
    fs: Arc<dyn FileSystem>,
    labeler: Arc<dyn Labeler>,
}

impl FileResolver {
    /// Create a resolver over the given collaborators.
    pub fn new(fs: Arc<dyn FileSystem>, labeler: Arc<dyn Labeler>) -> Self {
        Self { fs, labeler }
    }

    /// The configured workspace roots.
    pub fn workspace_roots(&self) -> Vec<PathBuf> {
        self.fs.workspace_roots()
    }

    /// Turn user input into a local path.
    ///
    /// Accepts `file://` URLs and plain paths. Relative paths are tried
    /// against each workspace root in order; the first existing entry wins,
    /// otherwise the first root is assumed.
    pub async fn parse_resource(&self, input: &str) -> Option<PathBuf> {
        if input.is_empty() {
            return None;
        }

        if input.starts_with("file://") {
            return Url::parse(input).ok()?.to_file_path().ok();
        }
        if input.contains("://") {
            return None;
        }

        let path = PathBuf::from(input);
        if path.is_absolute() {
            return Some(path);
        }

        let roots = self.fs.workspace_roots();
        for root in &roots {
            let candidate = root.join(&path);
            if self.fs.stat(&candidate).await.is_ok() {
                return Some(candidate);
            }
        }

        Some(roots.first().map_or(path.clone(), |root| root.join(&path)))
    }

    /// Resolve a file reference. `None` if missing, unreadable or a directory.
    pub async fn create_file_context(&self, input: &str) -> Option<Reference> {
        self.create_context(input, EntryKind::File).await
    }

    /// Resolve a folder reference. `None` if missing, unreadable or a file.
    pub async fn create_folder_context(&self, input: &str) -> Option<Reference> {
        self.create_context(input, EntryKind::Directory).await
    }

    async fn create_context(&self, input: &str, wanted: EntryKind) -> Option<Reference> {
        let Some(path) = self.parse_resource(input).await else {
            debug!("Not a local resource: {input}");
            return None;
        };

        match self.fs.stat(&path).await {
            Ok(stat) if stat.kind() == wanted => Some(self.reference_for(wanted, &stat.path)),
            Ok(stat) => {
                debug!(
                    "Skipping {}: expected {wanted:?}, found {:?}",
                    path.display(),
                    stat.kind()
                );
                None
            }
            Err(e) => {
                debug!("Could not resolve {}: {e}", path.display());
                None
            }
        }
    }

    fn reference_for(&self, kind: EntryKind, path: &Path) -> Reference {
        let name = self.labeler.basename(path);
        Reference::new(kind.reference_kind(), path.display().to_string(), name.clone())
            .with_locator(ResourceLocator::Path(path.to_path_buf()))
            .with_title(name)
            .with_description(self.labeler.relative_label(path))
    }

    /// Files directly under any workspace root whose name contains `prefix`.
    pub async fn file_completions(&self, prefix: &str, limit: usize) -> Vec<Reference> {
        self.completions(prefix, EntryKind::File, limit).await
    }

    /// Folders directly under any workspace root whose name contains `prefix`.
    pub async fn folder_completions(&self, prefix: &str, limit: usize) -> Vec<Reference> {
        self.completions(prefix, EntryKind::Directory, limit).await
    }

    async fn completions(&self, prefix: &str, wanted: EntryKind, limit: usize) -> Vec<Reference> {
        let needle = prefix.to_lowercase();
        let mut results = Vec::new();

        for root in self.fs.workspace_roots() {
            if results.len() >= limit {
                break;
            }

            let stat = match self.fs.resolve(&root).await {
                Ok(stat) => stat,
                Err(e) => {
                    warn!("Skipping workspace root {}: {e}", root.display());
                    continue;
                }
            };

            for child in stat.children.unwrap_or_default() {
                if child.kind() != wanted {
                    continue;
                }

                let name = self.labeler.basename(&child.path);
                if !name.to_lowercase().contains(&needle) {
                    continue;
                }

                results.push(self.reference_for(wanted, &child.path));
                if results.len() >= limit {
                    break;
                }
            }
        }

        debug!(
            "Found {} {wanted:?} completions for {prefix:?}",
            results.len()
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkspaceConfig;
    use crate::error::{Result, WorkspaceError};
    use crate::fs::{FileStat, LocalFileSystem};
    use crate::labels::WorkspaceLabeler;
    use async_trait::async_trait;
    use mentions_references::ReferenceKind;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use tempfile::TempDir;

    fn local_resolver(config: WorkspaceConfig) -> FileResolver {
        FileResolver::new(
            Arc::new(LocalFileSystem::new(config.clone())),
            Arc::new(WorkspaceLabeler::new(&config)),
        )
    }

    fn workspace() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("file1.ts")).unwrap();
        File::create(temp_dir.path().join("README.md")).unwrap();
        std::fs::create_dir(temp_dir.path().join("file2")).unwrap();
        std::fs::create_dir(temp_dir.path().join("src")).unwrap();
        File::create(temp_dir.path().join("src").join("nested.ts")).unwrap();
        temp_dir
    }

    /// Filesystem with one root that always fails to list.
    struct FlakyFileSystem {
        broken: PathBuf,
        inner: LocalFileSystem,
        roots: Vec<PathBuf>,
    }

    #[async_trait]
    impl FileSystem for FlakyFileSystem {
        async fn resolve(&self, path: &Path) -> Result<FileStat> {
            if path == self.broken {
                return Err(WorkspaceError::PermissionDenied(path.display().to_string()));
            }
            self.inner.resolve(path).await
        }

        fn workspace_roots(&self) -> Vec<PathBuf> {
            self.roots.clone()
        }
    }

    #[tokio::test]
    async fn test_create_file_context() {
        let temp_dir = workspace();
        let resolver = local_resolver(WorkspaceConfig::new(temp_dir.path()));
        let path = temp_dir.path().join("file1.ts");

        let reference = resolver
            .create_file_context(&path.display().to_string())
            .await
            .unwrap();

        assert_eq!(reference.kind, ReferenceKind::File);
        assert_eq!(reference.value(), path.display().to_string());
        assert_eq!(reference.display_name, "file1.ts");
        assert_eq!(reference.metadata.title.as_deref(), Some("file1.ts"));
        assert_eq!(reference.metadata.description.as_deref(), Some("file1.ts"));
        assert_eq!(
            reference.metadata.locator,
            Some(ResourceLocator::Path(path))
        );
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_absent() {
        let temp_dir = workspace();
        let resolver = local_resolver(WorkspaceConfig::new(temp_dir.path()));

        assert!(resolver.create_file_context("src").await.is_none());
        assert!(resolver.create_folder_context("file1.ts").await.is_none());
        assert!(resolver.create_folder_context("src").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_and_malformed_are_absent() {
        let temp_dir = workspace();
        let resolver = local_resolver(WorkspaceConfig::new(temp_dir.path()));

        assert!(resolver.create_file_context("missing.rs").await.is_none());
        assert!(resolver.create_file_context("").await.is_none());
        assert!(
            resolver
                .create_file_context("https://example.com/a.ts")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_file_url_input() {
        let temp_dir = workspace();
        let resolver = local_resolver(WorkspaceConfig::new(temp_dir.path()));
        let path = temp_dir.path().join("README.md");
        let url = Url::from_file_path(&path).unwrap();

        let reference = resolver.create_file_context(url.as_str()).await.unwrap();
        assert_eq!(reference.display_name, "README.md");
    }

    #[tokio::test]
    async fn test_relative_path_uses_second_root_when_needed() {
        let first = workspace();
        let second = TempDir::new().unwrap();
        File::create(second.path().join("only_here.txt")).unwrap();

        let resolver =
            local_resolver(WorkspaceConfig::new(first.path()).with_root(second.path()));
        let reference = resolver
            .create_file_context("only_here.txt")
            .await
            .unwrap();

        assert_eq!(
            reference.value(),
            second.path().join("only_here.txt").display().to_string()
        );
    }

    #[tokio::test]
    async fn test_completions_filter_by_type_and_substring() {
        let temp_dir = workspace();
        let resolver = local_resolver(WorkspaceConfig::new(temp_dir.path()));

        let files: Vec<String> = resolver
            .file_completions("FIL", 50)
            .await
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        let folders: Vec<String> = resolver
            .folder_completions("fil", 50)
            .await
            .into_iter()
            .map(|r| r.display_name)
            .collect();

        assert_eq!(files, vec!["file1.ts".to_string()]);
        assert_eq!(folders, vec!["file2".to_string()]);
    }

    #[tokio::test]
    async fn test_completions_are_not_recursive() {
        let temp_dir = workspace();
        let resolver = local_resolver(WorkspaceConfig::new(temp_dir.path()));

        assert!(resolver.file_completions("nested", 50).await.is_empty());
    }

    #[tokio::test]
    async fn test_completions_respect_limit() {
        let temp_dir = workspace();
        let resolver = local_resolver(WorkspaceConfig::new(temp_dir.path()));

        assert_eq!(resolver.file_completions("", 1).await.len(), 1);
        assert_eq!(resolver.file_completions("", 50).await.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_root_is_skipped() {
        let broken = TempDir::new().unwrap();
        let healthy = workspace();
        let roots = vec![broken.path().to_path_buf(), healthy.path().to_path_buf()];
        let config = WorkspaceConfig {
            roots: roots.clone(),
        };

        let resolver = FileResolver::new(
            Arc::new(FlakyFileSystem {
                broken: broken.path().to_path_buf(),
                inner: LocalFileSystem::new(config.clone()),
                roots,
            }),
            Arc::new(WorkspaceLabeler::new(&config)),
        );

        let files = resolver.file_completions("file", 50).await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].display_name, "file1.ts");
    }
}
