//! Display labels for workspace paths.

use std::path::{Component, Path, PathBuf};

use crate::config::WorkspaceConfig;

/// Produces the short strings shown next to file and folder references.
pub trait Labeler: Send + Sync {
    /// Last path segment.
    fn basename(&self, path: &Path) -> String;

    /// Path relative to the workspace, or the absolute path outside it.
    fn relative_label(&self, path: &Path) -> String;
}

/// [`Labeler`] that labels paths relative to the workspace roots.
///
/// With several roots the label is prefixed by the root folder name, e.g.
/// `api • src/main.rs`.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceLabeler {
    roots: Vec<PathBuf>,
}

impl WorkspaceLabeler {
    /// Create a labeler for the given workspace.
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            roots: config.roots.clone(),
        }
    }
}

fn join_components(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl Labeler for WorkspaceLabeler {
    fn basename(&self, path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    fn relative_label(&self, path: &Path) -> String {
        for root in &self.roots {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };

            let relative = join_components(relative);
            if self.roots.len() < 2 {
                return if relative.is_empty() {
                    self.basename(root)
                } else {
                    relative
                };
            }

            let root_name = self.basename(root);
            return if relative.is_empty() {
                root_name
            } else {
                format!("{root_name} • {relative}")
            };
        }

        path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basename() {
        let labeler = WorkspaceLabeler::default();
        assert_eq!(labeler.basename(Path::new("/repo/src/main.rs")), "main.rs");
        assert_eq!(labeler.basename(Path::new("/")), "/");
    }

    #[test]
    fn test_single_root_labels() {
        let labeler = WorkspaceLabeler::new(&WorkspaceConfig::new("/repo"));

        assert_eq!(
            labeler.relative_label(Path::new("/repo/src/main.rs")),
            "src/main.rs"
        );
        assert_eq!(labeler.relative_label(Path::new("/repo")), "repo");
        assert_eq!(
            labeler.relative_label(Path::new("/elsewhere/file.txt")),
            "/elsewhere/file.txt"
        );
    }

    #[test]
    fn test_multi_root_labels() {
        let labeler =
            WorkspaceLabeler::new(&WorkspaceConfig::new("/work/api").with_root("/work/web"));

        assert_eq!(
            labeler.relative_label(Path::new("/work/web/index.html")),
            "web • index.html"
        );
        assert_eq!(labeler.relative_label(Path::new("/work/api")), "api");
    }
}
