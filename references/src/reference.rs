//! Resolved references and the shared handle used for link enrichment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::error::ReferenceError;

/// What an `@`-token points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A single file inside the workspace.
    File,

    /// A workspace directory.
    Folder,

    /// A web page.
    Link,
}

impl ReferenceKind {
    /// All kinds, in completion order.
    pub const ALL: [ReferenceKind; 3] = [Self::File, Self::Folder, Self::Link];

    /// The tag used in `@tag:value` tokens.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            "link" => Ok(Self::Link),
            other => Err(ReferenceError::UnknownKind(other.to_string())),
        }
    }
}

/// Structured identity of the referenced resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceLocator {
    /// Local filesystem path.
    Path(PathBuf),

    /// Parsed web address.
    Url(Url),
}

impl ResourceLocator {
    /// The URL, if this locator points at the web.
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Url(url) => Some(url),
            Self::Path(_) => None,
        }
    }

    /// The path, if this locator points at the filesystem.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Url(_) => None,
        }
    }
}

/// Optional display metadata attached to a reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    /// Structured identity of the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<ResourceLocator>,

    /// Title (basename for files, page title for links).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Secondary line (relative path, meta description).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A resolved `@`-token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// The kind of target.
    pub kind: ReferenceKind,

    /// Canonical identifier: absolute path or normalized URL. Fixed at
    /// creation; only the label and metadata change afterwards.
    value: String,

    /// Short label shown in the composer.
    pub display_name: String,

    /// Display metadata.
    #[serde(default)]
    pub metadata: ReferenceMetadata,
}

impl Reference {
    /// Create a reference with empty metadata.
    pub fn new(
        kind: ReferenceKind,
        value: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            display_name: display_name.into(),
            metadata: ReferenceMetadata::default(),
        }
    }

    /// Canonical identifier: absolute path or normalized URL.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Set the resource locator.
    pub fn with_locator(mut self, locator: ResourceLocator) -> Self {
        self.metadata.locator = Some(locator);
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// The parsed URL of a structurally valid link.
    pub fn url(&self) -> Option<&Url> {
        self.metadata.locator.as_ref().and_then(ResourceLocator::as_url)
    }

    /// Fill title and description from fetched page data.
    ///
    /// Fields that already hold a non-empty value are left alone. Returns
    /// whether anything changed.
    pub fn fill_missing(&mut self, title: &str, description: &str) -> bool {
        let mut changed = false;

        if !title.is_empty() && is_unset(&self.metadata.title) {
            self.metadata.title = Some(title.to_string());
            self.display_name = title.to_string();
            changed = true;
        }

        if !description.is_empty() && is_unset(&self.metadata.description) {
            self.metadata.description = Some(description.to_string());
            changed = true;
        }

        changed
    }
}

fn is_unset(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(str::is_empty)
}

/// A reference that other tasks may patch after it was handed out.
///
/// Clones share the same underlying reference, so a link returned from
/// `process_text` shows the page title once enrichment lands.
#[derive(Debug, Clone)]
pub struct SharedReference {
    inner: Arc<RwLock<Reference>>,
}

impl SharedReference {
    /// Wrap a reference.
    pub fn new(reference: Reference) -> Self {
        Self {
            inner: Arc::new(RwLock::new(reference)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Reference> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Reference> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Reference {
        self.read().clone()
    }

    /// The reference kind.
    pub fn kind(&self) -> ReferenceKind {
        self.read().kind
    }

    /// The canonical value.
    pub fn value(&self) -> String {
        self.read().value.clone()
    }

    /// The current display name.
    pub fn display_name(&self) -> String {
        self.read().display_name.clone()
    }

    /// The current metadata.
    pub fn metadata(&self) -> ReferenceMetadata {
        self.read().metadata.clone()
    }

    /// The parsed URL, for structurally valid links.
    pub fn url(&self) -> Option<Url> {
        self.read().url().cloned()
    }

    /// See [`Reference::fill_missing`].
    pub fn fill_missing(&self, title: &str, description: &str) -> bool {
        self.write().fill_missing(title, description)
    }

    /// Whether both handles point at the same reference.
    pub fn ptr_eq(&self, other: &SharedReference) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Reference> for SharedReference {
    fn from(reference: Reference) -> Self {
        Self::new(reference)
    }
}

impl Serialize for SharedReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn link(title: Option<&str>) -> Reference {
        let url = Url::parse("https://example.com/").unwrap();
        let mut reference = Reference::new(ReferenceKind::Link, url.as_str(), "example.com")
            .with_locator(ResourceLocator::Url(url));
        reference.metadata.title = title.map(str::to_string);
        reference
    }

    #[test]
    fn test_kind_parse_and_display() {
        for kind in ReferenceKind::ALL {
            assert_eq!(kind.as_str().parse::<ReferenceKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }

        assert_eq!(
            "symbol".parse::<ReferenceKind>(),
            Err(ReferenceError::UnknownKind("symbol".to_string()))
        );
    }

    #[test]
    fn test_fill_missing_sets_title_and_display_name() {
        let shared = SharedReference::new(link(None));

        assert!(shared.fill_missing("Example", ""));
        assert_eq!(shared.display_name(), "Example");
        assert_eq!(shared.metadata().title.as_deref(), Some("Example"));
        assert_eq!(shared.metadata().description, None);
    }

    #[test]
    fn test_value_survives_patching() {
        let mut reference = link(None);

        reference.fill_missing("Example", "About examples");
        reference.metadata.title = Some("Renamed".to_string());

        assert_eq!(reference.value(), "https://example.com/");
        assert_eq!(reference.display_name, "Example");

        let json = serde_json::to_string(&reference).unwrap();
        let parsed: Reference = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.value(), "https://example.com/");
    }

    #[test]
    fn test_fill_missing_keeps_provided_title() {
        let shared = SharedReference::new(link(Some("Provided")));

        assert!(!shared.fill_missing("Example", ""));
        assert_eq!(shared.metadata().title.as_deref(), Some("Provided"));
        assert_eq!(shared.display_name(), "example.com");
    }

    #[test]
    fn test_fill_missing_description_only() {
        let shared = SharedReference::new(link(Some("Provided")));

        assert!(shared.fill_missing("", "A page about examples"));
        assert_eq!(
            shared.metadata().description.as_deref(),
            Some("A page about examples")
        );
    }

    #[test]
    fn test_clones_share_state() {
        let first = SharedReference::new(link(None));
        let second = first.clone();

        first.fill_missing("Example", "");

        assert!(first.ptr_eq(&second));
        assert_eq!(second.display_name(), "Example");
        assert!(!first.ptr_eq(&SharedReference::new(link(None))));
    }

    #[test]
    fn test_serialized_shape() {
        let reference = Reference::new(ReferenceKind::File, "/repo/a.ts", "a.ts")
            .with_description("a.ts");
        let json = serde_json::to_value(SharedReference::new(reference)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "kind": "file",
                "value": "/repo/a.ts",
                "display_name": "a.ts",
                "metadata": { "description": "a.ts" }
            })
        );
    }
}
