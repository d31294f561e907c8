//! Synchronous link reference creation.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use mentions_references::{Reference, ReferenceKind, ResourceLocator, SharedReference};

use crate::cache::LinkCache;

/// Longest display label before truncation.
const MAX_DISPLAY_CHARS: usize = 50;

/// Caller-supplied link metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// Title to show instead of the URL.
    pub title: Option<String>,

    /// Description to show under the title.
    pub description: Option<String>,
}

impl LinkMetadata {
    /// Metadata with a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Parse user text as a web address, assuming `https://` when no scheme is
/// given. Inputs without a host are rejected.
pub fn normalize_link(raw: &str) -> Option<Url> {
    let url = if raw.contains("://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("https://{raw}"))
    }
    .ok()?;

    if url.host_str().is_none_or(str::is_empty) {
        return None;
    }
    Some(url)
}

/// Short label for a URL: no scheme, no leading `www.`, at most 50 chars.
pub fn display_url(url: &Url) -> String {
    let full = url.as_str();
    let without_scheme = full
        .strip_prefix("https://")
        .or_else(|| full.strip_prefix("http://"))
        .unwrap_or(full);
    let mut display = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme)
        .to_string();

    if url.path() == "/" && url.query().is_none() && url.fragment().is_none() {
        display.truncate(display.trim_end_matches('/').len());
    }

    if display.chars().count() > MAX_DISPLAY_CHARS {
        let kept: String = display.chars().take(MAX_DISPLAY_CHARS - 3).collect();
        display = format!("{kept}...");
    }
    display
}

/// Creates link references, caching the structurally valid ones.
pub struct LinkResolver {
    cache: LinkCache,
}

impl LinkResolver {
    /// Create a resolver with a cache of the given capacity.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: LinkCache::new(cache_capacity),
        }
    }

    /// Build the reference for `raw`.
    ///
    /// Never fails: input that is not a URL yields a degraded reference that
    /// uses the raw text as both value and label and is not cached.
    /// Metadata only applies when the link is not already cached.
    pub fn create_link_context(
        &self,
        raw: &str,
        metadata: Option<&LinkMetadata>,
    ) -> SharedReference {
        if let Some(cached) = self.cache.get(raw) {
            return cached;
        }

        let title = metadata.and_then(|m| m.title.clone());
        let description = metadata.and_then(|m| m.description.clone());

        let Some(url) = normalize_link(raw) else {
            debug!("Treating {raw:?} as an unparsed link");
            let mut reference = Reference::new(ReferenceKind::Link, raw, raw);
            reference.metadata.title = title;
            reference.metadata.description = description;
            return SharedReference::new(reference);
        };

        let display_name = title.clone().unwrap_or_else(|| display_url(&url));
        let mut reference = Reference::new(ReferenceKind::Link, url.as_str(), display_name)
            .with_locator(ResourceLocator::Url(url));
        reference.metadata.title = title;
        reference.metadata.description = description;

        let shared = SharedReference::new(reference);
        self.cache.insert(raw, shared.clone());
        shared
    }

    /// The cached reference for `raw` if its page has not been read yet.
    ///
    /// Unparsable input is never cached, so it never needs enrichment.
    pub fn pending_enrichment(&self, raw: &str) -> Option<SharedReference> {
        self.cache.pending_enrichment(raw)
    }

    /// Record a successful enrichment of the link cached for `raw`.
    pub fn mark_enriched(&self, raw: &str) {
        if !self.cache.mark_enriched(raw) {
            debug!("Link {raw:?} left the cache before enrichment finished");
        }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &LinkCache {
        &self.cache
    }
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self::new(LinkCache::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bare_domain_gets_https() {
        let resolver = LinkResolver::default();
        let reference = resolver.create_link_context("example.com", None).snapshot();

        assert_eq!(reference.kind, ReferenceKind::Link);
        assert_eq!(reference.value(), "https://example.com/");
        assert_eq!(reference.display_name, "example.com");
        assert_eq!(
            reference.url().map(Url::as_str),
            Some("https://example.com/")
        );
    }

    #[test]
    fn test_same_raw_input_returns_cached_instance() {
        let resolver = LinkResolver::default();

        let first = resolver.create_link_context("example.com", None);
        let second = resolver.create_link_context("example.com", None);

        assert!(first.ptr_eq(&second));
        let stats = resolver.cache().stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (1, 1, 1));
    }

    #[test]
    fn test_unparsable_input_is_degraded_and_not_cached() {
        let resolver = LinkResolver::default();
        let raw = "not a url at all???";

        let first = resolver.create_link_context(raw, None);
        let second = resolver.create_link_context(raw, None);

        assert_eq!(first.value(), raw);
        assert_eq!(first.display_name(), raw);
        assert_eq!(first.url(), None);
        assert!(!first.ptr_eq(&second));
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn test_link_is_pending_until_marked() {
        let resolver = LinkResolver::default();
        let reference = resolver.create_link_context("example.com", None);

        assert!(
            resolver
                .pending_enrichment("example.com")
                .unwrap()
                .ptr_eq(&reference)
        );
        resolver.mark_enriched("example.com");
        assert!(resolver.pending_enrichment("example.com").is_none());

        resolver.create_link_context("not a url at all???", None);
        assert!(resolver.pending_enrichment("not a url at all???").is_none());
    }

    #[test]
    fn test_supplied_metadata() {
        let resolver = LinkResolver::default();
        let metadata = LinkMetadata::titled("Rust docs").with_description("API docs");

        let reference = resolver
            .create_link_context("https://docs.rs/tokio", Some(&metadata))
            .snapshot();

        assert_eq!(reference.display_name, "Rust docs");
        assert_eq!(reference.metadata.title.as_deref(), Some("Rust docs"));
        assert_eq!(reference.metadata.description.as_deref(), Some("API docs"));
    }

    #[test]
    fn test_cache_hit_ignores_new_metadata() {
        let resolver = LinkResolver::default();
        resolver.create_link_context("example.com", None);

        let reference = resolver
            .create_link_context("example.com", Some(&LinkMetadata::titled("Other")))
            .snapshot();

        assert_eq!(reference.display_name, "example.com");
    }

    #[test]
    fn test_normalize_link() {
        assert_eq!(
            normalize_link("http://example.com/a?b=1").map(String::from),
            Some("http://example.com/a?b=1".to_string())
        );
        assert_eq!(
            normalize_link("localhost:3000/api").map(String::from),
            Some("https://localhost:3000/api".to_string())
        );
        assert_eq!(normalize_link("not a url at all???"), None);
        assert_eq!(normalize_link(""), None);
    }

    #[test]
    fn test_display_url_strips_scheme_and_www() {
        let url = Url::parse("https://www.example.com/docs/intro").unwrap();
        assert_eq!(display_url(&url), "example.com/docs/intro");

        let url = Url::parse("http://example.com/").unwrap();
        assert_eq!(display_url(&url), "example.com");
    }

    #[test]
    fn test_display_url_truncates_long_urls() {
        let url = Url::parse(&format!("https://example.com/{}", "a".repeat(80))).unwrap();
        let display = display_url(&url);

        assert_eq!(display.chars().count(), 50);
        assert!(display.ends_with("..."));
        assert!(display.starts_with("example.com/aaa"));
    }
}
