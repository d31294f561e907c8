//! Link reference cache to avoid re-parsing and re-fetching the same link.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mentions_references::SharedReference;

/// A cached link and whether its page has been read.
struct CachedLink {
    reference: SharedReference,
    enriched: bool,
}

/// Bounded cache of link references keyed by the raw text the user typed.
///
/// Entries are shared handles, so a cache hit returns the same reference
/// that enrichment patches. Each entry also records whether enrichment
/// succeeded, so a cached page is fetched at most once.
pub struct LinkCache {
    /// Least-recently-used entries.
    entries: Mutex<LruCache<String, CachedLink>>,

    /// Number of lookups answered from the cache.
    hits: AtomicU64,

    /// Number of lookups that missed.
    misses: AtomicU64,
}

impl LinkCache {
    /// Default maximum number of cached links.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create a cache holding at most `max_entries` links (at least one).
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CachedLink>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a link, marking it as recently used.
    pub fn get(&self, key: &str) -> Option<SharedReference> {
        let found = self.lock().get(key).map(|entry| entry.reference.clone());
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Insert a link, evicting the least recently used one at capacity.
    pub fn insert(&self, key: impl Into<String>, reference: SharedReference) {
        let key = key.into();
        let mut entries = self.lock();
        let evicted = entries
            .push(
                key.clone(),
                CachedLink {
                    reference,
                    enriched: false,
                },
            )
            .filter(|(evicted, _)| *evicted != key);
        if let Some((evicted, _)) = evicted {
            debug!("Evicted cached link: {evicted}");
        }
    }

    /// The cached reference for `key` if it has not been enriched yet.
    ///
    /// Neither recency nor the hit counters change.
    pub fn pending_enrichment(&self, key: &str) -> Option<SharedReference> {
        self.lock()
            .peek(key)
            .filter(|entry| !entry.enriched)
            .map(|entry| entry.reference.clone())
    }

    /// Record that the page for `key` was read. Returns `false` when the
    /// link is no longer cached.
    pub fn mark_enriched(&self, key: &str) -> bool {
        match self.lock().peek_mut(key) {
            Some(entry) => {
                entry.enriched = true;
                true
            }
            None => false,
        }
    }

    /// Check if a link is cached without touching its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    /// Remove a link from the cache.
    pub fn remove(&self, key: &str) -> Option<SharedReference> {
        self.lock().pop(key).map(|entry| entry.reference)
    }

    /// Clear the entire cache.
    pub fn clear(&self) {
        self.lock().clear();
        info!("Cleared link cache");
    }

    /// Number of cached links.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            entries: entries.len(),
            max_entries: entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for LinkCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Statistics about the link cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Maximum cache size.
    pub max_entries: usize,

    /// Lookups answered from the cache.
    pub hits: u64,

    /// Lookups that missed.
    pub misses: u64,
}
