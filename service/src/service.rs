//! The context service: completion and resolution of `@`-mentions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use mentions_links::{
    BrowserLauncher, CacheStats, CaptureService, HttpBrowser, LinkEnricher, LinkMetadata,
    LinkResolver, PageArchiver,
};
use mentions_references::{
    Match, Reference, ReferenceKind, SharedReference, find_matches, looks_like_link,
    partial_token,
};
use mentions_workspace::{FileResolver, FileSystem, Labeler, LocalFileSystem, WorkspaceLabeler};

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::tasks::{EnrichmentEvent, EnrichmentQueue};

/// Submitted text together with the references found in it.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedText {
    /// The text, unchanged.
    pub text: String,

    /// Resolved references in source order.
    pub references: Vec<SharedReference>,
}

/// Entry point for the chat composer.
pub struct ContextService {
    config: ServiceConfig,
    files: FileResolver,
    links: Arc<LinkResolver>,
    enrichment: EnrichmentQueue,
    completion_seq: AtomicU64,
}

impl ContextService {
    /// Create a new service builder.
    pub fn builder() -> ContextServiceBuilder {
        ContextServiceBuilder::new()
    }

    /// Create a service over the local disk with default collaborators.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    /// The active configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Resolve every mention in `text`.
    ///
    /// Unresolvable mentions are dropped without affecting the others. Link
    /// references come back immediately; their enrichment keeps running
    /// after this returns and patches them in place.
    pub async fn process_text(&self, text: &str) -> ProcessedText {
        let matches: Vec<Match> = find_matches(text).collect();
        debug!("Processing {} mentions", matches.len());

        let resolved = join_all(matches.iter().map(|m| self.resolve_match(m))).await;

        ProcessedText {
            text: text.to_string(),
            references: resolved.into_iter().flatten().collect(),
        }
    }

    async fn resolve_match(&self, m: &Match) -> Option<SharedReference> {
        let Some(kind) = m.declared_kind else {
            if self.config.infer_untyped {
                return self.resolve_untyped(&m.raw_value).await;
            }
            debug!("Skipping untyped mention {:?}", m.raw_value);
            return None;
        };

        match kind {
            ReferenceKind::File => self
                .files
                .create_file_context(&m.raw_value)
                .await
                .map(SharedReference::new),
            ReferenceKind::Folder => self
                .files
                .create_folder_context(&m.raw_value)
                .await
                .map(SharedReference::new),
            ReferenceKind::Link => Some(self.link_with_enrichment(&m.raw_value)),
        }
    }

    async fn resolve_untyped(&self, raw: &str) -> Option<SharedReference> {
        if let Some(file) = self.files.create_file_context(raw).await {
            return Some(SharedReference::new(file));
        }
        if let Some(folder) = self.files.create_folder_context(raw).await {
            return Some(SharedReference::new(folder));
        }
        if looks_like_link(raw) {
            return Some(self.link_with_enrichment(raw));
        }
        debug!("Could not infer a kind for {raw:?}");
        None
    }

    /// Create the link reference for `raw` and enrich it unless its page
    /// was already read. A failed enrichment is retried on the next mention.
    fn link_with_enrichment(&self, raw: &str) -> SharedReference {
        let reference = self.links.create_link_context(raw, None);
        let Some(pending) = self.links.pending_enrichment(raw) else {
            return reference;
        };

        let links = self.links.clone();
        let key = raw.to_string();
        self.enrichment.spawn_then(pending, move |event| {
            if !matches!(event, EnrichmentEvent::Failed { .. }) {
                links.mark_enriched(&key);
            }
        });
        reference
    }

    /// Candidates for the mention being typed at byte offset `cursor`.
    ///
    /// Filesystem candidates are capped at the configured completion limit.
    /// Nothing is fetched from the network.
    pub async fn get_completions(&self, text: &str, cursor: usize) -> Vec<Reference> {
        let Some(token) = partial_token(text, cursor) else {
            return Vec::new();
        };
        let limit = self.config.completion_limit;

        match token.declared_kind {
            Some(ReferenceKind::File) => self.files.file_completions(&token.prefix, limit).await,
            Some(ReferenceKind::Folder) => {
                self.files.folder_completions(&token.prefix, limit).await
            }
            Some(ReferenceKind::Link) => self.link_candidate(&token.prefix).into_iter().collect(),
            None => {
                let (files, folders) = futures::join!(
                    self.files.file_completions(&token.prefix, limit),
                    self.files.folder_completions(&token.prefix, limit),
                );
                let mut candidates: Vec<Reference> = files.into_iter().chain(folders).collect();
                candidates.truncate(limit);
                candidates.extend(self.link_candidate(&token.prefix));
                candidates
            }
        }
    }

    /// Like [`get_completions`](Self::get_completions), but returns `None`
    /// when a newer request started before this one finished.
    pub async fn complete_latest(&self, text: &str, cursor: usize) -> Option<Vec<Reference>> {
        let request = self.completion_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let candidates = self.get_completions(text, cursor).await;

        if self.completion_seq.load(Ordering::SeqCst) == request {
            Some(candidates)
        } else {
            debug!("Discarding stale completion request {request}");
            None
        }
    }

    fn link_candidate(&self, prefix: &str) -> Option<Reference> {
        if !looks_like_link(prefix) {
            return None;
        }
        Some(self.links.create_link_context(prefix, None).snapshot())
    }

    /// Create a link reference without enriching it.
    pub fn create_link_context(
        &self,
        url: &str,
        metadata: Option<&LinkMetadata>,
    ) -> SharedReference {
        self.links.create_link_context(url, metadata)
    }

    /// Text to splice into the composer for `reference`.
    pub fn format_reference(&self, reference: &Reference) -> String {
        mentions_references::format_reference(reference)
    }

    /// Receive enrichment outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<EnrichmentEvent> {
        self.enrichment.subscribe()
    }

    /// Wait for all running enrichment jobs.
    pub async fn wait_for_enrichment(&self) {
        self.enrichment.wait().await;
    }

    /// Link cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.links.cache().stats()
    }

    /// Close the browser session. Running jobs are not awaited; a later
    /// enrichment starts a new session.
    pub async fn dispose(&self) -> Result<()> {
        info!("Disposing context service");
        self.enrichment.enricher().dispose().await?;
        Ok(())
    }
}

/// Builder for [`ContextService`].
pub struct ContextServiceBuilder {
    config: ServiceConfig,
    file_system: Option<Arc<dyn FileSystem>>,
    labeler: Option<Arc<dyn Labeler>>,
    launcher: Option<Arc<dyn BrowserLauncher>>,
    archiver: Option<Arc<dyn PageArchiver>>,
}

impl ContextServiceBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
            file_system: None,
            labeler: None,
            launcher: None,
            archiver: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom filesystem instead of the local disk.
    pub fn with_file_system(mut self, file_system: Arc<dyn FileSystem>) -> Self {
        self.file_system = Some(file_system);
        self
    }

    /// Use a custom labeler.
    pub fn with_labeler(mut self, labeler: Arc<dyn Labeler>) -> Self {
        self.labeler = Some(labeler);
        self
    }

    /// Use a custom browser instead of plain HTTP fetching.
    pub fn with_browser(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Use a custom archiver for enriched pages.
    pub fn with_archiver(mut self, archiver: Arc<dyn PageArchiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<ContextService> {
        let config = self.config;
        config.validate()?;

        let file_system = self
            .file_system
            .unwrap_or_else(|| Arc::new(LocalFileSystem::new(config.workspace.clone())));
        let labeler = self
            .labeler
            .unwrap_or_else(|| Arc::new(WorkspaceLabeler::new(&config.workspace)));
        let launcher = self
            .launcher
            .unwrap_or_else(|| Arc::new(HttpBrowser::new()));

        let archiver = match self.archiver {
            Some(archiver) => archiver,
            None => {
                let mut capture = CaptureService::new(launcher.clone())
                    .with_capacity(config.capture_capacity)
                    .with_launch_options(config.launch.clone())
                    .with_navigation(config.navigation());
                if let Some(dir) = &config.capture_dir {
                    capture = capture.with_persistence(dir.clone());
                }
                Arc::new(capture)
            }
        };

        let enricher = LinkEnricher::new(launcher, config.launch.clone(), config.navigation())
            .with_archiver(archiver);
        let enrichment = EnrichmentQueue::new(Arc::new(enricher), config.event_capacity)
            .with_coalescing(config.coalesce_enrichment);

        info!(
            "Context service ready with {} workspace roots",
            config.workspace.roots.len()
        );

        Ok(ContextService {
            files: FileResolver::new(file_system, labeler),
            links: Arc::new(LinkResolver::new(config.link_cache_capacity)),
            enrichment,
            completion_seq: AtomicU64::new(0),
            config,
        })
    }
}

impl Default for ContextServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
