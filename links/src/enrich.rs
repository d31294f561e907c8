//! Best-effort enrichment of link references from the live page.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use mentions_references::SharedReference;

use crate::browser::{
    BrowserLauncher, BrowserPage, BrowserSession, ExtractionPlan, LaunchOptions,
    NavigationOptions, PageSummary,
};
use crate::capture::PageArchiver;
use crate::error::Result;

/// What an enrichment did to its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// Title, display name or description were filled in.
    Updated,

    /// The page was read but every field was already set or empty.
    Unchanged,

    /// The reference has no URL to visit.
    Skipped,
}

/// Visits link targets and patches their references in place.
///
/// The browser session is launched on first use and shared by every
/// enrichment until [`dispose`](Self::dispose).
pub struct LinkEnricher {
    launcher: Arc<dyn BrowserLauncher>,
    archiver: Option<Arc<dyn PageArchiver>>,
    launch_options: LaunchOptions,
    navigation: NavigationOptions,
    plan: ExtractionPlan,
    session: Mutex<Option<Arc<dyn BrowserSession>>>,
}

impl LinkEnricher {
    /// Create an enricher that launches sessions with `launcher`.
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        launch_options: LaunchOptions,
        navigation: NavigationOptions,
    ) -> Self {
        Self {
            launcher,
            archiver: None,
            launch_options,
            navigation,
            plan: ExtractionPlan::default(),
            session: Mutex::new(None),
        }
    }

    /// Hand every enriched page to `archiver`.
    pub fn with_archiver(mut self, archiver: Arc<dyn PageArchiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Override the extraction plan.
    pub fn with_plan(mut self, plan: ExtractionPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Enrich `reference` from its page.
    ///
    /// Only unset fields are filled, so caller-supplied metadata survives.
    pub async fn enrich(&self, reference: &SharedReference) -> Result<EnrichmentOutcome> {
        let Some(url) = reference.url() else {
            debug!("Skipping enrichment of {:?}: no URL", reference.value());
            return Ok(EnrichmentOutcome::Skipped);
        };

        let summary = self.scrape(&url).await?;
        let outcome = if reference.fill_missing(&summary.title, &summary.description) {
            info!("Enriched link {url}");
            EnrichmentOutcome::Updated
        } else {
            EnrichmentOutcome::Unchanged
        };

        let archived = match &self.archiver {
            Some(archiver) => archiver.clone_page(&url).await.map(|_| ()),
            None => Ok(()),
        };
        if let Err(e) = archived {
            warn!("Failed to archive {url}: {e}");
        }

        Ok(outcome)
    }

    /// Load `url` in a new page and extract its summary.
    pub async fn scrape(&self, url: &Url) -> Result<PageSummary> {
        let mut page = self.open_page().await?;
        let result = load_and_evaluate(page.as_mut(), url, &self.navigation, &self.plan).await;
        if let Err(e) = page.close().await {
            debug!("Failed to close page for {url}: {e}");
        }
        result
    }

    /// Close the browser session, if one is running. A later enrichment
    /// launches a new one.
    pub async fn dispose(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        match session {
            Some(session) => {
                info!("Closing browser session");
                session.close().await
            }
            None => Ok(()),
        }
    }

    /// Whether a browser session is running.
    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        let mut session = self.session.lock().await;
        let active = match session.as_ref() {
            Some(active) => active.clone(),
            None => {
                debug!("Launching browser session");
                let launched = self.launcher.launch(&self.launch_options).await?;
                *session = Some(launched.clone());
                launched
            }
        };
        active.new_page().await
    }
}

async fn load_and_evaluate(
    page: &mut dyn BrowserPage,
    url: &Url,
    navigation: &NavigationOptions,
    plan: &ExtractionPlan,
) -> Result<PageSummary> {
    page.goto(url, navigation).await?;
    page.evaluate(plan).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Capture;
    use crate::error::LinkError;
    use mentions_references::{Reference, ReferenceKind, ResourceLocator};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        launches: AtomicUsize,
        session_closes: AtomicUsize,
        pages_opened: AtomicUsize,
        pages_closed: AtomicUsize,
        archived: AtomicUsize,
    }

    struct FakeLauncher {
        counters: Arc<Counters>,
        summary: PageSummary,
        fail_navigation: bool,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        summary: PageSummary,
        fail_navigation: bool,
    }

    struct FakePage {
        counters: Arc<Counters>,
        summary: PageSummary,
        fail_navigation: bool,
    }

    #[async_trait::async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self, _options: &LaunchOptions) -> Result<Arc<dyn BrowserSession>> {
            self.counters.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeSession {
                counters: self.counters.clone(),
                summary: self.summary.clone(),
                fail_navigation: self.fail_navigation,
            }))
        }
    }

    #[async_trait::async_trait]
    impl BrowserSession for FakeSession {
        async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
            self.counters.pages_opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakePage {
                counters: self.counters.clone(),
                summary: self.summary.clone(),
                fail_navigation: self.fail_navigation,
            }))
        }

        async fn close(&self) -> Result<()> {
            self.counters.session_closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl BrowserPage for FakePage {
        async fn goto(&mut self, url: &Url, options: &NavigationOptions) -> Result<()> {
            if self.fail_navigation {
                return Err(LinkError::Timeout {
                    url: url.to_string(),
                    timeout_ms: options.timeout.as_millis() as u64,
                });
            }
            Ok(())
        }

        async fn evaluate(&self, _plan: &ExtractionPlan) -> Result<PageSummary> {
            Ok(self.summary.clone())
        }

        async fn content(&self) -> Result<String> {
            Ok(String::new())
        }

        async fn styles(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn screenshot(&self) -> Result<Vec<u8>> {
            Err(LinkError::Unsupported("screenshot"))
        }

        async fn close(&mut self) -> Result<()> {
            self.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingArchiver {
        counters: Arc<Counters>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl PageArchiver for CountingArchiver {
        async fn clone_page(&self, _url: &Url) -> Result<Vec<Capture>> {
            self.counters.archived.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LinkError::Evaluation("archive full".to_string()));
            }
            Ok(Vec::new())
        }
    }

    fn example_summary() -> PageSummary {
        PageSummary {
            title: "Example".to_string(),
            description: "An example page".to_string(),
            text: Some("Hello".to_string()),
            code: Vec::new(),
        }
    }

    fn enricher(summary: PageSummary, fail_navigation: bool) -> (LinkEnricher, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let launcher = FakeLauncher {
            counters: counters.clone(),
            summary,
            fail_navigation,
        };
        let enricher = LinkEnricher::new(
            Arc::new(launcher),
            LaunchOptions::default(),
            NavigationOptions::default(),
        );
        (enricher, counters)
    }

    fn link(title: Option<&str>) -> SharedReference {
        let url = Url::parse("https://example.com/").unwrap();
        let mut reference = Reference::new(ReferenceKind::Link, url.as_str(), "example.com")
            .with_locator(ResourceLocator::Url(url));
        if let Some(title) = title {
            reference = reference.with_title(title);
            reference.display_name = title.to_string();
        }
        SharedReference::new(reference)
    }

    #[tokio::test]
    async fn test_enrich_fills_title_and_description() {
        let (enricher, counters) = enricher(example_summary(), false);
        let reference = link(None);

        let outcome = enricher.enrich(&reference).await.unwrap();

        assert_eq!(outcome, EnrichmentOutcome::Updated);
        assert_eq!(reference.display_name(), "Example");
        let metadata = reference.metadata();
        assert_eq!(metadata.title.as_deref(), Some("Example"));
        assert_eq!(metadata.description.as_deref(), Some("An example page"));
        assert_eq!(counters.pages_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enrich_keeps_supplied_title() {
        let (enricher, _) = enricher(example_summary(), false);
        let reference = link(Some("Provided"));

        let outcome = enricher.enrich(&reference).await.unwrap();

        assert_eq!(outcome, EnrichmentOutcome::Updated);
        assert_eq!(reference.display_name(), "Provided");
        assert_eq!(reference.metadata().title.as_deref(), Some("Provided"));
        assert_eq!(
            reference.metadata().description.as_deref(),
            Some("An example page")
        );
    }

    #[tokio::test]
    async fn test_empty_page_leaves_reference_unchanged() {
        let (enricher, _) = enricher(PageSummary::default(), false);
        let reference = link(None);

        let outcome = enricher.enrich(&reference).await.unwrap();

        assert_eq!(outcome, EnrichmentOutcome::Unchanged);
        assert_eq!(reference.display_name(), "example.com");
        assert_eq!(reference.metadata().title, None);
    }

    #[tokio::test]
    async fn test_reference_without_url_is_skipped() {
        let (enricher, counters) = enricher(example_summary(), false);
        let reference = SharedReference::new(Reference::new(
            ReferenceKind::Link,
            "not a url",
            "not a url",
        ));

        let outcome = enricher.enrich(&reference).await.unwrap();

        assert_eq!(outcome, EnrichmentOutcome::Skipped);
        assert_eq!(counters.launches.load(Ordering::SeqCst), 0);
        assert!(!enricher.is_active().await);
    }

    #[tokio::test]
    async fn test_navigation_failure_closes_page_and_leaves_reference() {
        let (enricher, counters) = enricher(example_summary(), true);
        let reference = link(None);

        let result = enricher.enrich(&reference).await;

        assert!(matches!(result, Err(LinkError::Timeout { .. })));
        assert_eq!(reference.display_name(), "example.com");
        assert_eq!(counters.pages_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_is_shared_then_disposed_once() {
        let (enricher, counters) = enricher(example_summary(), false);

        enricher.enrich(&link(None)).await.unwrap();
        enricher.enrich(&link(None)).await.unwrap();
        assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
        assert_eq!(counters.pages_opened.load(Ordering::SeqCst), 2);
        assert!(enricher.is_active().await);

        enricher.dispose().await.unwrap();
        enricher.dispose().await.unwrap();
        assert_eq!(counters.session_closes.load(Ordering::SeqCst), 1);
        assert!(!enricher.is_active().await);

        enricher.enrich(&link(None)).await.unwrap();
        assert_eq!(counters.launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dispose_without_session_is_noop() {
        let (enricher, counters) = enricher(example_summary(), false);

        enricher.dispose().await.unwrap();

        assert_eq!(counters.session_closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_archiver_failure_does_not_fail_enrichment() {
        let (enricher, counters) = enricher(example_summary(), false);
        let enricher = enricher.with_archiver(Arc::new(CountingArchiver {
            counters: counters.clone(),
            fail: true,
        }));

        let outcome = enricher.enrich(&link(None)).await.unwrap();

        assert_eq!(outcome, EnrichmentOutcome::Updated);
        assert_eq!(counters.archived.load(Ordering::SeqCst), 1);
    }
}
