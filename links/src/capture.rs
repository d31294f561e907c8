//! Page capture: screenshots, HTML and styles of a visited page, kept in
//! a bounded in-memory store and optionally persisted as JSON.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{
    BrowserLauncher, BrowserPage, BrowserSession, ExtractionPlan, LaunchOptions,
    NavigationOptions,
};
use crate::error::{LinkError, Result};

/// Kind of captured content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Text,
    Image,
    Code,
    Structured,
}

/// One piece of captured page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    /// What the content is.
    pub kind: CaptureKind,

    /// Text, base64 image data or a structured object.
    pub content: serde_json::Value,

    /// Page the content came from.
    pub url: String,

    /// When the content was captured.
    pub captured_at: DateTime<Utc>,

    /// Free-form label for where on the page it came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Capture {
    fn new(kind: CaptureKind, content: serde_json::Value, url: &Url) -> Self {
        Self {
            kind,
            content,
            url: url.to_string(),
            captured_at: Utc::now(),
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Content extractors for [`CaptureService::navigate_and_capture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extractor {
    /// Main text of each selected region.
    Text,

    /// Code blocks inside each selected region.
    Code,

    /// Serialized HTML of the page.
    Dom,

    /// Style sheets of the page.
    Styles,
}

/// What [`CaptureService::navigate_and_capture`] records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Regions to extract from. Empty means the default content regions.
    pub selectors: Vec<String>,

    /// Extractors to run.
    pub extractors: Vec<Extractor>,

    /// Record a full-page screenshot.
    pub screenshot: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            selectors: Vec::new(),
            extractors: vec![Extractor::Text, Extractor::Code],
            screenshot: false,
        }
    }
}

/// Content-persistence collaborator for visited pages.
#[async_trait]
pub trait PageArchiver: Send + Sync {
    /// Capture and keep a copy of the page at `url`.
    async fn clone_page(&self, url: &Url) -> Result<Vec<Capture>>;
}

/// Captures pages through a browser and keeps the most recent results
/// per URL.
pub struct CaptureService {
    launcher: Arc<dyn BrowserLauncher>,
    launch_options: LaunchOptions,
    navigation: NavigationOptions,
    results: Mutex<LruCache<String, Vec<Capture>>>,
    persist_dir: Option<PathBuf>,
}

impl CaptureService {
    /// Default number of pages kept in memory.
    pub const DEFAULT_CAPACITY: usize = 32;

    /// Create a service that launches sessions with `launcher`.
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            launch_options: LaunchOptions::default(),
            navigation: NavigationOptions::default(),
            results: Mutex::new(LruCache::new(capacity(Self::DEFAULT_CAPACITY))),
            persist_dir: None,
        }
    }

    /// Keep captures for at most `max_pages` pages (at least one) in memory.
    /// Persisted files are not affected.
    pub fn with_capacity(mut self, max_pages: usize) -> Self {
        self.results = Mutex::new(LruCache::new(capacity(max_pages)));
        self
    }

    /// Set the launch options.
    pub fn with_launch_options(mut self, options: LaunchOptions) -> Self {
        self.launch_options = options;
        self
    }

    /// Set the navigation options.
    pub fn with_navigation(mut self, navigation: NavigationOptions) -> Self {
        self.navigation = navigation;
        self
    }

    /// Write every capture set as JSON under `dir`.
    pub fn with_persistence(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = Some(dir.into());
        self
    }

    fn results(&self) -> MutexGuard<'_, LruCache<String, Vec<Capture>>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Captures recorded for `url`, if still in memory.
    pub fn captures(&self, url: &Url) -> Option<Vec<Capture>> {
        self.results().get(url.as_str()).cloned()
    }

    /// Number of pages whose captures are in memory.
    pub fn len(&self) -> usize {
        self.results().len()
    }

    /// Whether no captures are in memory.
    pub fn is_empty(&self) -> bool {
        self.results().is_empty()
    }

    /// File a capture set for `url` is persisted to, if persistence is on.
    pub fn persisted_path(&self, url: &Url) -> Option<PathBuf> {
        self.persist_dir
            .as_deref()
            .map(|dir| dir.join(capture_file_name(url)))
    }

    /// Navigate to `url` and record what `options` asks for.
    pub async fn navigate_and_capture(
        &self,
        url: &Url,
        options: &CaptureOptions,
    ) -> Result<Vec<Capture>> {
        let captures = self.visit(url, Job::Extract(options)).await?;
        self.record(url, captures.clone()).await?;
        Ok(captures)
    }

    /// Run `job` against `url` in a fresh session, closing the session
    /// whether or not the job succeeds.
    async fn visit(&self, url: &Url, job: Job<'_>) -> Result<Vec<Capture>> {
        let session = self.launcher.launch(&self.launch_options).await?;
        let result = self.visit_in(session.as_ref(), url, job).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close capture session: {e}");
        }
        result
    }

    async fn visit_in(
        &self,
        session: &dyn BrowserSession,
        url: &Url,
        job: Job<'_>,
    ) -> Result<Vec<Capture>> {
        let mut page = session.new_page().await?;
        let result = match page.goto(url, &self.navigation).await {
            Ok(()) => job.run(page.as_ref(), url).await,
            Err(e) => Err(e),
        };
        if let Err(e) = page.close().await {
            debug!("Failed to close capture page: {e}");
        }
        result
    }

    async fn record(&self, url: &Url, captures: Vec<Capture>) -> Result<()> {
        if let Some(path) = self.persisted_path(url) {
            persist(&path, &captures).await?;
            debug!("Persisted {} captures to {}", captures.len(), path.display());
        }
        let evicted = self
            .results()
            .push(url.to_string(), captures)
            .filter(|(evicted, _)| evicted != url.as_str());
        if let Some((evicted, _)) = evicted {
            debug!("Dropped in-memory captures for {evicted}");
        }
        Ok(())
    }
}

#[async_trait]
impl PageArchiver for CaptureService {
    async fn clone_page(&self, url: &Url) -> Result<Vec<Capture>> {
        info!("Cloning page {url}");
        let captures = self.visit(url, Job::Clone).await?;
        self.record(url, captures.clone()).await?;
        Ok(captures)
    }
}

enum Job<'a> {
    Clone,
    Extract(&'a CaptureOptions),
}

impl Job<'_> {
    async fn run(&self, page: &dyn BrowserPage, url: &Url) -> Result<Vec<Capture>> {
        match self {
            Job::Clone => clone_contents(page, url).await,
            Job::Extract(options) => extract_contents(page, url, options).await,
        }
    }
}

/// Screenshot plus HTML and styles as a single structured capture.
async fn clone_contents(page: &dyn BrowserPage, url: &Url) -> Result<Vec<Capture>> {
    let mut captures: Vec<Capture> = screenshot(page, url).await?.into_iter().collect();

    let html = page.content().await?;
    let styles = page.styles().await?;
    captures.push(
        Capture::new(
            CaptureKind::Structured,
            serde_json::json!({ "html": html, "styles": styles }),
            url,
        )
        .with_context("ui-clone"),
    );
    Ok(captures)
}

async fn extract_contents(
    page: &dyn BrowserPage,
    url: &Url,
    options: &CaptureOptions,
) -> Result<Vec<Capture>> {
    let mut captures = Vec::new();
    if options.screenshot {
        captures.extend(screenshot(page, url).await?);
    }

    let defaults = ExtractionPlan::default();
    let regions = if options.selectors.is_empty() {
        &defaults.content_regions
    } else {
        &options.selectors
    };

    let wants_text = options.extractors.contains(&Extractor::Text);
    let wants_code = options.extractors.contains(&Extractor::Code);
    if wants_text || wants_code {
        for region in regions {
            let plan = ExtractionPlan {
                content_regions: vec![region.clone()],
                ..defaults.clone()
            };
            let summary = page.evaluate(&plan).await?;
            if wants_text {
                captures.extend(summary.text.map(|text| {
                    Capture::new(CaptureKind::Text, text.into(), url).with_context(region)
                }));
            }
            if wants_code {
                captures.extend(summary.code.into_iter().map(|code| {
                    Capture::new(CaptureKind::Code, code.into(), url).with_context(region)
                }));
            }
        }
    }

    if options.extractors.contains(&Extractor::Dom) {
        let html = page.content().await?;
        captures.push(Capture::new(CaptureKind::Structured, html.into(), url).with_context("dom"));
    }
    if options.extractors.contains(&Extractor::Styles) {
        let styles = page.styles().await?;
        captures.push(
            Capture::new(CaptureKind::Structured, styles.into(), url).with_context("styles"),
        );
    }

    Ok(captures)
}

/// A base64 PNG capture, or `None` when the browser cannot take one.
async fn screenshot(page: &dyn BrowserPage, url: &Url) -> Result<Option<Capture>> {
    match page.screenshot().await {
        Ok(png) => Ok(Some(
            Capture::new(CaptureKind::Image, BASE64.encode(png).into(), url)
                .with_context("full-page"),
        )),
        Err(LinkError::Unsupported(what)) => {
            debug!("Skipping {what} for {url}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn capacity(max_pages: usize) -> NonZeroUsize {
    NonZeroUsize::new(max_pages).unwrap_or(NonZeroUsize::MIN)
}

/// SHA-256 of the URL, so names are stable across builds and platforms.
fn capture_file_name(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    format!("{digest:x}.json")
}

async fn persist(path: &Path, captures: &[Capture]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(captures)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
