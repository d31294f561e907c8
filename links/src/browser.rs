//! The browser-automation collaborator contract.
//!
//! The mention system only needs a narrow slice of a browser: launch a
//! session, open pages, navigate with a timeout and pull a summary out of
//! the loaded document. Anything that can do that (a headless Chrome driver,
//! a plain HTTP fetcher, a test fake) plugs in here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Default navigation timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for launching a browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchOptions {
    /// Run without a visible window.
    pub headless: bool,

    /// Extra command-line arguments for the browser process.
    pub args: Vec<String>,

    /// User agent override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
            ],
            user_agent: None,
        }
    }
}

/// When navigation counts as finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    /// The `load` event fired.
    Load,

    /// The `DOMContentLoaded` event fired.
    DomContentLoaded,

    /// No network activity for a short while.
    #[default]
    NetworkIdle,
}

/// Options for a single navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOptions {
    /// Completion condition.
    pub wait_until: WaitUntil,

    /// Upper bound on the whole navigation.
    pub timeout: Duration,
}

impl NavigationOptions {
    /// Network-idle navigation with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            wait_until: WaitUntil::NetworkIdle,
            timeout,
        }
    }
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_NAVIGATION_TIMEOUT)
    }
}

/// What to pull out of a loaded page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPlan {
    /// Elements tried in order for the page title.
    pub title_selectors: Vec<String>,

    /// `name` of the `<meta>` holding the description.
    pub description_meta: String,

    /// Preferred main-content regions, tried in order.
    pub content_regions: Vec<String>,

    /// Region used when no preferred region exists.
    pub fallback_region: String,

    /// Elements whose text counts as code.
    pub code_selectors: Vec<String>,
}

impl Default for ExtractionPlan {
    fn default() -> Self {
        Self {
            title_selectors: vec!["title".to_string(), "h1".to_string()],
            description_meta: "description".to_string(),
            content_regions: vec!["article".to_string(), "main".to_string()],
            fallback_region: "body".to_string(),
            code_selectors: vec!["pre".to_string(), "code".to_string()],
        }
    }
}

/// Summary extracted from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Page title, empty when none was found.
    pub title: String,

    /// Meta description, empty when none was found.
    pub description: String,

    /// Main textual content.
    pub text: Option<String>,

    /// Code blocks in document order.
    pub code: Vec<String>,
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a new session.
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserSession>>;
}

/// A running browser instance. Many pages may be open at once.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a blank page.
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>>;

    /// Shut the browser down.
    async fn close(&self) -> Result<()>;
}

/// A single page (tab).
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait per `options`.
    async fn goto(&mut self, url: &Url, options: &NavigationOptions) -> Result<()>;

    /// Evaluate an extraction plan against the loaded document.
    async fn evaluate(&self, plan: &ExtractionPlan) -> Result<PageSummary>;

    /// Serialized HTML of the loaded document.
    async fn content(&self) -> Result<String>;

    /// Style sheets used by the document.
    async fn styles(&self) -> Result<Vec<String>>;

    /// Full-page PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Close the page.
    async fn close(&mut self) -> Result<()>;
}
