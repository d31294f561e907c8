//! A browser that fetches pages over plain HTTP.
//!
//! No script runs, so every [`WaitUntil`](crate::browser::WaitUntil) mode
//! finishes once the response body has been read. Bodies are read up to a
//! size cap. Screenshots are not supported.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::browser::{
    BrowserLauncher, BrowserPage, BrowserSession, ExtractionPlan, LaunchOptions,
    NavigationOptions, PageSummary,
};
use crate::error::{LinkError, Result};
use crate::html;

/// Launches [`HttpSession`]s backed by a `reqwest` client.
#[derive(Debug, Clone, Copy)]
pub struct HttpBrowser {
    max_body_bytes: usize,
}

impl HttpBrowser {
    /// Default cap on the bytes read from one response.
    pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

    /// Create a new HTTP browser.
    pub fn new() -> Self {
        Self {
            max_body_bytes: Self::DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Cap the bytes read from one response.
    ///
    /// Responses that declare a larger `Content-Length` fail to load; longer
    /// bodies without one are truncated at the cap.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

impl Default for HttpBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserLauncher for HttpBrowser {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserSession>> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &options.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| LinkError::Launch(e.to_string()))?;

        info!("Launched HTTP browser session");
        Ok(Arc::new(HttpSession {
            client,
            max_body_bytes: self.max_body_bytes,
            closed: AtomicBool::new(false),
        }))
    }
}

struct HttpSession {
    client: reqwest::Client,
    max_body_bytes: usize,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LinkError::SessionClosed);
        }
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            max_body_bytes: self.max_body_bytes,
            url: None,
            html: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closed HTTP browser session");
        }
        Ok(())
    }
}

struct HttpPage {
    client: reqwest::Client,
    max_body_bytes: usize,
    url: Option<Url>,
    html: Option<String>,
}

impl HttpPage {
    fn document(&self) -> Result<&str> {
        self.html
            .as_deref()
            .ok_or_else(|| LinkError::Evaluation("no document loaded".to_string()))
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let mut response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(LinkError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let limit = self.max_body_bytes;
        let declared = response.content_length().unwrap_or(0);
        if declared > limit as u64 {
            return Err(LinkError::Navigation {
                url: url.to_string(),
                reason: format!("response of {declared} bytes exceeds the {limit} byte limit"),
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = limit - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                debug!("Truncated {url} at {limit} bytes");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl BrowserPage for HttpPage {
    async fn goto(&mut self, url: &Url, options: &NavigationOptions) -> Result<()> {
        debug!("Fetching {url}");

        let html = tokio::time::timeout(options.timeout, self.fetch(url))
            .await
            .map_err(|_| LinkError::Timeout {
                url: url.to_string(),
                timeout_ms: u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        self.url = Some(url.clone());
        self.html = Some(html);
        Ok(())
    }

    async fn evaluate(&self, plan: &ExtractionPlan) -> Result<PageSummary> {
        html::summarize(self.document()?, plan)
    }

    async fn content(&self) -> Result<String> {
        self.document().map(str::to_string)
    }

    async fn styles(&self) -> Result<Vec<String>> {
        html::stylesheets(self.document()?)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Err(LinkError::Unsupported("screenshot"))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(url) = self.url.take() {
            debug!("Closed page {url}");
        }
        self.html = None;
        Ok(())
    }
}
