//! # Mention Links
//!
//! Link references for `@link:` tokens and the best-effort background work
//! that makes them useful: fetching page titles and descriptions, and
//! handing captured pages to a persistence collaborator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Link Pipeline                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  LinkResolver ──► LinkCache ──► SharedReference                 │
//! │                                       │                         │
//! │                                       ▼                         │
//! │  BrowserLauncher ──► LinkEnricher ──► PageSummary               │
//! │        │                  │                                     │
//! │        ▼                  ▼                                     │
//! │   HttpBrowser       PageArchiver (CaptureService)               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Link creation is synchronous and never fails. Enrichment is async and
//! owned by the caller's task queue; its errors never reach the code that
//! created the reference.

pub mod browser;
pub mod cache;
pub mod capture;
pub mod enrich;
pub mod error;
mod html;
pub mod http;
pub mod resolver;

pub use browser::{
    BrowserLauncher, BrowserPage, BrowserSession, ExtractionPlan, LaunchOptions,
    NavigationOptions, PageSummary, WaitUntil,
};
pub use cache::{CacheStats, LinkCache};
pub use capture::{Capture, CaptureKind, CaptureOptions, CaptureService, Extractor, PageArchiver};
pub use enrich::{EnrichmentOutcome, LinkEnricher};
pub use error::{LinkError, Result};
pub use http::HttpBrowser;
pub use resolver::{LinkMetadata, LinkResolver, display_url, normalize_link};
