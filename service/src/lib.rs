//! # Mention Service
//!
//! The entry point a chat composer talks to. It completes the `@`-mention
//! being typed and resolves every mention in submitted text into
//! references, starting background enrichment for links.
//!
//! ## Features
//!
//! - **Completion**: files, folders and link candidates for the token at
//!   the cursor, with a "latest request wins" variant for fast typists
//! - **Resolution**: `@file:`, `@folder:` and `@link:` mentions resolved
//!   concurrently and returned in source order
//! - **Enrichment**: detached jobs that fill in page titles and
//!   descriptions, reported over a broadcast channel
//! - **Configuration**: TOML-loadable [`ServiceConfig`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       ContextService                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  find_matches / partial_token                                   │
//! │        │                                                        │
//! │        ├──► FileResolver (file, folder)                         │
//! │        │                                                        │
//! │        └──► LinkResolver (link) ──► EnrichmentQueue             │
//! │                                          │                      │
//! │                                          ▼                      │
//! │                             LinkEnricher ──► PageArchiver       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mentions_service::{ContextService, ServiceConfig};
//!
//! # async fn example() -> mentions_service::Result<()> {
//! let service = ContextService::new(ServiceConfig::new("/path/to/project"))?;
//!
//! let processed = service
//!     .process_text("see @file:README.md and @link:docs.rs/tokio")
//!     .await;
//! for reference in &processed.references {
//!     println!("{}", reference.display_name());
//! }
//!
//! service.wait_for_enrichment().await;
//! service.dispose().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod tasks;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use service::{ContextService, ContextServiceBuilder, ProcessedText};
pub use tasks::{EnrichmentEvent, EnrichmentQueue};

pub use mentions_links::{CacheStats, LinkMetadata};
pub use mentions_references::{Reference, ReferenceKind, SharedReference, format_reference};
