//! Resolve the mentions in a line of text against a local directory.
//!
//! ```text
//! RUST_LOG=debug cargo run -p mentions-service --example resolve_text -- . "see @file:Cargo.toml and @link:docs.rs"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use mentions_service::{ContextService, EnrichmentEvent, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().context("usage: resolve_text <root> <text>")?);
    let text = args.collect::<Vec<_>>().join(" ");

    let config = match std::env::var_os("MENTIONS_CONFIG") {
        Some(path) => ServiceConfig::load(path.as_ref()).await?,
        None => ServiceConfig::default(),
    };
    let config = config.with_root(root);
    let service = ContextService::new(config)?;
    let mut events = service.subscribe();

    let processed = service.process_text(&text).await;
    for reference in &processed.references {
        println!("{}", service.format_reference(&reference.snapshot()));
    }

    service.wait_for_enrichment().await;
    while let Ok(event) = events.try_recv() {
        match event {
            EnrichmentEvent::Updated { reference } => {
                println!("{} -> {}", reference.value(), reference.display_name);
            }
            EnrichmentEvent::Failed { value, error } => println!("{value}: {error}"),
            EnrichmentEvent::Unchanged { .. } | EnrichmentEvent::Skipped { .. } => {}
        }
    }

    let completions = service.get_completions(&text, text.len()).await;
    if !completions.is_empty() {
        println!("completions:");
        for candidate in completions {
            println!("  {}", service.format_reference(&candidate));
        }
    }

    service.dispose().await?;
    Ok(())
}
