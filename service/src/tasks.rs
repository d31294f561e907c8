//! Detached link enrichment.
//!
//! Jobs run on the tokio runtime and are tracked so callers can wait for
//! them. Their results travel over a broadcast channel; nothing is returned
//! to the code that queued them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use mentions_links::{EnrichmentOutcome, LinkEnricher};
use mentions_references::{Reference, SharedReference};

/// Result of one enrichment job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnrichmentEvent {
    /// The reference was patched; carries its new state.
    Updated { reference: Reference },

    /// The page was read but nothing needed filling in.
    Unchanged { value: String },

    /// The reference had no URL to visit.
    Skipped { value: String },

    /// Enrichment failed; the reference is untouched.
    Failed { value: String, error: String },
}

impl EnrichmentEvent {
    /// The value of the reference the event is about.
    pub fn value(&self) -> &str {
        match self {
            Self::Updated { reference } => reference.value(),
            Self::Unchanged { value } | Self::Skipped { value } | Self::Failed { value, .. } => {
                value
            }
        }
    }
}

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Removes a link from the in-flight set when its job ends.
struct InFlightGuard {
    in_flight: InFlight,
    value: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.value);
    }
}

/// Queue of detached enrichment jobs.
pub struct EnrichmentQueue {
    enricher: Arc<LinkEnricher>,
    tracker: TaskTracker,
    events: broadcast::Sender<EnrichmentEvent>,
    in_flight: Option<InFlight>,
    waiting: tokio::sync::Mutex<()>,
}

impl EnrichmentQueue {
    /// Create a queue that buffers up to `event_capacity` events per
    /// subscriber.
    pub fn new(enricher: Arc<LinkEnricher>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            enricher,
            tracker: TaskTracker::new(),
            events,
            in_flight: None,
            waiting: tokio::sync::Mutex::new(()),
        }
    }

    /// Skip links whose enrichment is already running.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(InFlight::default);
        self
    }

    /// Receive the outcome of every job queued after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EnrichmentEvent> {
        self.events.subscribe()
    }

    /// Number of jobs still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Queue enrichment of `reference`. Returns `false` when coalescing
    /// dropped the job.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, reference: SharedReference) -> bool {
        self.spawn_then(reference, |_| {})
    }

    /// Like [`spawn`](Self::spawn), calling `on_done` with the job's event
    /// before it is published.
    pub fn spawn_then<F>(&self, reference: SharedReference, on_done: F) -> bool
    where
        F: FnOnce(&EnrichmentEvent) + Send + 'static,
    {
        let value = reference.value();

        let guard = match &self.in_flight {
            Some(in_flight) => {
                let inserted = in_flight
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(value.clone());
                if !inserted {
                    debug!("Enrichment of {value} already running");
                    return false;
                }
                Some(InFlightGuard {
                    in_flight: in_flight.clone(),
                    value: value.clone(),
                })
            }
            None => None,
        };

        let enricher = self.enricher.clone();
        let events = self.events.clone();
        self.tracker.spawn(async move {
            let _guard = guard;
            let event = match enricher.enrich(&reference).await {
                Ok(EnrichmentOutcome::Updated) => EnrichmentEvent::Updated {
                    reference: reference.snapshot(),
                },
                Ok(EnrichmentOutcome::Unchanged) => EnrichmentEvent::Unchanged { value },
                Ok(EnrichmentOutcome::Skipped) => EnrichmentEvent::Skipped { value },
                Err(e) => {
                    warn!("Enrichment of {value} failed: {e}");
                    EnrichmentEvent::Failed {
                        value,
                        error: e.to_string(),
                    }
                }
            };
            on_done(&event);
            // No subscribers is fine.
            let _ = events.send(event);
        });
        true
    }

    /// Wait until every queued job has finished, including jobs queued
    /// while waiting.
    pub async fn wait(&self) {
        let _waiting = self.waiting.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// The enricher jobs run on.
    pub fn enricher(&self) -> &Arc<LinkEnricher> {
        &self.enricher
    }
}
