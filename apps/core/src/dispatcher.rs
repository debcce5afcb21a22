use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::logging;
use crate::plugin::{ProviderError, ProviderRegistry};
use crate::query::Query;

/// One provider's completed results for one generation. Tagged so the merger
/// can evict that provider's previous rows and so stale generations can be
/// dropped on arrival.
#[derive(Debug)]
pub struct ResultBatch {
    pub generation: u64,
    pub provider_id: String,
    pub origin: Query,
    pub results: Vec<crate::model::SearchResult>,
}

/// Everything the dispatcher reports back to the engine control loop. All
/// merging and signal mutation happens there, single-writer.
#[derive(Debug)]
pub enum DispatchEvent {
    Batch(ResultBatch),
    /// Every eligible invocation for the generation completed or cancelled.
    Drained { generation: u64 },
    /// The progress grace delay elapsed with the generation possibly still
    /// running; the engine decides whether the busy flag flips.
    ProgressDue { generation: u64 },
}

/// Owns the single-active-generation invariant: at any instant exactly one
/// generation may deliver results, and starting a new one cancels the old
/// token before any new invocation is scheduled.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    events: mpsc::UnboundedSender<DispatchEvent>,
    progress_delay: Duration,
    generation: u64,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        events: mpsc::UnboundedSender<DispatchEvent>,
        progress_delay: Duration,
    ) -> Self {
        Self {
            registry,
            events,
            progress_delay,
            generation: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// Cancels whatever was in flight. Used when the input is cleared and no
    /// new generation replaces the old one.
    pub fn cancel_current(&mut self) {
        self.cancel.cancel();
    }

    /// Starts a new generation: cancel the previous token first, then mint a
    /// fresh token and fan out one blocking-pool invocation per eligible
    /// provider. Returns the new generation id.
    pub fn submit(&mut self, query: &Query) -> u64 {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation += 1;
        let generation = self.generation;

        self.arm_progress_timer(generation);

        let eligible = self.registry.eligible_for(query);
        if eligible.is_empty() {
            let _ = self.events.send(DispatchEvent::Drained { generation });
            return generation;
        }

        let remaining = Arc::new(AtomicUsize::new(eligible.len()));
        for provider in eligible {
            let query = query.clone();
            let cancel = self.cancel.clone();
            let events = self.events.clone();
            let remaining = Arc::clone(&remaining);

            tokio::task::spawn_blocking(move || {
                let provider_id = provider.metadata().id.clone();
                match provider.query(&query, &cancel) {
                    Ok(results) => {
                        let _ = events.send(DispatchEvent::Batch(ResultBatch {
                            generation,
                            provider_id,
                            origin: query,
                            results,
                        }));
                    }
                    // Superseded generation; silent, not a fault.
                    Err(ProviderError::Cancelled) => {}
                    Err(ProviderError::Failed(message)) => {
                        logging::error(&format!(
                            "provider '{provider_id}' failed for '{}': {message}",
                            query.raw_text
                        ));
                        // An empty batch still flows so the merger evicts the
                        // provider's rows from the previous generation.
                        let _ = events.send(DispatchEvent::Batch(ResultBatch {
                            generation,
                            provider_id,
                            origin: query,
                            results: Vec::new(),
                        }));
                    }
                }

                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    let _ = events.send(DispatchEvent::Drained { generation });
                }
            });
        }

        generation
    }

    fn arm_progress_timer(&self, generation: u64) {
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let delay = self.progress_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = events.send(DispatchEvent::ProgressDue { generation });
                }
            }
        });
    }
}
