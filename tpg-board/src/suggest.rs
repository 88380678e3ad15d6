//! Debounced, cancelable stop-name autocomplete.
//!
//! Every keystroke bumps a generation counter; whatever was debouncing or
//! in flight for an older generation abandons itself at its next
//! checkpoint. Exactly one suggestion request is therefore ever applied
//! per burst of input, and a superseded response can never overwrite the
//! display, even when it arrives after the newer one.
//!
//! Queries of two characters or fewer, and queries identical to the last
//! dispatched one, short-circuit without a network call.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::catalog::{CatalogCache, CatalogFeed};
use crate::resolve::{CanonicalStop, canonicalize, confirm, is_known_stop};
use crate::search::StationSearch;

/// Maximum number of suggestions shown.
pub const SUGGESTIONS_LIMIT: usize = 4;

/// Debounce window for the stop-name field.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Outcome of one input event, mapped onto the pipeline state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    /// A new suggestion list to display.
    Updated(Vec<CanonicalStop>),
    /// Query too short; any shown suggestions should be cleared.
    Cleared,
    /// Query identical to the last dispatched one; keep what is shown.
    Unchanged,
    /// Superseded by newer input. Never surfaced to the user.
    Cancelled,
    /// The lookup failed; the suggestion list clears silently.
    Failed,
}

/// Tuning knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct SuggestionConfig {
    pub debounce: Duration,
    pub limit: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_DELAY,
            limit: SUGGESTIONS_LIMIT,
        }
    }
}

/// The autocomplete pipeline. One instance per input field.
pub struct SuggestionPipeline<S, C> {
    search: S,
    catalog: CatalogCache<C>,
    config: SuggestionConfig,
    generation: AtomicU64,
    last_dispatched: Mutex<Option<String>>,
}

impl<S: StationSearch, C: CatalogFeed> SuggestionPipeline<S, C> {
    pub fn new(search: S, catalog: CatalogCache<C>, config: SuggestionConfig) -> Self {
        Self {
            search,
            catalog,
            config,
            generation: AtomicU64::new(0),
            last_dispatched: Mutex::new(None),
        }
    }

    /// Handle one keystroke's worth of input.
    ///
    /// Debounces, then resolves the query into a deduplicated, confirmed,
    /// truncated suggestion list. Every `await` below is followed by a
    /// generation check, so cancellation is observed before results are
    /// applied, never after.
    pub async fn on_input(&self, query: &str) -> SuggestionOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.config.debounce).await;
        if self.superseded(generation) {
            return SuggestionOutcome::Cancelled;
        }

        let query = query.trim();
        if query.chars().count() <= 2 {
            return SuggestionOutcome::Cleared;
        }

        {
            let mut last = self.last_dispatched.lock().unwrap_or_else(|e| e.into_inner());
            if last.as_deref() == Some(query) {
                return SuggestionOutcome::Unchanged;
            }
            *last = Some(query.to_string());
        }

        let Ok(catalog) = self.catalog.get().await else {
            return SuggestionOutcome::Failed;
        };
        if self.superseded(generation) {
            return SuggestionOutcome::Cancelled;
        }

        let stations = match self.search.search(query).await {
            Ok(stations) => stations,
            Err(_) => {
                return if self.superseded(generation) {
                    SuggestionOutcome::Cancelled
                } else {
                    SuggestionOutcome::Failed
                };
            }
        };
        if self.superseded(generation) {
            return SuggestionOutcome::Cancelled;
        }

        // Dedupe by name, first occurrence wins, API order preserved.
        let mut seen_names = Vec::new();
        let candidates: Vec<_> = stations
            .into_iter()
            .filter(|s| {
                if seen_names.contains(&s.name) {
                    false
                } else {
                    seen_names.push(s.name.clone());
                    true
                }
            })
            .take(self.config.limit)
            .collect();

        // Confirm TPG membership for each candidate in parallel. Individual
        // failures drop the candidate rather than failing the batch.
        let confirmations = join_all(candidates.iter().map(|station| async {
            let full_name = canonicalize(&station.name, &catalog);
            if !is_known_stop(&full_name, &catalog) {
                return None;
            }
            confirm(&self.search, &full_name).await.ok().flatten()
        }))
        .await;

        if self.superseded(generation) {
            return SuggestionOutcome::Cancelled;
        }

        let mut seen_ids = Vec::new();
        let suggestions: Vec<CanonicalStop> = confirmations
            .into_iter()
            .flatten()
            .filter(|stop| {
                if seen_ids.contains(&stop.id) {
                    false
                } else {
                    seen_ids.push(stop.id.clone());
                    true
                }
            })
            .take(self.config.limit)
            .collect();

        SuggestionOutcome::Updated(suggestions)
    }

    fn superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}

/// Single-slot task holder: submitting new work aborts whatever was still
/// running for the previous input event.
#[derive(Default)]
pub struct InputSlot {
    current: Option<JoinHandle<()>>,
}

impl InputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the in-flight task, aborting its predecessor.
    pub fn submit(&mut self, fut: impl Future<Output = ()> + Send + 'static) {
        if let Some(previous) = self.current.take() {
            previous.abort();
        }
        self.current = Some(tokio::spawn(fut));
    }
}

impl Drop for InputSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.abort();
        }
    }
}
