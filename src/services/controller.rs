//! Debounce-and-dispatch search controller.
//!
//! Turns a stream of search-box snapshots into at most one search cycle per
//! idle period and publishes the result of the latest non-superseded cycle.
//!
//! # Cycle
//!
//! ```text
//! on_input ──► debounce timer ──► cache.get ──hit──────────────────────────► emit
//!                                    │
//!                                   miss ─► rate limit ─► search ─► enrich ─► cache.set ─► emit
//! ```
//!
//! Every input bumps a generation counter while holding the state lock. A
//! cycle may only emit if its generation is still current, and that check is
//! done under the same lock, so a superseded cycle can never overwrite the
//! state of a newer one. Superseded cycles are not cancelled: their network
//! calls run to completion and still populate the cache.

use crate::api::{RemoteService, Slot, UserRecord};
use crate::config::SearchConfig;
use crate::error::{CycleError, CycleResult, Error, Result};
use crate::services::cache::SearchCache;
use crate::services::enricher::ResultEnricher;
use crate::services::rate_limiter::{Advisory, Gate, RateLimiter};
use crate::types::{Generation, Query};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Observable state consumed by the display layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Text of the search box, updated on every input
    pub search_text: String,
    /// Result set of the latest completed, non-superseded cycle
    pub results: Vec<Slot>,
    /// Whether that cycle found zero accounts
    pub no_results_found: bool,
}

impl SearchState {
    /// Displayable records, skipping sentinel slots.
    pub fn records(&self) -> impl Iterator<Item = &UserRecord> {
        self.results.iter().filter_map(Slot::record)
    }
}

/// Where an emitted result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Cache,
    Remote,
}

/// How a cycle ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Results were emitted.
    Emitted { source: ResultSource, count: usize },
    /// Results were ready but a newer input had superseded the cycle.
    Superseded { source: ResultSource },
    /// The query was below the minimum length; nothing ran.
    TooShort,
}

/// Side-channel notifications. Nothing here changes `SearchState`.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A debounce timer fired and a cycle began.
    CycleStarted { generation: Generation, query: Query },
    /// Quota advisory from the rate-limit gate.
    Advisory(Advisory),
    /// A cycle updated the observable state.
    Emitted {
        generation: Generation,
        query: Query,
        source: ResultSource,
        count: usize,
    },
    /// A cycle finished after being superseded; its results were dropped.
    Discarded { generation: Generation, query: Query },
    /// A failure that was kept away from the user.
    Suppressed {
        generation: Generation,
        query: Query,
        error: Arc<CycleError>,
    },
}

struct Inner<R> {
    config: SearchConfig,
    remote: Arc<R>,
    cache: Arc<dyn SearchCache>,
    limiter: RateLimiter<R>,
    enricher: ResultEnricher<R>,
    runtime: Handle,
    /// Latest input generation. Written only inside the state lock.
    generation: AtomicU64,
    /// Single debounce slot; arming always aborts the previous timer.
    timer: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<SearchState>,
    events: broadcast::Sender<ControllerEvent>,
}

/// Owns the debounce timer and the observable search state.
///
/// Cheap to clone; clones share the same state.
pub struct SearchController<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for SearchController<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteService> SearchController<R> {
    /// Creates a controller bound to the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when called outside a tokio runtime.
    pub fn new(config: SearchConfig, remote: Arc<R>, cache: Arc<dyn SearchCache>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Config(format!("search controller needs a tokio runtime: {e}")))?;
        let (state, _) = watch::channel(SearchState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                limiter: RateLimiter::new(Arc::clone(&remote), config.low_quota_threshold),
                enricher: ResultEnricher::new(Arc::clone(&remote)),
                config,
                remote,
                cache,
                runtime,
                generation: AtomicU64::new(Generation::INITIAL.as_u64()),
                timer: Mutex::new(None),
                state,
                events,
            }),
        })
    }

    /// Records the new search-box text and re-arms the debounce timer.
    ///
    /// The text is visible in [`state`](Self::state) immediately. A timer is
    /// armed only when the text reaches the minimum query length; either way
    /// any pending timer is cancelled and in-flight cycles are superseded.
    pub fn on_input(&self, text: &str) {
        let inner = &self.inner;
        let query = Query::new(text);

        let mut slot = inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.take() {
            pending.abort();
        }

        let generation = inner.supersede(|state| {
            state.search_text = text.to_string();
        });

        if query.is_searchable(inner.config.min_query_len) {
            tracing::debug!(%generation, %query, "Arming debounce timer");
            *slot = Some(inner.arm(query, generation));
        } else {
            tracing::trace!(%generation, %query, "Query too short, no search scheduled");
        }
    }

    /// Handles the search box's clear action.
    ///
    /// With `previous_text` this behaves like [`on_input`](Self::on_input).
    /// Without it, pending and in-flight cycles are superseded and the results
    /// are emptied at once, with no network call.
    pub fn on_clear(&self, previous_text: Option<&str>) {
        if let Some(text) = previous_text {
            self.on_input(text);
            return;
        }

        let inner = &self.inner;
        let mut slot = inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.take() {
            pending.abort();
        }
        let generation = inner.supersede(|state| {
            state.results.clear();
            state.no_results_found = false;
        });
        tracing::debug!(%generation, "Results cleared");
    }

    /// Runs one cycle for `text` right away, skipping the debounce.
    ///
    /// Counts as an input: the text becomes the search text and any pending
    /// timer or in-flight cycle is superseded.
    ///
    /// # Errors
    ///
    /// Returns the `CycleError` that stopped the cycle, shared with the
    /// [`ControllerEvent::Suppressed`] event published for it.
    pub async fn search_now(&self, text: &str) -> std::result::Result<CycleOutcome, Arc<CycleError>> {
        let inner = &self.inner;
        let query = Query::new(text);

        let generation = {
            let mut slot = inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = slot.take() {
                pending.abort();
            }
            inner.supersede(|state| {
                state.search_text = text.to_string();
            })
        };

        if !query.is_searchable(inner.config.min_query_len) {
            return Ok(CycleOutcome::TooShort);
        }

        inner.publish(ControllerEvent::CycleStarted {
            generation,
            query: query.clone(),
        });
        match inner.run_cycle(&query, generation).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => Err(inner.report(generation, query, error)),
        }
    }

    /// Watches the observable state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to advisories and suppressed failures.
    ///
    /// Optional: events are dropped when nobody listens.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.inner.events.subscribe()
    }

    /// The latest input generation.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.inner.current_generation()
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.inner.config
    }
}

impl<R: RemoteService> Inner<R> {
    fn current_generation(&self) -> Generation {
        Generation::new(self.generation.load(Ordering::SeqCst))
    }

    /// Applies `update` and starts a new generation, atomically.
    fn supersede(&self, update: impl FnOnce(&mut SearchState)) -> Generation {
        let mut generation = Generation::INITIAL;
        self.state.send_modify(|state| {
            update(state);
            generation = Generation::new(self.generation.fetch_add(1, Ordering::SeqCst)).next();
        });
        generation
    }

    fn publish(&self, event: ControllerEvent) {
        // Err only means there are no subscribers
        let _ = self.events.send(event);
    }

    /// Spawns the debounce timer for one input snapshot.
    ///
    /// The timer holds a weak reference so a dropped controller does not keep
    /// a pending search alive. Once it fires, the cycle runs as its own task:
    /// aborting a later timer must not cancel a cycle that already started.
    fn arm(self: &Arc<Self>, query: Query, generation: Generation) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let delay = self.config.debounce;

        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.current_generation() != generation {
                tracing::debug!(%generation, "Debounce fired for superseded input");
                return;
            }
            let runtime = inner.runtime.clone();
            runtime.spawn(async move {
                inner.run_and_report(query, generation).await;
            });
        })
    }

    /// Runs a cycle and swallows its error after reporting it.
    async fn run_and_report(&self, query: Query, generation: Generation) {
        self.publish(ControllerEvent::CycleStarted {
            generation,
            query: query.clone(),
        });
        match self.run_cycle(&query, generation).await {
            Ok(outcome) => tracing::debug!(%generation, %query, ?outcome, "Search cycle finished"),
            Err(error) => {
                self.report(generation, query, error);
            }
        }
    }

    /// Logs a cycle failure and publishes it instead of surfacing it.
    fn report(&self, generation: Generation, query: Query, error: CycleError) -> Arc<CycleError> {
        tracing::warn!(%generation, %query, code = error.code(), "Search cycle aborted: {error}");
        let error = Arc::new(error);
        self.publish(ControllerEvent::Suppressed {
            generation,
            query,
            error: Arc::clone(&error),
        });
        error
    }

    /// One search cycle: cache, then rate limit, search, enrich, populate.
    async fn run_cycle(&self, query: &Query, generation: Generation) -> CycleResult<CycleOutcome> {
        let cached = self.cache_get(query).await?;

        if let Some(payload) = cached {
            match serde_json::from_str::<Vec<Slot>>(&payload) {
                Ok(slots) => {
                    tracing::info!(%generation, %query, count = slots.len(), "Cache hit");
                    return Ok(self.emit(generation, query, slots, ResultSource::Cache));
                }
                Err(e) => {
                    tracing::warn!(%query, "Unreadable cache entry, searching remotely: {e}");
                }
            }
        }

        let gate = self.limiter.gate().await.map_err(CycleError::RateLimitCheck)?;
        if let Some(advisory) = gate.advisory() {
            tracing::warn!(%generation, "{advisory}");
            self.publish(ControllerEvent::Advisory(advisory));
        }
        if let Gate::Blocked(state, _) = gate {
            return Err(CycleError::QuotaExhausted {
                reset_at: state.reset_at,
            });
        }

        let page = self
            .remote
            .search_users(query.as_str())
            .await
            .map_err(|source| CycleError::Search {
                query: query.to_string(),
                source,
            })?;
        tracing::debug!(%generation, %query, hits = page.items.len(), total = page.total_count, "Coarse search done");

        let slots = if page.items.is_empty() {
            Vec::new()
        } else {
            self.enricher.enrich(&page.items).await
        };

        // Populate before emitting so a later identical query sees the entry
        let payload = serde_json::to_string(&slots)?;
        if let Err(error) = self.cache_set(query, payload).await {
            tracing::warn!(%generation, code = error.code(), "{error}");
            self.publish(ControllerEvent::Suppressed {
                generation,
                query: query.clone(),
                error: Arc::new(error),
            });
        }

        Ok(self.emit(generation, query, slots, ResultSource::Remote))
    }

    /// Cache lookup on the blocking pool, since `Database` may wait on a
    /// locked file for up to its busy timeout.
    async fn cache_get(&self, query: &Query) -> CycleResult<Option<String>> {
        let cache = Arc::clone(&self.cache);
        let key = query.clone();
        self.runtime
            .spawn_blocking(move || cache.get(key.as_str()))
            .await?
            .map_err(|source| CycleError::CacheRead {
                query: query.to_string(),
                source,
            })
    }

    async fn cache_set(&self, query: &Query, payload: String) -> CycleResult<()> {
        let cache = Arc::clone(&self.cache);
        let key = query.clone();
        self.runtime
            .spawn_blocking(move || cache.set(key.as_str(), &payload))
            .await?
            .map_err(|source| CycleError::CacheWrite {
                query: query.to_string(),
                source,
            })
    }

    /// Publishes `slots` if `generation` is still the latest input.
    fn emit(
        &self,
        generation: Generation,
        query: &Query,
        slots: Vec<Slot>,
        source: ResultSource,
    ) -> CycleOutcome {
        let count = slots.len();
        let no_results_found = slots.is_empty();
        let mut slots = Some(slots);

        let applied = self.state.send_if_modified(|state| {
            if self.current_generation() != generation {
                return false;
            }
            state.results = slots.take().unwrap_or_default();
            state.no_results_found = no_results_found;
            true
        });

        if applied {
            tracing::info!(%generation, %query, count, ?source, "Results emitted");
            self.publish(ControllerEvent::Emitted {
                generation,
                query: query.clone(),
                source,
                count,
            });
            CycleOutcome::Emitted { source, count }
        } else {
            tracing::debug!(%generation, %query, "Discarding results of superseded cycle");
            self.publish(ControllerEvent::Discarded {
                generation,
                query: query.clone(),
            });
            CycleOutcome::Superseded { source }
        }
    }
}

impl<R> Drop for Inner<R> {
    fn drop(&mut self) {
        let slot = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.take() {
            pending.abort();
        }
    }
}

// Compile-time assertions for thread safety.
#[cfg(test)]
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<SearchState>();
    assert_send_sync::<ControllerEvent>();
    assert_send_sync::<SearchController<crate::api::GithubClient>>();
};
