//! Common test utilities for hubscout integration tests.
//!
//! Provides `FakeRemote`, a scripted stand-in for the GitHub API, and
//! `TestEnv`, which wires it to a controller with an inspectable cache.

#![allow(dead_code)] // Test utilities may not all be used in every test file

use hubscout::api::{CoarseHit, RateLimitState, RemoteService, SearchPage, UserRecord};
use hubscout::error::{ApiError, ApiResult, DbError, DbResult};
use hubscout::services::{ControllerEvent, MemoryCache, SearchCache, SearchController, SearchState};
use hubscout::SearchConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// How long tests wait for a cycle before failing.
pub const CYCLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Scripted answer for one account lookup.
#[derive(Debug, Clone)]
pub enum UserReply {
    Found(UserRecord),
    RateLimited,
    NotFound,
}

#[derive(Debug, Clone)]
struct Scripted<T> {
    delay: Duration,
    reply: T,
}

/// In-process fake of the three remote calls.
///
/// Unscripted searches fail with a decode error; unscripted users are 404s.
pub struct FakeRemote {
    quota: Mutex<Option<RateLimitState>>,
    searches: Mutex<HashMap<String, Scripted<Option<Vec<CoarseHit>>>>>,
    users: Mutex<HashMap<String, Scripted<UserReply>>>,
    pub rate_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub user_calls: AtomicUsize,
    /// Queries passed to `search_users`, in call order
    pub searched: Mutex<Vec<String>>,
    /// Logins whose lookup finished, in completion order
    pub completed: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            quota: Mutex::new(Some(RateLimitState {
                remaining: 50,
                reset_at: 0,
                limit: 60,
            })),
            searches: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            rate_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            user_calls: AtomicUsize::new(0),
            searched: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Sets the remaining quota reported by `rate_limit`.
    pub fn set_remaining(&self, remaining: u64) {
        *self.quota.lock().unwrap() = Some(RateLimitState {
            remaining,
            reset_at: 0,
            limit: 60,
        });
    }

    /// Makes `rate_limit` fail with a transport-like error.
    pub fn fail_rate_limit(&self) {
        *self.quota.lock().unwrap() = None;
    }

    /// Scripts a search that returns accounts with the given logins.
    pub fn script_search(&self, query: &str, logins: &[&str]) {
        self.script_search_delayed(query, logins, Duration::ZERO);
    }

    pub fn script_search_delayed(&self, query: &str, logins: &[&str], delay: Duration) {
        let hits = logins.iter().map(|l| CoarseHit::new(*l)).collect();
        self.searches.lock().unwrap().insert(
            query.to_string(),
            Scripted {
                delay,
                reply: Some(hits),
            },
        );
    }

    /// Scripts a search that fails.
    pub fn script_search_failure(&self, query: &str) {
        self.searches.lock().unwrap().insert(
            query.to_string(),
            Scripted {
                delay: Duration::ZERO,
                reply: None,
            },
        );
    }

    /// Scripts a found user with the given repository count.
    pub fn script_user(&self, login: &str, public_repos: u32) {
        self.script_user_reply(
            login,
            UserReply::Found(UserRecord::new(login, public_repos)),
            Duration::ZERO,
        );
    }

    pub fn script_user_reply(&self, login: &str, reply: UserReply, delay: Duration) {
        self.users
            .lock()
            .unwrap()
            .insert(login.to_string(), Scripted { delay, reply });
    }

    pub fn total_calls(&self) -> usize {
        self.rate_calls.load(Ordering::SeqCst)
            + self.search_calls.load(Ordering::SeqCst)
            + self.user_calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteService for FakeRemote {
    async fn rate_limit(&self) -> ApiResult<RateLimitState> {
        self.rate_calls.fetch_add(1, Ordering::SeqCst);
        let quota = *self.quota.lock().unwrap();
        quota.ok_or_else(|| ApiError::Status {
            url: "fake://rate_limit".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        })
    }

    async fn search_users(&self, query: &str) -> ApiResult<SearchPage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.searched.lock().unwrap().push(query.to_string());
        let script = self.searches.lock().unwrap().get(query).cloned();

        let Some(script) = script else {
            return Err(decode_error("search"));
        };
        tokio::time::sleep(script.delay).await;
        match script.reply {
            Some(items) => Ok(SearchPage {
                total_count: items.len() as u64,
                items,
            }),
            None => Err(decode_error("search")),
        }
    }

    async fn fetch_user(&self, login: &str) -> ApiResult<UserRecord> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.users.lock().unwrap().get(login).cloned();
        let script = script.unwrap_or(Scripted {
            delay: Duration::ZERO,
            reply: UserReply::NotFound,
        });

        tokio::time::sleep(script.delay).await;
        self.completed.lock().unwrap().push(login.to_string());
        match script.reply {
            UserReply::Found(record) => Ok(record),
            UserReply::RateLimited => Err(ApiError::RateLimited),
            UserReply::NotFound => Err(ApiError::Status {
                url: format!("fake://users/{login}"),
                status: 404,
                body: r#"{"message":"Not Found"}"#.to_string(),
            }),
        }
    }
}

fn decode_error(what: &str) -> ApiError {
    ApiError::Decode {
        url: format!("fake://{what}"),
        reason: "expected value at line 1 column 1".to_string(),
    }
}

/// Cache wrapper that counts calls and can be told to fail.
#[derive(Default)]
pub struct CountingCache {
    inner: MemoryCache,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl CountingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peek(&self, query: &str) -> Option<String> {
        self.inner.get(query).unwrap()
    }

    /// Writes straight to the backing store without counting.
    pub fn seed(&self, query: &str, value: &str) {
        self.inner.set(query, value).unwrap();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl SearchCache for CountingCache {
    fn get(&self, query: &str) -> DbResult<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::Poisoned);
        }
        self.inner.get(query)
    }

    fn set(&self, query: &str, value: &str) -> DbResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Poisoned);
        }
        self.inner.set(query, value)
    }
}

/// A controller wired to a fake remote and a counting cache.
pub struct TestEnv {
    pub remote: Arc<FakeRemote>,
    pub cache: Arc<CountingCache>,
    pub controller: SearchController<FakeRemote>,
    pub events: broadcast::Receiver<ControllerEvent>,
    /// Every event received so far through `next_terminal`
    pub seen: Vec<ControllerEvent>,
}

impl TestEnv {
    /// Creates an environment with default configuration.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(config: SearchConfig) -> Self {
        let remote = Arc::new(FakeRemote::new());
        let cache = Arc::new(CountingCache::new());
        let controller = SearchController::new(
            config,
            Arc::clone(&remote),
            Arc::clone(&cache) as Arc<dyn SearchCache>,
        )
        .expect("Failed to create controller");
        let events = controller.subscribe();

        Self {
            remote,
            cache,
            controller,
            events,
            seen: Vec::new(),
        }
    }

    pub fn state(&self) -> SearchState {
        self.controller.snapshot()
    }

    /// Waits for the next event that ends a cycle (emitted, discarded or
    /// suppressed), recording everything seen on the way.
    pub async fn next_terminal(&mut self) -> ControllerEvent {
        let deadline = tokio::time::Instant::now() + CYCLE_TIMEOUT;
        loop {
            let event = tokio::time::timeout_at(deadline, self.events.recv())
                .await
                .expect("Timed out waiting for a search cycle to finish")
                .expect("Event channel closed");
            self.seen.push(event.clone());
            if matches!(
                event,
                ControllerEvent::Emitted { .. }
                    | ControllerEvent::Discarded { .. }
                    | ControllerEvent::Suppressed { .. }
            ) {
                return event;
            }
        }
    }

    /// Drains events already queued without waiting.
    pub fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.seen.push(event);
        }
    }

    /// Number of cycles that started, as seen so far.
    pub fn cycles_started(&self) -> usize {
        self.seen
            .iter()
            .filter(|e| matches!(e, ControllerEvent::CycleStarted { .. }))
            .count()
    }

    pub fn advisories(&self) -> Vec<hubscout::services::Advisory> {
        self.seen
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::Advisory(a) => Some(*a),
                _ => None,
            })
            .collect()
    }
}

/// Logins of the displayable records in a state, in order.
pub fn logins(state: &SearchState) -> Vec<String> {
    state.records().map(|r| r.login.clone()).collect()
}
