//! Wire models for the three remote calls.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Quota state reported by `GET /rate_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    /// Calls left in the current window
    pub remaining: u64,
    /// Unix timestamp (seconds) at which the window resets
    #[serde(rename = "reset")]
    pub reset_at: u64,
    /// Window size, when the service reports it
    #[serde(default)]
    pub limit: u64,
}

/// Envelope of `GET /rate_limit`. Only the core `rate` object is read.
#[derive(Debug, Deserialize)]
pub struct RateLimitResponse {
    pub rate: RateLimitState,
}

/// A search hit that identifies an account but lacks enrichment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseHit {
    pub login: String,
    /// Remaining fields from the search endpoint, untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CoarseHit {
    #[must_use]
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            extra: Map::new(),
        }
    }
}

/// Response from `GET /search/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub items: Vec<CoarseHit>,
    #[serde(default)]
    pub total_count: u64,
}

/// A detailed account record from `GET /users/{login}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    pub public_repos: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    #[must_use]
    pub fn new(login: impl Into<String>, public_repos: u32) -> Self {
        Self {
            login: login.into(),
            avatar_url: String::new(),
            public_repos,
            extra: Map::new(),
        }
    }
}

/// One position in an enriched result set.
///
/// A failed or rate-limited enrichment call leaves `RateLimited` in place of
/// the record. It serializes as JSON `null` so cached entries keep their
/// original length and order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Slot {
    Record(UserRecord),
    RateLimited,
}

impl Slot {
    /// The record in this slot, or `None` for the sentinel.
    #[must_use]
    pub fn record(&self) -> Option<&UserRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::RateLimited => None,
        }
    }

    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl From<UserRecord> for Slot {
    fn from(record: UserRecord) -> Self {
        Self::Record(record)
    }
}

/// Body returned by the API instead of a resource (rate limits, 404s, ...).
#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

impl ApiMessage {
    /// Whether this message reports an exhausted rate limit.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        self.message.to_ascii_lowercase().contains("rate limit")
    }
}
