//! Runtime configuration for the search controller and HTTP client.

use std::time::Duration;

/// Default GitHub REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Configuration for the search pipeline.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// How long the input must be stable before a cycle starts
    pub debounce: Duration,
    /// Minimum query length (in characters) that triggers a search
    pub min_query_len: usize,
    /// Remaining-quota level below which a low-quota advisory is published
    pub low_quota_threshold: u64,
    /// Root URL of the remote API
    pub api_base: String,
    /// Per-request timeout; `None` keeps the transport default
    pub request_timeout: Option<Duration>,
    /// User-Agent header sent with every request (GitHub rejects requests without one)
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            min_query_len: 3,
            low_quota_threshold: 10,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: None,
            user_agent: concat!("hubscout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SearchConfig {
    /// Returns the API base without a trailing slash.
    #[must_use]
    pub fn api_root(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}
