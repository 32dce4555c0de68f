//! Error types for hubscout.
//!
//! Uses thiserror for ergonomic error handling with proper
//! error chain propagation.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Remote service errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("API rate limit exceeded")]
    RateLimited,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Cache database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Why a search cycle stopped before emitting.
///
/// None of these reach the user as an error. The controller logs them and
/// publishes them on its event channel.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Rate limit check failed: {0}")]
    RateLimitCheck(#[source] ApiError),

    #[error("Quota exhausted, resets at {reset_at}")]
    QuotaExhausted { reset_at: u64 },

    #[error("Search for '{query}' failed: {source}")]
    Search {
        query: String,
        #[source]
        source: ApiError,
    },

    #[error("Cache lookup for '{query}' failed: {source}")]
    CacheRead {
        query: String,
        #[source]
        source: DbError,
    },

    #[error("Cache write for '{query}' failed: {source}")]
    CacheWrite {
        query: String,
        #[source]
        source: DbError,
    },

    #[error("Cache task did not complete: {0}")]
    CacheTask(#[from] tokio::task::JoinError),

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for top-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for remote service calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Result type alias for cache database operations.
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Result type alias for search cycles.
pub type CycleResult<T> = std::result::Result<T, CycleError>;

// Error code implementations for machine-readable reporting
impl Error {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Api(e) => e.code(),
            Self::Database(e) => e.code(),
            Self::Cycle(e) => e.code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl ApiError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::Status { .. } => "HTTP_STATUS",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::Client(_) => "CLIENT_ERROR",
        }
    }
}

impl DbError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "SQLITE_ERROR",
            Self::Pool(_) => "POOL_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::Poisoned => "CACHE_POISONED",
        }
    }
}

impl CycleError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimitCheck(e) | Self::Search { source: e, .. } => e.code(),
            Self::QuotaExhausted { .. } => "QUOTA_EXHAUSTED",
            Self::CacheRead { source: e, .. } | Self::CacheWrite { source: e, .. } => e.code(),
            Self::CacheTask(_) => "CACHE_TASK_FAILED",
            Self::Serialize(_) => "SERIALIZE_ERROR",
        }
    }
}
