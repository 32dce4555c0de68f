//! hubscout: debounced, cache-aware GitHub user search.
//!
//! The library is the orchestration core behind a search-as-you-type box:
//! - Debounce: at most one search cycle per pause in typing
//! - Cache: repeated queries are answered without network calls
//! - Rate-limit gate: quota is checked before every remote search
//! - Enrichment: per-user detail calls fan out concurrently and fan in
//!   in the original order
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │         Display (CLI, or any UI)            │
//! │   on_input / on_clear ▲ watch<SearchState>  │
//! └─────────────────┬─────┴─────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────┐
//! │            SearchController                  │
//! │  debounce slot · generation guard · events  │
//! └───────┬─────────┬─────────┬─────────────────┘
//!         │         │         │
//!    ┌────▼───┐ ┌───▼────┐ ┌──▼───────┐
//!    │ Search │ │  Rate  │ │  Result  │
//!    │ Cache  │ │Limiter │ │ Enricher │
//!    └────┬───┘ └───┬────┘ └──┬───────┘
//!         │         │         │ JoinSet
//!    ┌────▼───┐ ┌───▼─────────▼────┐
//!    │ SQLite │ │  RemoteService   │
//!    │ (r2d2) │ │ (GitHub/reqwest) │
//!    └────────┘ └──────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fmt;
pub mod services;
pub mod types;

pub use config::SearchConfig;
pub use error::{Error, Result};
pub use types::{Generation, Query};

use std::path::PathBuf;
use xxhash_rust::xxh3::xxh3_64;

/// Computes the default cache database path for an API root.
///
/// The path is `~/.cache/hubscout/<hash>.db` where `<hash>` is the xxh3 of
/// the API root, so results from different servers never mix.
#[must_use]
pub fn default_cache_path(api_root: &str) -> PathBuf {
    let hash = xxh3_64(api_root.trim_end_matches('/').as_bytes());

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hubscout");

    cache_dir.join(format!("{hash:016x}.db"))
}
