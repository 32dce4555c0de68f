//! Remote service boundary.
//!
//! The search core only ever talks to [`RemoteService`]; [`GithubClient`]
//! is the production implementation over `reqwest`.

mod github;
mod models;

pub use github::GithubClient;
pub use models::{
    ApiMessage, CoarseHit, RateLimitResponse, RateLimitState, SearchPage, Slot, UserRecord,
};

use crate::error::ApiResult;
use std::future::Future;

/// The three logical calls the search core makes.
///
/// Futures are `Send` so enrichment calls can be spawned onto the runtime.
pub trait RemoteService: Send + Sync + 'static {
    /// Reads the current quota state.
    fn rate_limit(&self) -> impl Future<Output = ApiResult<RateLimitState>> + Send;

    /// Runs the coarse account search for `query`.
    fn search_users(&self, query: &str) -> impl Future<Output = ApiResult<SearchPage>> + Send;

    /// Fetches the detailed record for one account.
    ///
    /// Returns `ApiError::RateLimited` when the service answers with a
    /// rate-limit payload instead of a record.
    fn fetch_user(&self, login: &str) -> impl Future<Output = ApiResult<UserRecord>> + Send;
}
