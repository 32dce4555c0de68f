//! Core services: cache, rate-limit gate, enrichment and the controller.

mod cache;
pub mod controller;
mod enricher;
pub mod rate_limiter;

pub use cache::{MemoryCache, SearchCache};
pub use controller::{
    ControllerEvent, CycleOutcome, ResultSource, SearchController, SearchState,
};
pub use enricher::ResultEnricher;
pub use rate_limiter::{Advisory, Gate, RateLimiter};
