//! Rate-limit gate run before every cache-miss search.

use crate::api::{RateLimitState, RemoteService};
use crate::error::ApiResult;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// One-shot notice about the remaining quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// No calls left; the cycle was dropped.
    QuotaExhausted { reset_at: u64 },
    /// Fewer than the configured threshold of calls left.
    QuotaLow { remaining: u64, reset_at: u64 },
}

impl Advisory {
    #[must_use]
    pub fn reset_at(&self) -> u64 {
        match *self {
            Self::QuotaExhausted { reset_at } | Self::QuotaLow { reset_at, .. } => reset_at,
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = humanize_reset(self.reset_at(), unix_now());
        match self {
            Self::QuotaExhausted { .. } => {
                write!(f, "API rate limit exceeded. Please try again {when}.")
            }
            Self::QuotaLow { remaining, .. } => write!(
                f,
                "You have {remaining} API calls remaining. The limit will reset {when}."
            ),
        }
    }
}

/// What a cycle should do after the quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Plenty of quota left.
    Proceed(RateLimitState),
    /// Quota is low; continue but publish the advisory.
    ProceedWithAdvisory(RateLimitState, Advisory),
    /// Quota is gone; stop the cycle and publish the advisory.
    Blocked(RateLimitState, Advisory),
}

impl Gate {
    #[must_use]
    pub fn advisory(&self) -> Option<Advisory> {
        match *self {
            Self::Proceed(_) => None,
            Self::ProceedWithAdvisory(_, a) | Self::Blocked(_, a) => Some(a),
        }
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(..))
    }
}

/// Reads remote quota state and classifies it.
///
/// Holds no state of its own: the quota belongs to the remote service and
/// the next user keystroke is the only retry trigger.
pub struct RateLimiter<R> {
    remote: Arc<R>,
    low_threshold: u64,
}

impl<R: RemoteService> RateLimiter<R> {
    #[must_use]
    pub fn new(remote: Arc<R>, low_threshold: u64) -> Self {
        Self {
            remote,
            low_threshold,
        }
    }

    /// One call to the quota endpoint.
    ///
    /// # Errors
    ///
    /// Propagates the remote service's `ApiError`.
    pub async fn check(&self) -> ApiResult<RateLimitState> {
        self.remote.rate_limit().await
    }

    /// Checks the quota and decides whether a search may run.
    ///
    /// # Errors
    ///
    /// Propagates the remote service's `ApiError`.
    pub async fn gate(&self) -> ApiResult<Gate> {
        let state = self.check().await?;
        Ok(classify(state, self.low_threshold))
    }
}

/// Pure quota policy.
#[must_use]
pub fn classify(state: RateLimitState, low_threshold: u64) -> Gate {
    if state.remaining == 0 {
        Gate::Blocked(
            state,
            Advisory::QuotaExhausted {
                reset_at: state.reset_at,
            },
        )
    } else if state.remaining < low_threshold {
        Gate::ProceedWithAdvisory(
            state,
            Advisory::QuotaLow {
                remaining: state.remaining,
                reset_at: state.reset_at,
            },
        )
    } else {
        Gate::Proceed(state)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Renders a reset timestamp relative to `now`, e.g. "in 12 minutes".
#[must_use]
pub fn humanize_reset(reset_at: u64, now: u64) -> String {
    let secs = reset_at.saturating_sub(now);
    match secs {
        0 => "now".to_string(),
        1..=44 => "in a few seconds".to_string(),
        45..=89 => "in a minute".to_string(),
        90..=2699 => format!("in {} minutes", (secs + 30) / 60),
        2700..=5399 => "in an hour".to_string(),
        _ => format!("in {} hours", (secs + 1800) / 3600),
    }
}
