//! Type-safe newtypes for hubscout.
//!
//! These newtypes provide compile-time safety and semantic clarity
//! for core domain concepts.

use std::fmt;
use std::sync::Arc;

/// Monotonic input counter used to detect superseded search cycles.
///
/// Every call to `on_input`/`on_clear` produces a new generation, so two
/// identical queries typed one after another are still distinct cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation before any input has been seen.
    pub const INITIAL: Self = Self(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gen = self.0;
        write!(f, "gen:{gen}")
    }
}

/// Immutable snapshot of the search box text.
///
/// `Arc<str>` so the snapshot captured by a timer, the cache key and the
/// logged query share one allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query(Arc<str>);

impl Query {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self(Arc::from(text))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, not bytes.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether this query is long enough to start a search cycle.
    #[must_use]
    pub fn is_searchable(&self, min_len: usize) -> bool {
        self.char_len() >= min_len
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self(Arc::from(text))
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Compile-time assertions for thread safety.
#[cfg(test)]
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<Generation>();
    assert_send_sync::<Query>();
};
