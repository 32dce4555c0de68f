//! Search cache collaborator.
//!
//! The controller only needs string get/set keyed by the raw query text.
//! Values are serialized `Vec<Slot>` arrays and are never rewritten once
//! stored.

use crate::db::Database;
use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// Keyed store for assembled result sets.
pub trait SearchCache: Send + Sync {
    /// Returns the serialized result set for `query`, if any.
    ///
    /// # Errors
    ///
    /// Returns a `DbError` if the backing store cannot be read.
    fn get(&self, query: &str) -> DbResult<Option<String>>;

    /// Stores a serialized result set under `query`.
    ///
    /// Implementations keep the first value written for a key.
    ///
    /// # Errors
    ///
    /// Returns a `DbError` if the backing store cannot be written.
    fn set(&self, query: &str, value: &str) -> DbResult<()>;
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SearchCache for MemoryCache {
    fn get(&self, query: &str) -> DbResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| DbError::Poisoned)?;
        Ok(entries.get(query).cloned())
    }

    fn set(&self, query: &str, value: &str) -> DbResult<()> {
        let mut entries = self.entries.write().map_err(|_| DbError::Poisoned)?;
        entries
            .entry(query.to_string())
            .or_insert_with(|| value.to_string());
        Ok(())
    }
}

impl SearchCache for Database {
    fn get(&self, query: &str) -> DbResult<Option<String>> {
        self.get_entry(query)
    }

    fn set(&self, query: &str, value: &str) -> DbResult<()> {
        if !self.insert_entry(query, value)? {
            tracing::debug!(%query, "Cache entry already present, keeping existing snapshot");
        }
        Ok(())
    }
}
