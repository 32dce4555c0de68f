//! SQLite-backed search cache with connection pooling.

mod pragmas;
mod schema;

pub use pragmas::apply_pragmas;
pub use schema::{init_schema, SCHEMA_VERSION};

use crate::error::{DbError, DbResult};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

/// Database handle with connection pooling.
///
/// Uses r2d2 because `rusqlite::Connection` is NOT Sync.
/// The pool manages thread-safe access to `SQLite` connections.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Opens or creates a cache database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` if connection pool creation fails.
    /// Returns `DbError::Sqlite` if schema initialization fails.
    pub fn open(path: &Path) -> DbResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| apply_pragmas(conn));
        let pool = Pool::builder()
            .max_size(4)
            .min_idle(Some(1))
            .build(manager)?;

        {
            let conn = pool.get()?;
            init_schema(&conn)?;
        }

        Ok(Self { pool })
    }

    /// Creates an in-memory database (for testing and `--memory-cache`).
    ///
    /// A single pooled connection, since every in-memory connection would
    /// otherwise see its own empty database.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` if connection pool creation fails.
    /// Returns `DbError::Sqlite` if schema initialization fails.
    pub fn in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| apply_pragmas(conn));
        let pool = Pool::builder().max_size(1).build(manager)?;

        {
            let conn = pool.get()?;
            init_schema(&conn)?;
        }

        Ok(Self { pool })
    }

    /// Gets a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` if no connection is available within the timeout.
    pub fn conn(&self) -> DbResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(DbError::from)
    }

    /// Reads the cached payload for a query.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` if no connection is available.
    /// Returns `DbError::Sqlite` if the query fails (other than no rows).
    pub fn get_entry(&self, query: &str) -> DbResult<Option<String>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT payload FROM search_cache WHERE query = ?1",
            rusqlite::params![query],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(payload) => Ok(Some(payload)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Sqlite(e)),
        }
    }

    /// Stores a payload for a query if none exists yet.
    ///
    /// Returns `true` if a new row was written. An existing snapshot is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` if no connection is available.
    /// Returns `DbError::Sqlite` if the insert fails.
    pub fn insert_entry(&self, query: &str, payload: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            INSERT INTO search_cache (query, payload, created_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(query) DO NOTHING
            "#,
            rusqlite::params![query, payload],
        )?;
        Ok(changed > 0)
    }

    /// Number of cached queries.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` or `DbError::Sqlite` on failure.
    pub fn entry_count(&self) -> DbResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM search_cache", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Cached queries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` or `DbError::Sqlite` on failure.
    pub fn queries(&self) -> DbResult<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT query, created_at FROM search_cache ORDER BY created_at, query",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Removes every cached entry, returning how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` or `DbError::Sqlite` on failure.
    pub fn clear(&self) -> DbResult<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM search_cache", [])?;
        Ok(deleted as u64)
    }
}

// Compile-time assertions for thread safety.
#[cfg(test)]
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Database>();
};
