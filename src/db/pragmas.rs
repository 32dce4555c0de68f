//! `SQLite` PRAGMA configuration for the cache database.

use rusqlite::Connection;

/// Executes a single SQL statement that may return rows (PRAGMAs).
fn exec_stmt(conn: &Connection, sql: &str) -> rusqlite::Result<()> {
    conn.prepare(sql)?.query([])?.next()?;
    Ok(())
}

/// Applies PRAGMA settings for a small, read-mostly key-value table.
///
/// Most of these are per-connection, so the pool runs this on every
/// connection it opens.
///
/// # Errors
///
/// Returns the `rusqlite::Error` of the first PRAGMA statement that fails.
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // WAL mode lets a concurrent reader see committed entries during a write
    exec_stmt(conn, "PRAGMA journal_mode = WAL")?;
    // Synchronous NORMAL is safe with WAL, faster than FULL
    exec_stmt(conn, "PRAGMA synchronous = NORMAL")?;
    // 5 second busy timeout for lock contention
    exec_stmt(conn, "PRAGMA busy_timeout = 5000")?;
    exec_stmt(conn, "PRAGMA temp_store = MEMORY")?;

    Ok(())
}
