//! Database schema definitions.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

/// Initializes the database schema.
///
/// # Errors
///
/// Returns `DbError::Migration` if the file was written by a newer version.
/// Returns `DbError::Sqlite` if schema creation fails.
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "cache schema version {version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    conn.execute_batch(
        r#"
        -- One row per distinct raw query string. Rows are written once and
        -- never updated.
        CREATE TABLE IF NOT EXISTS search_cache (
            query TEXT PRIMARY KEY NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;

    Ok(())
}
