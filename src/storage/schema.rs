//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the linkscout database.

use crate::storage::traits::{StorageError, StorageResult};

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Finished crawl sessions; payload is the JSON-encoded result
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    seed TEXT,
    status TEXT NOT NULL,
    crawled_pages INTEGER NOT NULL,
    error_count INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    saved_at TEXT NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_saved_at ON sessions(saved_at);
"#;

/// Initializes the database schema
///
/// A fresh database is stamped with `SCHEMA_VERSION`; a database written by
/// a different version is rejected.
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> StorageResult<()> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    match version {
        0 => {
            conn.execute_batch(SCHEMA_SQL)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
            Ok(())
        }
        SCHEMA_VERSION => {
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        }
        found => Err(StorageError::SchemaVersion {
            found,
            expected: SCHEMA_VERSION,
        }),
    }
}
