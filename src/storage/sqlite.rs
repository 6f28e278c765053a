//! SQLite session store
//!
//! This module provides a SQLite-based implementation of the SessionStore trait.
//! Each session is one row: a few summary columns for listing plus the full
//! JSON-encoded result.

use crate::crawler::CrawlResult;
use crate::state::CrawlStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SessionStore, SessionSummary, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite session store
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Creates a new SqliteSessionStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSessionStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl SessionStore for SqliteSessionStore {
    fn save(&mut self, id: &str, result: &CrawlResult) -> StorageResult<()> {
        let payload = serde_json::to_string(result)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO sessions
             (id, seed, status, crawled_pages, error_count, started_at, finished_at, saved_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                result.config.seed_url,
                result.status.as_str(),
                result.stats.crawled_pages as i64,
                result.stats.error_count as i64,
                result.started_at.to_rfc3339(),
                result.finished_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
                payload,
            ],
        )?;

        tracing::debug!("Saved session {} ({} pages)", id, result.pages.len());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Option<CrawlResult>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> StorageResult<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed, status, crawled_pages, error_count, started_at, finished_at, saved_at
             FROM sessions ORDER BY saved_at DESC, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, seed, status, crawled, errors, started_at, finished_at, saved_at) = row?;
            let status = CrawlStatus::parse(&status).ok_or_else(|| {
                StorageError::Database(format!("Unknown status '{}' for session {}", status, id))
            })?;
            sessions.push(SessionSummary {
                id,
                seed,
                status,
                crawled_pages: crawled.max(0) as usize,
                error_count: errors.max(0) as usize,
                started_at,
                finished_at,
                saved_at,
            });
        }

        Ok(sessions)
    }

    fn delete(&mut self, id: &str) -> StorageResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}
