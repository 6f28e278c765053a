//! Storage traits and error types
//!
//! This module defines the trait interface for session stores and
//! associated error types.

use crate::crawler::CrawlResult;
use crate::state::CrawlStatus;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One row of the stored-session listing
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub seed: Option<String>,
    pub status: CrawlStatus,
    pub crawled_pages: usize,
    pub error_count: usize,
    pub started_at: String,
    pub finished_at: String,
    pub saved_at: String,
}

/// Trait for session store implementations
///
/// A store is an opaque key-value contract over finished crawls. Saving an
/// existing id replaces the stored session.
pub trait SessionStore {
    /// Stores a finished crawl under `id`
    fn save(&mut self, id: &str, result: &CrawlResult) -> StorageResult<()>;

    /// Loads a stored crawl
    ///
    /// # Returns
    ///
    /// * `Ok(Some(CrawlResult))` - The session exists
    /// * `Ok(None)` - No session with that id
    fn load(&self, id: &str) -> StorageResult<Option<CrawlResult>>;

    /// Lists stored sessions, most recently saved first
    fn list(&self) -> StorageResult<Vec<SessionSummary>>;

    /// Deletes a stored session
    ///
    /// # Returns
    ///
    /// `true` if a session was removed
    fn delete(&mut self, id: &str) -> StorageResult<bool>;
}
