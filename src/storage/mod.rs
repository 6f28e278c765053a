//! Storage module for persisting finished crawls
//!
//! This module handles:
//! - SQLite database initialization and schema management
//! - Saving, loading and listing crawl sessions
//! - Deriving stable session ids

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteSessionStore;
pub use traits::{SessionStore, SessionSummary, StorageError, StorageResult};

use crate::config::compute_config_hash;
use crate::crawler::CrawlResult;
use std::path::Path;

/// Initializes or opens a session store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteSessionStore)` - Successfully initialized store
/// * `Err(StorageError)` - Failed to initialize store
pub fn open_store(path: &Path) -> StorageResult<SqliteSessionStore> {
    SqliteSessionStore::new(path)
}

/// Derives a session id from a crawl's configuration and start time
///
/// The same configuration started at a different moment gets a different id.
pub fn session_id(result: &CrawlResult) -> StorageResult<String> {
    let config = serde_json::to_string(&result.config)?;
    let hash = compute_config_hash(&format!("{}|{}", config, result.started_at.to_rfc3339()));
    Ok(hash[..16].to_string())
}
