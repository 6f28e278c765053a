//! Crawl event types
//!
//! Everything the engine tells its consumer goes through `CrawlEvent`. Each
//! variant serializes as internally tagged JSON (`"type": "progress"`).

use crate::config::CrawlConfig;
use crate::crawler::CrawlResult;
use crate::output::stats::StatusSnapshot;
use crate::state::PageRecord;
use serde::{Deserialize, Serialize};

/// Events emitted by a crawl session, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrawlEvent {
    /// `start` was accepted; echoes the configuration
    Started { config: CrawlConfig },

    /// Counters after a page settled, or an answer to `getStatus`
    Progress(StatusSnapshot),

    /// One settled page
    Log(PageLog),

    Paused(StatusSnapshot),

    Resumed(StatusSnapshot),

    /// Terminal; no further events follow
    Cancelled(StatusSnapshot),

    /// Terminal; carries every record of the session
    Completed(Box<CrawlResult>),

    /// Setup failure or unrecoverable engine failure
    Error { message: String },
}

impl CrawlEvent {
    /// Event name as used in the `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Progress(_) => "progress",
            Self::Log(_) => "log",
            Self::Paused(_) => "paused",
            Self::Resumed(_) => "resumed",
            Self::Cancelled(_) => "cancelled",
            Self::Completed(_) => "completed",
            Self::Error { .. } => "error",
        }
    }

    /// Returns true if nothing follows this event in a session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::Completed(_) | Self::Error { .. })
    }

    /// Serializes the event as a single JSON line
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Per-page log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLog {
    pub url: String,
    pub status: u16,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl From<&PageRecord> for PageLog {
    fn from(record: &PageRecord) -> Self {
        Self {
            url: record.url.clone(),
            status: record.status,
            success: !record.is_error(),
            duration_ms: record.duration_ms,
            error: record.error_message.clone().filter(|_| record.is_error()),
        }
    }
}
