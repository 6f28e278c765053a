/// Lifecycle status definitions for a crawl session
///
/// `Pending → Running ⇄ Paused → {Completed | Failed | Cancelled}`; the three
/// terminal states are absorbing.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current lifecycle state of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    // ===== Active States =====
    /// Session created, nothing dispatched yet
    Pending,

    /// Dispatching fetches
    Running,

    /// Dispatch suspended; in-flight fetches still settle
    Paused,

    // ===== Terminal States =====
    /// Queue drained or page limit reached
    Completed,

    /// Unrecoverable failure inside the engine
    Failed,

    /// Stopped on request; in-flight results discarded
    Cancelled,
}

impl CrawlStatus {
    /// Returns true if this is a terminal state (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the session still owns live work
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the transition `self -> next` is allowed
    pub fn can_transition_to(&self, next: CrawlStatus) -> bool {
        use CrawlStatus::*;
        match (self, next) {
            (Pending, Running) => true,
            (Running, Paused) | (Paused, Running) => true,
            (Pending | Running | Paused, Completed | Failed | Cancelled) => true,
            _ => false,
        }
    }

    /// Converts the status to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
