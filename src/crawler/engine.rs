//! Command surface of the crawl engine
//!
//! `CrawlEngine` is the consumer-side handle: it accepts `start`, `pause`,
//! `resume`, `cancel` and `getStatus`, and hands out the event stream. Each
//! accepted `start` spawns a fresh coordinator task with its own session, so
//! no state is shared between crawls.

use crate::config::{validate_crawl_config, CrawlConfig};
use crate::crawler::coordinator::{supervise, Control, Coordinator};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::scheduler::CrawlSession;
use crate::output::{CrawlEvent, CrawlStats, StatusSnapshot};
use crate::robots::RobotsDirectives;
use crate::state::{CrawlStatus, PageRecord};
use crate::url::NormalizedKey;
use crate::ScoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Everything a finished crawl produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Configuration the crawl ran with
    pub config: CrawlConfig,

    /// Terminal status (`completed` for results delivered by the engine)
    pub status: CrawlStatus,

    /// One record per crawled URL, keyed by its normalized form
    pub pages: BTreeMap<NormalizedKey, PageRecord>,

    /// Rediscoveries of already-crawled URLs
    pub skipped_count: usize,

    /// Every page URL the sitemaps listed, crawled or not
    pub sitemap_urls: BTreeSet<String>,

    /// Parsed robots.txt, `None` when the site had none
    pub robots: Option<RobotsDirectives>,

    pub stats: CrawlStats,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// Wall-clock duration of the crawl in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Commands accepted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Start { config: CrawlConfig },
    Pause,
    Resume,
    Cancel,
    GetStatus,
}

/// Handle to the session currently (or most recently) running
struct ActiveSession {
    controls: mpsc::UnboundedSender<Control>,
    status: watch::Receiver<StatusSnapshot>,
    handle: Option<JoinHandle<CrawlStatus>>,
}

impl ActiveSession {
    fn is_running(&self) -> bool {
        let task_alive = self.handle.as_ref().map_or(false, |h| !h.is_finished());
        task_alive && !self.status.borrow().status.is_terminal()
    }
}

/// Background crawl engine
///
/// # Example
///
/// ```no_run
/// use linkscout::{CrawlConfig, CrawlEngine, CrawlEvent};
///
/// # async fn run() -> linkscout::Result<()> {
/// let (mut engine, mut events) = CrawlEngine::new();
/// engine.start(CrawlConfig::with_seed("https://example.com/"))?;
///
/// while let Some(event) = events.recv().await {
///     if let CrawlEvent::Completed(result) = &event {
///         println!("crawled {} pages", result.pages.len());
///     }
///     if event.is_terminal() {
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct CrawlEngine {
    events: mpsc::UnboundedSender<CrawlEvent>,
    active: Option<ActiveSession>,
}

impl CrawlEngine {
    /// Creates an idle engine and the receiving end of its event stream
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CrawlEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                events,
                active: None,
            },
            receiver,
        )
    }

    /// Starts a new crawl session
    ///
    /// Must be called from within a tokio runtime. Emits `started` on
    /// success.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The session is running in the background
    /// * `Err(ScoutError::AlreadyRunning)` - Another session is still active;
    ///   it is left untouched
    /// * `Err(ScoutError::Config)` - The configuration is unusable
    pub fn start(&mut self, config: CrawlConfig) -> Result<(), ScoutError> {
        if self.is_running() {
            return Err(ScoutError::AlreadyRunning);
        }

        validate_crawl_config(&config)?;
        let session = CrawlSession::new(config.clone())?;
        let fetcher = Fetcher::new(&config)?;

        let (controls, control_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(StatusSnapshot::pending(session.effective_concurrency()));

        tracing::info!(
            "Starting crawl of {}",
            config.seeds().next().unwrap_or_default()
        );
        self.emit(CrawlEvent::Started { config });

        let status_tx = Arc::new(status_tx);
        let coordinator = Coordinator::new(
            session,
            fetcher,
            control_rx,
            self.events.clone(),
            Arc::clone(&status_tx),
        );
        let handle = tokio::spawn(supervise(coordinator.run(), self.events.clone(), status_tx));

        self.active = Some(ActiveSession {
            controls,
            status,
            handle: Some(handle),
        });
        Ok(())
    }

    /// Suspends dispatch; in-flight fetches still settle
    pub fn pause(&self) -> Result<(), ScoutError> {
        self.send(Control::Pause)
    }

    /// Resumes dispatch from the existing queue
    pub fn resume(&self) -> Result<(), ScoutError> {
        self.send(Control::Resume)
    }

    /// Cancels the session; in-flight results are discarded
    pub fn cancel(&self) -> Result<(), ScoutError> {
        self.send(Control::Cancel)
    }

    /// Asks the session for a `progress` event
    pub fn request_status(&self) -> Result<(), ScoutError> {
        self.send(Control::Status)
    }

    /// Latest published snapshot of the current or last session
    pub fn status(&self) -> Option<StatusSnapshot> {
        self.active.as_ref().map(|a| a.status.borrow().clone())
    }

    /// Returns true while a session is pending, running or paused
    pub fn is_running(&self) -> bool {
        self.active.as_ref().map_or(false, ActiveSession::is_running)
    }

    /// Applies a protocol command
    ///
    /// Failures are reported on the event stream as `error` events instead
    /// of being returned.
    pub fn handle_command(&mut self, command: Command) {
        let outcome = match command {
            Command::Start { config } => self.start(config),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Cancel => self.cancel(),
            Command::GetStatus => self.request_status(),
        };

        if let Err(e) = outcome {
            tracing::warn!("Command rejected: {}", e);
            self.emit(CrawlEvent::Error {
                message: e.to_string(),
            });
        }
    }

    /// Waits for the current session's task to finish
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStatus)` - The terminal status
    /// * `Err(ScoutError::NotStarted)` - No session, or it was already awaited
    /// * `Err(ScoutError::Task)` - The coordinator task panicked
    pub async fn wait(&mut self) -> Result<CrawlStatus, ScoutError> {
        let handle = self
            .active
            .as_mut()
            .and_then(|a| a.handle.take())
            .ok_or(ScoutError::NotStarted)?;

        handle.await.map_err(|e| ScoutError::Task(e.to_string()))
    }

    fn send(&self, control: Control) -> Result<(), ScoutError> {
        let active = self.active.as_ref().ok_or(ScoutError::NotStarted)?;
        if active.status.borrow().status.is_terminal() {
            return Err(ScoutError::NotStarted);
        }
        active
            .controls
            .send(control)
            .map_err(|_| ScoutError::NotStarted)
    }

    fn emit(&self, event: CrawlEvent) {
        let _ = self.events.send(event);
    }
}
