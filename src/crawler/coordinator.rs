//! Crawler coordinator - the single task that owns a crawl session
//!
//! This module contains the crawl loop that coordinates:
//! - Robots.txt and sitemap discovery before the first dispatch
//! - Dispatching fetches within the concurrency budget and crawl-delay pacing
//! - Folding settled fetches back into the session, one at a time
//! - Pause, resume, cancel and status controls
//! - Emitting events and publishing status snapshots
//!
//! Fetches run as separate tasks in a `JoinSet`; only their results come back
//! here, so the session is never touched from two places at once.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::scheduler::CrawlSession;
use crate::output::{CrawlEvent, PageLog, StatusSnapshot};
use crate::robots::discover;
use crate::state::{CrawlStatus, PageRecord};
use crate::url::NormalizedKey;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

/// Control messages from the engine handle to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Pause,
    Resume,
    Cancel,
    Status,
}

/// Whether the crawl loop keeps going after a control message
enum Flow {
    Continue,
    Stop,
}

/// Owns one `CrawlSession` and drives it to a terminal state
pub(crate) struct Coordinator {
    session: CrawlSession,
    fetcher: Fetcher,
    controls: mpsc::UnboundedReceiver<Control>,
    controls_open: bool,
    events: mpsc::UnboundedSender<CrawlEvent>,
    status_tx: Arc<watch::Sender<StatusSnapshot>>,
    in_flight: JoinSet<(NormalizedKey, PageRecord)>,
    started: Instant,
    started_at: DateTime<Utc>,
    last_dispatch: Option<Instant>,
}

impl Coordinator {
    pub(crate) fn new(
        session: CrawlSession,
        fetcher: Fetcher,
        controls: mpsc::UnboundedReceiver<Control>,
        events: mpsc::UnboundedSender<CrawlEvent>,
        status_tx: Arc<watch::Sender<StatusSnapshot>>,
    ) -> Self {
        Self {
            session,
            fetcher,
            controls,
            controls_open: true,
            events,
            status_tx,
            in_flight: JoinSet::new(),
            started: Instant::now(),
            started_at: Utc::now(),
            last_dispatch: None,
        }
    }

    /// Runs the crawl to completion, cancellation or failure
    ///
    /// # Returns
    ///
    /// The terminal status of the session
    pub(crate) async fn run(mut self) -> CrawlStatus {
        self.session.transition(CrawlStatus::Running);
        self.publish();

        if let Flow::Stop = self.discover().await {
            return self.session.status();
        }

        loop {
            if self.session.status() == CrawlStatus::Running {
                self.dispatch_ready();
            }

            if self.session.limit_reached() {
                tracing::info!(
                    "Page limit of {} reached, finishing crawl",
                    self.session.config().max_pages
                );
                self.complete();
                break;
            }
            if self.session.is_drained(self.in_flight.len()) {
                tracing::info!("Frontier is empty, crawl complete");
                self.complete();
                break;
            }

            let pacing = self.pacing_deadline();

            tokio::select! {
                biased;

                control = self.controls.recv(), if self.controls_open => {
                    match control {
                        Some(control) => {
                            if let Flow::Stop = self.handle_control(control) {
                                break;
                            }
                        }
                        None => {
                            tracing::debug!("Control channel closed");
                            self.controls_open = false;
                        }
                    }
                }

                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok((key, record)) => self.settle(key, record),
                        Err(e) => {
                            self.fail(e);
                            break;
                        }
                    }
                }

                _ = tokio::time::sleep_until(pacing.unwrap_or_else(Instant::now)), if pacing.is_some() => {}

                else => {
                    // Paused with nobody left to resume
                    tracing::warn!("Crawl paused with no controller attached, cancelling");
                    self.cancel();
                    break;
                }
            }
        }

        self.session.status()
    }

    /// Resolves robots.txt and sitemaps, then seeds the frontier
    ///
    /// Controls are still served while discovery is in progress.
    async fn discover(&mut self) -> Flow {
        let client = self.fetcher.client().clone();
        let reference = self.session.reference().clone();
        let token = self.session.config().product_token().to_string();

        let discovery = async move { discover(&client, &reference, &token).await };
        tokio::pin!(discovery);

        let result = loop {
            tokio::select! {
                biased;

                control = self.controls.recv(), if self.controls_open => {
                    match control {
                        Some(control) => {
                            if let Flow::Stop = self.handle_control(control) {
                                return Flow::Stop;
                            }
                        }
                        None => self.controls_open = false,
                    }
                }

                result = &mut discovery => break result,
            }
        };

        let queued = self.session.seed(result);
        tracing::info!("Starting crawl with {} queued URLs", queued);
        self.publish();
        Flow::Continue
    }

    /// Starts as many fetches as the budget and pacing allow
    fn dispatch_ready(&mut self) {
        while self.session.dispatch_budget(self.in_flight.len()) > 0 {
            if let (Some(delay), Some(last)) = (self.session.crawl_delay(), self.last_dispatch) {
                if last.elapsed() < delay {
                    break;
                }
            }

            let Some(next) = self.session.next_dispatch() else {
                break;
            };

            tracing::debug!("Dispatching {}", next.url);
            self.last_dispatch = Some(Instant::now());

            let fetcher = self.fetcher.clone();
            self.in_flight.spawn(async move {
                let record = fetcher.fetch(&next.url).await;
                (next.key, record)
            });
        }
    }

    /// When the next paced dispatch may happen, if one is waiting on the delay
    fn pacing_deadline(&self) -> Option<Instant> {
        if self.session.status() != CrawlStatus::Running
            || self.session.queue_len() == 0
            || self.session.dispatch_budget(self.in_flight.len()) == 0
        {
            return None;
        }
        let delay = self.session.crawl_delay()?;
        let last = self.last_dispatch?;
        last.checked_add(delay)
    }

    /// Folds one settled fetch into the session and reports it
    fn settle(&mut self, key: NormalizedKey, record: PageRecord) {
        let log = PageLog::from(&record);
        if log.success {
            tracing::debug!("Fetched {} ({}) in {}ms", log.url, log.status, log.duration_ms);
        } else {
            tracing::info!(
                "Failed {}: {}",
                log.url,
                log.error.as_deref().unwrap_or("unknown error")
            );
        }

        let discovered = self.session.record(key, record);
        if discovered > 0 {
            tracing::debug!("Queued {} new URLs from {}", discovered, log.url);
        }

        let snapshot = self.publish();
        self.emit(CrawlEvent::Log(log));
        self.emit(CrawlEvent::Progress(snapshot));
    }

    fn handle_control(&mut self, control: Control) -> Flow {
        match control {
            Control::Pause => {
                if self.session.transition(CrawlStatus::Paused) {
                    tracing::info!("Crawl paused");
                    let snapshot = self.publish();
                    self.emit(CrawlEvent::Paused(snapshot));
                } else {
                    tracing::debug!("Ignoring pause while {}", self.session.status());
                }
                Flow::Continue
            }
            Control::Resume => {
                if self.session.status() == CrawlStatus::Paused
                    && self.session.transition(CrawlStatus::Running)
                {
                    tracing::info!("Crawl resumed");
                    let snapshot = self.publish();
                    self.emit(CrawlEvent::Resumed(snapshot));
                } else {
                    tracing::debug!("Ignoring resume while {}", self.session.status());
                }
                Flow::Continue
            }
            Control::Cancel => {
                self.cancel();
                Flow::Stop
            }
            Control::Status => {
                let snapshot = self.snapshot();
                self.emit(CrawlEvent::Progress(snapshot));
                Flow::Continue
            }
        }
    }

    /// Terminal: queue drained or page limit reached
    fn complete(&mut self) {
        // Only reachable with in-flight work when the page limit cut it short
        self.in_flight.detach_all();
        self.session.transition(CrawlStatus::Completed);
        self.publish();

        let result = self.session.take_result(self.started_at);
        tracing::info!(
            "Crawl complete: {} pages, {} errors, {} skipped",
            result.stats.crawled_pages,
            result.stats.error_count,
            result.skipped_count
        );
        self.emit(CrawlEvent::Completed(Box::new(result)));
    }

    /// Terminal: stop dispatching and discard whatever is still in flight
    fn cancel(&mut self) {
        let abandoned = self.in_flight.len();
        self.in_flight.detach_all();
        self.session.transition(CrawlStatus::Cancelled);
        tracing::info!("Crawl cancelled ({} in-flight fetches discarded)", abandoned);

        let snapshot = self.publish();
        self.emit(CrawlEvent::Cancelled(snapshot));
    }

    /// Terminal: a fetch task died
    fn fail(&mut self, error: JoinError) {
        tracing::error!("Fetch task failed: {}", error);
        self.in_flight.detach_all();
        self.session.transition(CrawlStatus::Failed);
        self.publish();
        self.emit(CrawlEvent::Error {
            message: format!("Crawl task failed: {}", error),
        });
    }

    fn snapshot(&self) -> StatusSnapshot {
        self.session
            .snapshot(self.in_flight.len(), self.started.elapsed())
    }

    /// Publishes the current snapshot to status watchers and returns it
    fn publish(&self) -> StatusSnapshot {
        let snapshot = self.snapshot();
        self.status_tx.send_replace(snapshot.clone());
        snapshot
    }

    fn emit(&self, event: CrawlEvent) {
        // A dropped receiver just means nobody is listening
        let _ = self.events.send(event);
    }
}

/// Runs a coordinator on its own task and turns a panic into an `error` event
///
/// Whatever happens inside `run`, the consumer sees a terminal event and the
/// published status ends up terminal.
pub(crate) async fn supervise<F>(
    run: F,
    events: mpsc::UnboundedSender<CrawlEvent>,
    status_tx: Arc<watch::Sender<StatusSnapshot>>,
) -> CrawlStatus
where
    F: Future<Output = CrawlStatus> + Send + 'static,
{
    match tokio::spawn(run).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("Crawl coordinator died: {}", e);
            status_tx.send_modify(|snapshot| snapshot.status = CrawlStatus::Failed);
            let _ = events.send(CrawlEvent::Error {
                message: format!("Crawl engine failed: {}", e),
            });
            CrawlStatus::Failed
        }
    }
}
