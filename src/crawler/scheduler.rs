//! Crawl session state: frontier, dedup sets, results and counters
//!
//! This module handles:
//! - FIFO frontier management with NormalizedKey dedup
//! - The visited/crawled bookkeeping that prevents double dispatch
//! - Depth, same-domain and robots filtering (`should_crawl`)
//! - The effective concurrency budget and crawl-delay pacing values
//!
//! `CrawlSession` is plain data with no locking. It is owned and mutated by
//! exactly one task, the coordinator.

use crate::config::CrawlConfig;
use crate::crawler::CrawlResult;
use crate::output::{CrawlStats, StatusSnapshot};
use crate::robots::{Discovery, RobotsDirectives};
use crate::state::{CrawlStatus, PageRecord};
use crate::url::{depth_from, is_same_domain, normalize_parsed, NormalizedKey};
use crate::{ConfigError, ScoutError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The URL exactly as it will be requested
    pub url: String,

    /// Its dedup key
    pub key: NormalizedKey,
}

/// What happened to a URL offered to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// New key, pushed onto the frontier
    Queued,
    /// Key already crawled; counted as skipped
    AlreadyCrawled,
    /// Key already queued or in flight; dropped silently
    Duplicate,
    /// Not an absolute http(s) URL
    Invalid,
}

/// All mutable state of one crawl
#[derive(Debug)]
pub struct CrawlSession {
    config: CrawlConfig,

    /// Depth and same-domain reference (seed URL, else first manual page)
    reference: Url,

    frontier: VecDeque<QueuedUrl>,
    queued: HashSet<NormalizedKey>,
    visited: HashSet<NormalizedKey>,
    crawled: HashSet<NormalizedKey>,
    results: BTreeMap<NormalizedKey, PageRecord>,

    sitemap_keys: HashSet<NormalizedKey>,
    sitemap_urls: BTreeSet<String>,
    robots: Option<RobotsDirectives>,

    skipped_count: usize,
    stats: CrawlStats,
    status: CrawlStatus,
}

impl CrawlSession {
    /// Creates a pending session for a validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - Empty frontier, status `Pending`
    /// * `Err(ScoutError)` - No usable seed URL
    pub fn new(config: CrawlConfig) -> Result<Self, ScoutError> {
        let first = config
            .seeds()
            .next()
            .ok_or_else(|| ConfigError::Validation("no seed URL or manual pages".to_string()))?;
        let reference = Url::parse(first).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", first, e)))?;

        Ok(Self {
            config,
            reference,
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            crawled: HashSet::new(),
            results: BTreeMap::new(),
            sitemap_keys: HashSet::new(),
            sitemap_urls: BTreeSet::new(),
            robots: None,
            skipped_count: 0,
            stats: CrawlStats::default(),
            status: CrawlStatus::Pending,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// URL used for depth measurement and same-domain checks
    pub fn reference(&self) -> &Url {
        &self.reference
    }

    pub fn status(&self) -> CrawlStatus {
        self.status
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    pub fn results(&self) -> &BTreeMap<NormalizedKey, PageRecord> {
        &self.results
    }

    pub fn queue_len(&self) -> usize {
        self.frontier.len()
    }

    /// Moves to `next` if the lifecycle allows it
    ///
    /// # Returns
    ///
    /// * `true` - The status changed
    /// * `false` - The transition is not allowed; nothing changed
    pub fn transition(&mut self, next: CrawlStatus) -> bool {
        if self.status.can_transition_to(next) {
            tracing::debug!(from = %self.status, to = %next, "session status change");
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Installs discovery results and seeds the frontier
    ///
    /// Seeds (the seed URL, then manual pages) skip the depth filter but
    /// still honor robots rules. Sitemap URLs go through `should_crawl`.
    ///
    /// # Returns
    ///
    /// Number of URLs queued
    pub fn seed(&mut self, discovery: Discovery) -> usize {
        self.robots = discovery.robots;
        let mut queued = 0;

        let seeds: Vec<String> = self.config.seeds().map(str::to_string).collect();
        for seed in seeds {
            let Ok(url) = Url::parse(&seed) else {
                continue;
            };
            if !self.robots_allows(&url) {
                tracing::info!(url = %seed, "seed disallowed by robots.txt");
                continue;
            }
            if self.enqueue(&seed) == Enqueue::Queued {
                queued += 1;
            }
        }

        for sitemap_url in discovery.sitemap_urls {
            let Ok(url) = Url::parse(&sitemap_url) else {
                continue;
            };
            if let Ok(key) = normalize_parsed(&url) {
                self.sitemap_keys.insert(key);
            }
            if self.should_crawl(&url) && self.enqueue(&sitemap_url) == Enqueue::Queued {
                queued += 1;
            }
            self.sitemap_urls.insert(sitemap_url);
        }

        tracing::info!(
            queued,
            sitemap_urls = self.sitemap_urls.len(),
            "frontier seeded"
        );
        queued
    }

    /// Returns true if a discovered URL may be queued
    ///
    /// Requires the same host as the reference URL, a depth (path segments
    /// beyond the reference) within `max_depth`, and robots permission.
    pub fn should_crawl(&self, url: &Url) -> bool {
        is_same_domain(url, &self.reference)
            && depth_from(&self.reference, url) <= self.config.max_depth
            && self.robots_allows(url)
    }

    /// Checks the robots rules for a URL (always true when robots are ignored)
    pub fn robots_allows(&self, url: &Url) -> bool {
        if !self.config.respect_robots {
            return true;
        }
        let Some(robots) = &self.robots else {
            return true;
        };

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }
        robots.is_allowed(&target)
    }

    /// Offers a URL to the frontier
    ///
    /// A key that is already crawled increments `skipped_count`. A key that
    /// is queued or in flight is dropped. Otherwise the URL is pushed and
    /// `total_pages` grows by one.
    pub fn enqueue(&mut self, raw: &str) -> Enqueue {
        let Ok(url) = Url::parse(raw) else {
            return Enqueue::Invalid;
        };
        let Ok(key) = normalize_parsed(&url) else {
            return Enqueue::Invalid;
        };

        if self.crawled.contains(&key) {
            self.skipped_count += 1;
            return Enqueue::AlreadyCrawled;
        }
        if self.queued.contains(&key) || self.visited.contains(&key) {
            return Enqueue::Duplicate;
        }

        self.queued.insert(key.clone());
        self.frontier.push_back(QueuedUrl {
            url: raw.to_string(),
            key,
        });
        self.stats.total_pages += 1;
        Enqueue::Queued
    }

    /// Pops the next URL to fetch and marks it visited
    ///
    /// Entries whose key was visited or crawled in the meantime are dropped;
    /// crawled ones count as skipped.
    pub fn next_dispatch(&mut self) -> Option<QueuedUrl> {
        while let Some(next) = self.frontier.pop_front() {
            self.queued.remove(&next.key);

            if self.crawled.contains(&next.key) {
                self.skipped_count += 1;
                continue;
            }
            if !self.visited.insert(next.key.clone()) {
                continue;
            }
            return Some(next);
        }
        None
    }

    /// Next URL in line without removing it
    pub fn peek_next(&self) -> Option<&str> {
        self.frontier.front().map(|q| q.url.as_str())
    }

    /// Records a settled fetch and queues its crawlable internal links
    ///
    /// # Returns
    ///
    /// Number of new URLs queued from the page
    pub fn record(&mut self, key: NormalizedKey, mut record: PageRecord) -> usize {
        if self.crawled.contains(&key) {
            tracing::warn!(url = %record.url, "duplicate result ignored");
            return 0;
        }

        record.in_sitemap = self.sitemap_keys.contains(&key);
        self.crawled.insert(key.clone());
        self.stats.record_page(record.duration_ms, record.is_error());

        let mut queued = 0;
        if !record.is_error() {
            self.follow_reference_redirect(&key, &record);

            let mut off_site = 0;
            for link in &record.internal_links {
                let Ok(url) = Url::parse(link) else {
                    continue;
                };
                if !is_same_domain(&url, &self.reference) {
                    off_site += 1;
                    continue;
                }
                if self.should_crawl(&url) && self.enqueue(link) == Enqueue::Queued {
                    queued += 1;
                }
            }

            if off_site > 0 {
                tracing::info!(
                    url = %record.url,
                    redirected_to = ?record.redirected_to,
                    dropped = off_site,
                    site = %self.reference,
                    "links outside the crawled site dropped"
                );
            }
        }

        self.results.insert(key, record);
        queued
    }

    /// Moves the crawl to the redirect target when the reference page changed host
    ///
    /// `http://example.com/` answering from `https://www.example.com/` means
    /// the site lives on the latter; its links would otherwise all be off-site.
    fn follow_reference_redirect(&mut self, key: &NormalizedKey, record: &PageRecord) {
        let Some(target) = record.redirected_to.as_deref() else {
            return;
        };
        if normalize_parsed(&self.reference).ok().as_ref() != Some(key) {
            return;
        }
        let Ok(target) = Url::parse(target) else {
            return;
        };
        if is_same_domain(&target, &self.reference) {
            return;
        }

        tracing::info!(from = %self.reference, to = %target, "seed redirected to another host, following it");
        self.reference = target;
    }

    /// Crawl delay in force, if robots rules are honored and set one
    pub fn crawl_delay(&self) -> Option<Duration> {
        if !self.config.respect_robots {
            return None;
        }
        self.robots.as_ref()?.crawl_delay_duration()
    }

    /// Concurrency budget: 1 under a crawl-delay, the configured value otherwise
    pub fn effective_concurrency(&self) -> usize {
        if self.crawl_delay().is_some() {
            1
        } else {
            self.config.concurrency.max(1)
        }
    }

    /// How many more fetches may start now
    ///
    /// Bounded by the concurrency budget and by the pages left before
    /// `max_pages`, counting fetches already in flight.
    pub fn dispatch_budget(&self, in_flight: usize) -> usize {
        let lanes = self.effective_concurrency().saturating_sub(in_flight);
        let pages_left = self
            .config
            .max_pages
            .saturating_sub(self.stats.crawled_pages + in_flight);
        lanes.min(pages_left)
    }

    /// `max_pages` pages have settled
    pub fn limit_reached(&self) -> bool {
        self.stats.crawled_pages >= self.config.max_pages
    }

    /// Nothing queued and nothing in flight
    pub fn is_drained(&self, in_flight: usize) -> bool {
        self.frontier.is_empty() && in_flight == 0
    }

    /// Builds the consumer-facing status view
    pub fn snapshot(&self, in_flight: usize, elapsed: Duration) -> StatusSnapshot {
        let concurrency = self.effective_concurrency();
        let elapsed_ms = elapsed.as_millis() as u64;

        StatusSnapshot {
            status: self.status,
            crawled_pages: self.stats.crawled_pages,
            total_pages: self.stats.total_pages,
            error_count: self.stats.error_count,
            skipped_count: self.skipped_count,
            avg_response_ms: self.stats.avg_response_ms,
            percent_complete: self.stats.percent_complete(),
            eta_ms: self.stats.eta_ms(concurrency),
            queue_size: self.frontier.len(),
            current_url: self.peek_next().map(str::to_string),
            in_flight,
            concurrency,
            elapsed_ms,
            pages_per_second: crate::output::throughput(self.stats.crawled_pages, elapsed_ms),
        }
    }

    /// Moves the session's results out into a `CrawlResult`
    ///
    /// Called once, when the session reaches a terminal state.
    pub fn take_result(&mut self, started_at: DateTime<Utc>) -> CrawlResult {
        CrawlResult {
            config: self.config.clone(),
            status: self.status,
            pages: std::mem::take(&mut self.results),
            skipped_count: self.skipped_count,
            sitemap_urls: std::mem::take(&mut self.sitemap_urls),
            robots: self.robots.clone(),
            stats: self.stats.clone(),
            started_at,
            finished_at: Utc::now(),
        }
    }
}
