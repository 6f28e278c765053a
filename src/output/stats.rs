//! Running crawl statistics and progress snapshots
//!
//! `CrawlStats` holds the counters the scheduler updates as pages settle.
//! `StatusSnapshot` is the point-in-time view sent to consumers with every
//! progress event.

use crate::crawler::CrawlResult;
use crate::state::CrawlStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running totals for one crawl session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Pages whose fetch has settled (success or error)
    pub crawled_pages: usize,

    /// Distinct URLs ever queued
    pub total_pages: usize,

    /// Settled pages that failed or returned 4xx/5xx
    pub error_count: usize,

    /// Rolling mean of fetch durations (milliseconds)
    pub avg_response_ms: f64,
}

impl CrawlStats {
    /// Records one settled page
    pub fn record_page(&mut self, duration_ms: u64, is_error: bool) {
        self.crawled_pages += 1;
        if is_error {
            self.error_count += 1;
        }

        // Incremental mean avoids keeping every sample
        let n = self.crawled_pages as f64;
        self.avg_response_ms += (duration_ms as f64 - self.avg_response_ms) / n;
    }

    /// Completion in percent; 0 when nothing has been queued
    pub fn percent_complete(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            (self.crawled_pages as f64 / self.total_pages as f64) * 100.0
        }
    }

    /// Pages queued but not yet settled
    pub fn remaining_pages(&self) -> usize {
        self.total_pages.saturating_sub(self.crawled_pages)
    }

    /// Estimated milliseconds left: `remaining * avg / concurrency`
    ///
    /// Returns `None` until at least one page has settled.
    pub fn eta_ms(&self, concurrency: usize) -> Option<u64> {
        if self.crawled_pages == 0 {
            return None;
        }
        let lanes = concurrency.max(1) as f64;
        Some((self.remaining_pages() as f64 * self.avg_response_ms / lanes).round() as u64)
    }
}

/// Point-in-time view of a crawl session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: CrawlStatus,
    pub crawled_pages: usize,
    pub total_pages: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub avg_response_ms: f64,
    pub percent_complete: f64,

    /// `None` until the first page settles
    pub eta_ms: Option<u64>,

    pub queue_size: usize,

    /// Next queued URL, shown as "currently processing"
    pub current_url: Option<String>,

    pub in_flight: usize,

    /// Effective concurrency (1 when a crawl-delay applies)
    pub concurrency: usize,

    pub elapsed_ms: u64,
    pub pages_per_second: f64,
}

impl StatusSnapshot {
    /// Snapshot of a session that has not dispatched anything yet
    pub fn pending(concurrency: usize) -> Self {
        Self {
            status: CrawlStatus::Pending,
            crawled_pages: 0,
            total_pages: 0,
            error_count: 0,
            skipped_count: 0,
            avg_response_ms: 0.0,
            percent_complete: 0.0,
            eta_ms: None,
            queue_size: 0,
            current_url: None,
            in_flight: 0,
            concurrency,
            elapsed_ms: 0,
            pages_per_second: 0.0,
        }
    }
}

/// Pages per second over an elapsed window
pub fn throughput(crawled_pages: usize, elapsed_ms: u64) -> f64 {
    if elapsed_ms == 0 {
        0.0
    } else {
        crawled_pages as f64 / (elapsed_ms as f64 / 1000.0)
    }
}

/// Prints a finished crawl's statistics to stdout
///
/// # Arguments
///
/// * `result` - The finished crawl
pub fn print_statistics(result: &CrawlResult) {
    let stats = &result.stats;

    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Status: {}", result.status);
    println!("  Pages crawled: {}", stats.crawled_pages);
    println!("  Pages discovered: {}", stats.total_pages);
    println!("  Skipped (already crawled): {}", result.skipped_count);
    println!("  Sitemap URLs: {}", result.sitemap_urls.len());
    println!("  Average response: {:.0}ms", stats.avg_response_ms);
    println!();

    println!("Pages by Status:");
    let mut by_status: BTreeMap<u16, usize> = BTreeMap::new();
    for record in result.pages.values() {
        *by_status.entry(record.status).or_insert(0) += 1;
    }
    for (status, count) in &by_status {
        let label = if *status == 0 {
            "network error".to_string()
        } else {
            status.to_string()
        };
        let percentage = if stats.crawled_pages > 0 {
            (*count as f64 / stats.crawled_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    let ok = stats.crawled_pages.saturating_sub(stats.error_count);
    let success_rate = if stats.crawled_pages > 0 {
        (ok as f64 / stats.crawled_pages as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched without error)",
        success_rate, ok, stats.crawled_pages
    );
}
