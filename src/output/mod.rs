//! Output module for crawl events and reports
//!
//! This module handles:
//! - Running statistics and progress snapshots
//! - The event stream sent to consumers
//! - Orphaned / broken / empty page audits of finished crawls
//! - Markdown rendering of those audits

mod events;
mod markdown;
pub mod report;
pub mod stats;

pub use events::{CrawlEvent, PageLog};
pub use markdown::{format_markdown_report, write_markdown_report};
pub use report::{build_report, AuditReport, BrokenLink};
pub use stats::{print_statistics, throughput, CrawlStats, StatusSnapshot};
