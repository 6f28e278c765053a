//! Crawler module for background site crawling
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a hard per-request timeout
//! - HTML parsing and link extraction
//! - Frontier, dedup and politeness bookkeeping (`CrawlSession`)
//! - The coordinator task and the `CrawlEngine` command surface

mod coordinator;
mod engine;
mod fetcher;
mod parser;
mod scheduler;

pub use engine::{Command, CrawlEngine, CrawlResult};
pub use fetcher::{build_http_client, FetchFailure, Fetcher};
pub use parser::{extract_links, parse_html, ExtractedLinks, ParsedPage};
pub use scheduler::{CrawlSession, Enqueue, QueuedUrl};

use crate::config::CrawlConfig;
use crate::output::CrawlEvent;
use crate::ScoutError;

/// Runs one crawl to its end and returns the completed result
///
/// Convenience wrapper around `CrawlEngine` for callers that do not need
/// pause/resume or the event stream.
///
/// # Returns
///
/// * `Ok(CrawlResult)` - The crawl completed
/// * `Err(ScoutError)` - Setup failed, or the crawl failed or was cancelled
pub async fn crawl(config: CrawlConfig) -> Result<CrawlResult, ScoutError> {
    let (mut engine, mut events) = CrawlEngine::new();
    engine.start(config)?;

    while let Some(event) = events.recv().await {
        match event {
            CrawlEvent::Completed(result) => return Ok(*result),
            CrawlEvent::Cancelled(_) => {
                return Err(ScoutError::Task("crawl was cancelled".to_string()))
            }
            CrawlEvent::Error { message } => return Err(ScoutError::Task(message)),
            _ => {}
        }
    }

    Err(ScoutError::Task("event stream closed before completion".to_string()))
}
