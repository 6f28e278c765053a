//! Link audit derived from a finished crawl
//!
//! `build_report` is a pure function of the page records and the sitemap
//! set; it never looks at engine state.

use crate::crawler::CrawlResult;
use crate::url::{normalize_url, NormalizedKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A crawled URL that failed, with the pages linking to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub url: String,
    pub status: u16,
    pub error: Option<String>,

    /// Crawled pages with an internal link to this URL
    pub referrers: Vec<String>,
}

/// Orphaned, broken and empty pages of one crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Pages nothing else links to and no sitemap lists (seed excluded)
    pub orphaned: Vec<String>,

    pub broken: Vec<BrokenLink>,

    /// Successful HTML pages below the visible-text threshold
    pub empty: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty() && self.broken.is_empty() && self.empty.is_empty()
    }
}

/// Builds the audit for a finished crawl
///
/// Incoming links are matched by `NormalizedKey`, so `/a`, `/a/` and
/// `/a?x=1` all count as links to the same page. A page linking to itself
/// does not make it reachable.
pub fn build_report(result: &CrawlResult) -> AuditReport {
    // key -> pages linking to it (by URL, deduplicated)
    let mut incoming: HashMap<NormalizedKey, BTreeSet<String>> = HashMap::new();
    for (from_key, record) in &result.pages {
        for link in &record.internal_links {
            let Ok(to_key) = normalize_url(link) else {
                continue;
            };
            if &to_key == from_key {
                continue;
            }
            incoming.entry(to_key).or_default().insert(record.url.clone());
        }
    }

    let sitemap_keys: HashSet<NormalizedKey> = result
        .sitemap_urls
        .iter()
        .filter_map(|url| normalize_url(url).ok())
        .collect();

    let seed_key = result
        .config
        .seed_url
        .as_deref()
        .and_then(|seed| normalize_url(seed).ok());

    let mut report = AuditReport::default();

    for (key, record) in &result.pages {
        let referrers = incoming.get(key);

        if record.is_error() {
            report.broken.push(BrokenLink {
                url: record.url.clone(),
                status: record.status,
                error: record.error_message.clone(),
                referrers: referrers
                    .map(|r| r.iter().cloned().collect())
                    .unwrap_or_default(),
            });
        } else if record.is_empty && record.error_message.is_none() {
            report.empty.push(record.url.clone());
        }

        let is_seed = seed_key.as_ref() == Some(key);
        let linked = referrers.map_or(false, |r| !r.is_empty());
        if !is_seed && !linked && !record.in_sitemap && !sitemap_keys.contains(key) {
            report.orphaned.push(record.url.clone());
        }
    }

    tracing::debug!(
        orphaned = report.orphaned.len(),
        broken = report.broken.len(),
        empty = report.empty.len(),
        "built audit report"
    );

    report
}
