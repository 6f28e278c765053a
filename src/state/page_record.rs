//! Per-page crawl outcome
//!
//! A `PageRecord` is created exactly once, when a fetch settles, and is never
//! modified afterwards.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Outcome of crawling one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// The URL as it was requested (query string kept)
    pub url: String,

    /// HTTP status code; 0 means the request never produced a response
    pub status: u16,

    pub title: Option<String>,

    pub description: Option<String>,

    /// Body size in bytes
    pub content_length: usize,

    /// Visible text is below the configured threshold
    pub is_empty: bool,

    /// Wall-clock time spent on the fetch (milliseconds)
    pub duration_ms: u64,

    /// Same-host links, deduplicated, in document order
    pub internal_links: Vec<String>,

    /// Links to other hosts, deduplicated, in document order
    pub external_links: Vec<String>,

    /// URL appeared in one of the site's sitemaps
    pub in_sitemap: bool,

    /// Final URL when the request was redirected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirected_to: Option<String>,

    pub error_message: Option<String>,

    /// Gzip-compressed body, only kept when configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,

    pub crawled_at: DateTime<Utc>,
}

impl PageRecord {
    /// Builds the record for a fetch that never got a response
    pub fn failure(url: &str, duration_ms: u64, error_message: String) -> Self {
        Self {
            url: url.to_string(),
            status: 0,
            title: None,
            description: None,
            content_length: 0,
            is_empty: true,
            duration_ms,
            internal_links: Vec::new(),
            external_links: Vec::new(),
            in_sitemap: false,
            redirected_to: None,
            error_message: Some(error_message),
            content: None,
            crawled_at: Utc::now(),
        }
    }

    /// Returns true for network failures and HTTP 4xx/5xx responses
    pub fn is_error(&self) -> bool {
        self.status == 0 || self.status >= 400
    }

    /// Returns the decompressed body if content was stored
    pub fn decompressed_content(&self) -> Option<String> {
        let compressed = self.content.as_ref()?;
        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut body = String::new();
        decoder.read_to_string(&mut body).ok()?;
        Some(body)
    }
}

/// Gzip-compresses a page body for storage in `PageRecord::content`
pub fn compress_content(body: &str) -> Option<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).ok()?;
    encoder.finish().ok()
}
