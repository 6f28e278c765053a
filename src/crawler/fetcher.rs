//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building HTTP clients with the configured user agent
//! - A single GET per URL under a hard timeout
//! - Error classification (timeout, blocked, generic network)
//! - Turning every outcome into a `PageRecord`
//!
//! Failures are never retried here.

use crate::config::CrawlConfig;
use crate::crawler::parser::parse_html;
use crate::state::{compress_content, PageRecord};
use chrono::Utc;
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::time::{Duration, Instant};
use url::Url;

/// Maximum redirect hops followed for one page
const MAX_REDIRECTS: usize = 10;

/// Why a fetch produced no response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The hard timeout elapsed
    Timeout(Duration),
    /// The connection was refused, reset or otherwise blocked
    Blocked(String),
    /// Any other transport-level error
    Network(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(limit) => write!(f, "Request timed out after {}ms", limit.as_millis()),
            Self::Blocked(detail) => write!(f, "Connection blocked or refused: {}", detail),
            Self::Network(detail) => write!(f, "Network error: {}", detail),
        }
    }
}

impl FetchFailure {
    /// Classifies a reqwest error
    pub fn classify(error: &reqwest::Error, limit: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(limit)
        } else if error.is_connect() {
            Self::Blocked(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Response data read within the timeout window
struct RawResponse {
    final_url: Url,
    status: reqwest::StatusCode,
    content_type: Option<String>,
    body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header value
/// * `timeout` - Per-request timeout
///
/// # Example
///
/// ```no_run
/// use linkscout::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("linkscout/0.1", Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches single pages and turns the outcome into a `PageRecord`
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    empty_threshold: usize,
    store_content: bool,
}

impl Fetcher {
    /// Creates a fetcher from the crawl configuration
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, config.timeout())?;
        Ok(Self {
            client,
            timeout: config.timeout(),
            empty_threshold: config.empty_threshold,
            store_content: config.store_content,
        })
    }

    /// The shared HTTP client (also used for robots.txt and sitemaps)
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The hard per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches a URL and always returns a record
    ///
    /// # Outcomes
    ///
    /// | Condition | Record |
    /// |-----------|--------|
    /// | 2xx/3xx HTML | status, title, description, links, emptiness |
    /// | 2xx non-HTML | status, no links, `is_empty`, note in `error_message` |
    /// | HTTP 4xx/5xx | status, no links, `is_empty`, `"HTTP <code>"` message |
    /// | Timeout | status 0, timeout message |
    /// | Connection refused/reset | status 0, blocked message |
    /// | Other transport error | status 0, network message |
    pub async fn fetch(&self, url: &str) -> PageRecord {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.request(url)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Err(_) => {
                let failure = FetchFailure::Timeout(self.timeout);
                tracing::debug!(url, %failure, "fetch failed");
                PageRecord::failure(url, duration_ms, failure.to_string())
            }
            Ok(Err(failure)) => {
                tracing::debug!(url, %failure, "fetch failed");
                PageRecord::failure(url, duration_ms, failure.to_string())
            }
            Ok(Ok(response)) => self.build_record(url, response, duration_ms),
        }
    }

    /// Sends the GET and reads the body
    async fn request(&self, url: &str) -> Result<RawResponse, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::classify(&e, self.timeout))?;

        let final_url = response.url().clone();
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::classify(&e, self.timeout))?;

        Ok(RawResponse {
            final_url,
            status,
            content_type,
            body,
        })
    }

    fn build_record(&self, url: &str, response: RawResponse, duration_ms: u64) -> PageRecord {
        let redirected = Url::parse(url).map_or(true, |requested| requested != response.final_url);
        if redirected {
            tracing::debug!(url, final_url = %response.final_url, "request was redirected");
        }

        let mut record = PageRecord {
            url: url.to_string(),
            status: response.status.as_u16(),
            title: None,
            description: None,
            content_length: response.body.len(),
            is_empty: true,
            duration_ms,
            internal_links: Vec::new(),
            external_links: Vec::new(),
            in_sitemap: false,
            redirected_to: redirected.then(|| response.final_url.to_string()),
            error_message: None,
            content: None,
            crawled_at: Utc::now(),
        };

        if response.status.is_client_error() || response.status.is_server_error() {
            record.error_message = Some(format!(
                "HTTP {} {}",
                response.status.as_u16(),
                response.status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string());
            return record;
        }

        if let Some(content_type) = &response.content_type {
            if !is_html(content_type) {
                record.error_message = Some(format!("Skipped non-HTML content ({})", content_type));
                return record;
            }
        }

        let parsed = parse_html(&response.body, &response.final_url);
        record.title = parsed.title;
        record.description = parsed.description;
        record.internal_links = parsed.internal_links;
        record.external_links = parsed.external_links;
        record.is_empty = parsed.visible_text_len < self.empty_threshold;

        if self.store_content {
            record.content = compress_content(&response.body);
        }

        record
    }
}

fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}
