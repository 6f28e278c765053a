use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for linkscout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Immutable input for one crawl session
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Start URL; also defines the site and the depth reference
    #[serde(default)]
    pub seed_url: Option<String>,

    /// Extra pages to crawl regardless of whether anything links to them
    #[serde(default)]
    pub manual_pages: Vec<String>,

    /// Maximum path-segment depth below the seed
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Stop after this many pages have settled
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum number of simultaneous fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Hard timeout for a single fetch (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether robots.txt allow/disallow and crawl-delay are honored
    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// User-Agent header; the text before the first '/' is the robots token
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Pages with fewer visible characters than this are flagged empty
    #[serde(default = "default_empty_threshold")]
    pub empty_threshold: usize,

    /// Keep a gzip-compressed copy of each page body
    #[serde(default)]
    pub store_content: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database holding finished sessions
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Path to the markdown report file
    #[serde(default = "default_summary_path")]
    pub summary_path: String,
}

fn default_max_depth() -> usize {
    5
}

fn default_max_pages() -> usize {
    500
}

fn default_concurrency() -> usize {
    5
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("linkscout/{}", env!("CARGO_PKG_VERSION"))
}

fn default_empty_threshold() -> usize {
    100
}

fn default_database_path() -> String {
    "./linkscout.db".to_string()
}

fn default_summary_path() -> String {
    "./linkscout-report.md".to_string()
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_url: None,
            manual_pages: Vec::new(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            timeout_ms: default_timeout_ms(),
            respect_robots: true,
            user_agent: default_user_agent(),
            empty_threshold: default_empty_threshold(),
            store_content: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            summary_path: default_summary_path(),
        }
    }
}

impl CrawlConfig {
    /// Creates a configuration with defaults for everything but the seed
    pub fn with_seed(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: Some(seed_url.into()),
            ..Self::default()
        }
    }

    /// Returns the robots.txt product token derived from the user agent
    ///
    /// "linkscout/0.1 (+https://example.com)" yields "linkscout".
    pub fn product_token(&self) -> &str {
        let token = self
            .user_agent
            .split(|c: char| c == '/' || c.is_whitespace())
            .next()
            .unwrap_or("");
        if token.is_empty() {
            "*"
        } else {
            token
        }
    }

    /// Per-request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The seed URL followed by manual pages, in configuration order
    pub fn seeds(&self) -> impl Iterator<Item = &str> {
        self.seed_url
            .iter()
            .map(String::as_str)
            .chain(self.manual_pages.iter().map(String::as_str))
    }
}
