//! Robots.txt parser implementation
//!
//! Parses `User-agent`, `Allow`, `Disallow`, `Crawl-delay`, `Sitemap` and
//! `Host` lines into a flat `RobotsDirectives` value for one product token.

use crate::url::matches_path_pattern;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest crawl delay honored, in seconds; larger values are clamped
pub const MAX_CRAWL_DELAY_SECS: f64 = 60.0;

/// Directives from robots.txt that apply to this crawler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotsDirectives {
    /// Product token the rules were resolved for
    pub user_agent: String,

    /// Allow patterns from all matching groups
    pub allow: Vec<String>,

    /// Disallow patterns from all matching groups
    pub disallow: Vec<String>,

    /// Crawl delay in seconds
    pub crawl_delay: Option<f64>,

    /// Every `Sitemap:` URL in the file, regardless of group
    pub sitemaps: Vec<String>,

    /// Preferred host from a `Host:` line
    pub host: Option<String>,
}

/// Which kind of group the current rule lines belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupMatch {
    None,
    Wildcard,
    Specific,
}

impl RobotsDirectives {
    /// Creates a permissive set of directives that allows everything
    ///
    /// This is used when robots.txt is missing, unreachable or ignored.
    pub fn allow_all(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            ..Self::default()
        }
    }

    /// Parses robots.txt content for the given product token
    ///
    /// A `User-agent` line matches when its value is `*` or is contained in
    /// the product token (case-insensitive). Consecutive `User-agent` lines
    /// form one group; the first rule line closes the group header. Rules of
    /// every matching group are collected. Unknown lines are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use linkscout::robots::RobotsDirectives;
    ///
    /// let robots = RobotsDirectives::parse("User-agent: *\nDisallow: /admin", "linkscout");
    /// assert!(!robots.is_allowed("/admin/users"));
    /// assert!(robots.is_allowed("/about"));
    /// ```
    pub fn parse(content: &str, product_token: &str) -> Self {
        let token = product_token.to_lowercase();
        let mut directives = Self::allow_all(product_token);

        let mut group = GroupMatch::None;
        let mut in_agent_header = false;
        let mut wildcard_delay: Option<f64> = None;
        let mut specific_delay: Option<f64> = None;

        for line in content.lines() {
            // Strip trailing comments
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A new header after rule lines starts a new group
                    if !in_agent_header {
                        group = GroupMatch::None;
                        in_agent_header = true;
                    }
                    let agent = value.to_lowercase();
                    if agent == "*" {
                        if group == GroupMatch::None {
                            group = GroupMatch::Wildcard;
                        }
                    } else if !agent.is_empty() && token.contains(&agent) {
                        group = GroupMatch::Specific;
                    }
                }
                "allow" => {
                    in_agent_header = false;
                    if group != GroupMatch::None && !value.is_empty() {
                        directives.allow.push(value.to_string());
                    }
                }
                "disallow" => {
                    in_agent_header = false;
                    if group != GroupMatch::None && !value.is_empty() {
                        directives.disallow.push(value.to_string());
                    }
                }
                "crawl-delay" => {
                    in_agent_header = false;
                    if let Ok(delay) = value.parse::<f64>() {
                        if delay.is_finite() && delay >= 0.0 {
                            let delay = delay.min(MAX_CRAWL_DELAY_SECS);
                            match group {
                                GroupMatch::Specific => specific_delay = Some(delay),
                                GroupMatch::Wildcard => wildcard_delay = Some(delay),
                                GroupMatch::None => {}
                            }
                        }
                    }
                }
                "sitemap" => {
                    // split_once keeps the scheme's colon in the value
                    if !value.is_empty() && !directives.sitemaps.iter().any(|s| s == value) {
                        directives.sitemaps.push(value.to_string());
                    }
                }
                "host" => {
                    if !value.is_empty() {
                        directives.host = Some(value.to_string());
                    }
                }
                _ => {
                    in_agent_header = false;
                }
            }
        }

        // Prefer specific user-agent delay over wildcard delay
        directives.crawl_delay = specific_delay.or(wildcard_delay);
        directives
    }

    /// Checks if a path (with optional query) may be fetched
    ///
    /// Allow patterns are checked first and win outright; then disallow
    /// patterns; with no match the path is allowed.
    pub fn is_allowed(&self, path: &str) -> bool {
        if self
            .allow
            .iter()
            .any(|pattern| matches_path_pattern(pattern, path))
        {
            return true;
        }

        !self
            .disallow
            .iter()
            .any(|pattern| matches_path_pattern(pattern, path))
    }

    /// Crawl delay as a `Duration`, if one applies
    ///
    /// Capped at `MAX_CRAWL_DELAY_SECS` even for directives that were not
    /// built by `parse`.
    pub fn crawl_delay_duration(&self) -> Option<Duration> {
        self.crawl_delay
            .filter(|d| *d > 0.0)
            .and_then(|d| Duration::try_from_secs_f64(d.min(MAX_CRAWL_DELAY_SECS)).ok())
    }

    /// Returns true if no allow/disallow rule applies
    pub fn is_unrestricted(&self) -> bool {
        self.allow.is_empty() && self.disallow.is_empty()
    }
}
