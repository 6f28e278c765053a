//! Robots.txt and sitemap discovery module
//!
//! This module fetches and parses a site's robots.txt and resolves its
//! sitemaps into a flat set of page URLs. Discovery never fails: anything
//! unreachable or unparseable degrades to "no constraints" or a smaller set.

mod parser;
mod sitemap;

pub use parser::{RobotsDirectives, MAX_CRAWL_DELAY_SECS};
pub use sitemap::{
    looks_like_sitemap, parse_sitemap_locs, find_fallback_sitemap, resolve_sitemaps,
    FALLBACK_SITEMAP_PATHS, MAX_SITEMAP_DEPTH,
};

use reqwest::Client;
use std::collections::BTreeSet;
use url::Url;

/// Result of robots.txt and sitemap discovery for one site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Parsed robots.txt, `None` when it could not be fetched
    pub robots: Option<RobotsDirectives>,

    /// Page URLs listed by the site's sitemaps
    pub sitemap_urls: BTreeSet<String>,
}

/// Fetches robots.txt and resolves sitemaps for the site of `seed`
///
/// # Arguments
///
/// * `client` - HTTP client (carries the user agent and timeout)
/// * `seed` - Any URL on the site; only its origin is used
/// * `product_token` - Token used to select robots.txt groups
pub async fn discover(client: &Client, seed: &Url, product_token: &str) -> Discovery {
    let origin = seed.origin().ascii_serialization();

    let robots = fetch_robots(client, &origin, product_token).await;

    let mut roots: Vec<String> = robots
        .as_ref()
        .map(|r| r.sitemaps.clone())
        .unwrap_or_default();

    if roots.is_empty() {
        if let Some(found) = find_fallback_sitemap(client, &origin).await {
            roots.push(found);
        }
    }

    let sitemap_urls = if roots.is_empty() {
        BTreeSet::new()
    } else {
        resolve_sitemaps(client, &roots).await
    };

    tracing::info!(
        origin = %origin,
        robots = robots.is_some(),
        sitemaps = roots.len(),
        sitemap_urls = sitemap_urls.len(),
        "discovery finished"
    );

    Discovery {
        robots,
        sitemap_urls,
    }
}

/// Fetches and parses `{origin}/robots.txt`
///
/// # Returns
///
/// * `Some(RobotsDirectives)` - robots.txt was fetched with a 2xx status
/// * `None` - Network failure, timeout or error status
pub async fn fetch_robots(
    client: &Client,
    origin: &str,
    product_token: &str,
) -> Option<RobotsDirectives> {
    let robots_url = format!("{}/robots.txt", origin);
    let content = fetch_text(client, &robots_url).await?;
    let directives = RobotsDirectives::parse(&content, product_token);

    tracing::debug!(
        url = %robots_url,
        allow = directives.allow.len(),
        disallow = directives.disallow.len(),
        crawl_delay = ?directives.crawl_delay,
        "parsed robots.txt"
    );

    Some(directives)
}

/// GETs a URL and returns the body of a successful response
pub(crate) async fn fetch_text(client: &Client, url: &str) -> Option<String> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url, error = %e, "discovery request failed");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::debug!(url, status = response.status().as_u16(), "discovery request rejected");
        return None;
    }

    response.text().await.ok()
}
