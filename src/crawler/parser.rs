//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Anchor targets, split into internal and external links
//! - Page title and meta description
//! - The length of the page's visible text (for empty-page detection)

use crate::url::{classify_link, resolve, LinkScope};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text is never rendered
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Content of <meta name="description">
    pub description: Option<String>,

    /// Same-host links (absolute, deduplicated)
    pub internal_links: Vec<String>,

    /// Other-host links (absolute, deduplicated)
    pub external_links: Vec<String>,

    /// Character count of whitespace-collapsed visible body text
    pub visible_text_len: usize,
}

/// Links found on one page, split by scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedLinks {
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` and `<area href="...">`
///
/// **Exclude:**
/// - `#fragment`, `javascript:`, `mailto:`, `tel:`, `data:` hrefs
/// - hrefs that do not resolve to an HTTP(S) URL
///
/// A link is internal when its host matches the host of `base_url`. Each
/// distinct link is reported once, in document order. Malformed HTML never
/// fails; it just yields whatever the tokenizer recovers.
///
/// # Example
///
/// ```
/// use linkscout::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.internal_links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let links = collect_links(&document, base_url);

    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        internal_links: links.internal,
        external_links: links.external,
        visible_text_len: visible_text(&document).chars().count(),
    }
}

/// Extracts just the links from HTML
pub fn extract_links(html: &str, base_url: &Url) -> ExtractedLinks {
    let document = Html::parse_document(html);
    collect_links(&document, base_url)
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts the meta description, matching the name case-insensitively
fn extract_description(document: &Html) -> Option<String> {
    let meta_selector = Selector::parse("meta[name][content]").ok()?;

    document
        .select(&meta_selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .map_or(false, |name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

/// Collects anchor targets, resolved and split by scope
fn collect_links(document: &Html, base_url: &Url) -> ExtractedLinks {
    let mut links = ExtractedLinks::default();
    let mut seen = HashSet::new();

    let Ok(selector) = Selector::parse("a[href], area[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve(href, base_url) else {
            continue;
        };

        let absolute = resolved.to_string();
        if !seen.insert(absolute.clone()) {
            continue;
        }

        match classify_link(&resolved, base_url) {
            LinkScope::Internal => links.internal.push(absolute),
            LinkScope::External => links.external.push(absolute),
        }
    }

    links
}

/// Returns the body's rendered text with whitespace collapsed
fn visible_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut text = String::new();
    for node in body.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| HIDDEN_ELEMENTS.contains(&el.name()))
        });

        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }

    collapse_whitespace(&text)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
