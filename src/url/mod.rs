//! URL handling module for linkscout
//!
//! This module provides URL normalization into dedup keys, link resolution,
//! same-site classification and robots.txt path matching.

mod domain;
mod matcher;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{depth_from, extract_domain, is_same_domain, path_depth};
pub use matcher::matches_path_pattern;
pub use normalize::{normalize_parsed, normalize_url, NormalizedKey};

/// Href prefixes that never point at a crawlable page
const NON_NAVIGATIONAL: &[&str] = &["mailto:", "tel:", "javascript:", "data:"];

/// Where a link points relative to the page it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same host as the referring page
    Internal,
    /// Any other host
    External,
}

/// Resolves a link href to an absolute URL
///
/// Absolute `http(s)://` hrefs are taken as-is; relative hrefs resolve against
/// `base`. Returns None if the link should be excluded:
/// - empty and fragment-only hrefs
/// - `mailto:`, `tel:`, `javascript:` and `data:` hrefs
/// - hrefs that fail to parse
/// - anything that is not HTTP(S) after resolution
///
/// The fragment of the resolved URL is dropped.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use linkscout::url::resolve;
///
/// let base = Url::parse("https://example.com/docs/intro").unwrap();
/// assert_eq!(
///     resolve("setup#step-2", &base).unwrap().as_str(),
///     "https://example.com/docs/setup"
/// );
/// assert!(resolve("mailto:team@example.com", &base).is_none());
/// ```
pub fn resolve(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if NON_NAVIGATIONAL
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);

    Some(resolved)
}

/// Classifies a resolved link against the page it was found on
pub fn classify_link(link: &Url, base: &Url) -> LinkScope {
    if is_same_domain(link, base) {
        LinkScope::Internal
    } else {
        LinkScope::External
    }
}
