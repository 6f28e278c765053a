use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Canonical dedup key for a URL
///
/// Lowercased scheme, host (with a non-default port) and path, without query
/// or fragment, and without a trailing slash unless the path is the root.
/// Two raw URLs that produce the same key are the same page for dedup and
/// incoming-link indexing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes a URL into its dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL as absolute; reject if malformed
/// 2. Accept only http and https
/// 3. Drop query string and fragment
/// 4. Lowercase scheme, host and path
/// 5. Strip the trailing slash unless the path is `/`
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(NormalizedKey)` - The canonical key
/// * `Err(UrlError)` - The URL cannot be used; callers skip it
///
/// # Examples
///
/// ```
/// use linkscout::url::normalize_url;
///
/// let key = normalize_url("HTTPS://Example.COM/About/?utm=1#team").unwrap();
/// assert_eq!(key.as_str(), "https://example.com/about");
/// ```
pub fn normalize_url(url_str: &str) -> Result<NormalizedKey, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(&url)
}

/// Normalizes an already parsed URL into its dedup key
pub fn normalize_parsed(url: &Url) -> Result<NormalizedKey, UrlError> {
    let scheme = url.scheme().to_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(UrlError::InvalidScheme(scheme));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    if host.is_empty() {
        return Err(UrlError::MissingDomain);
    }

    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    };

    let path = normalize_path(url.path());

    Ok(NormalizedKey(format!("{}://{}{}", scheme, authority, path)))
}

/// Lowercases a path and strips its trailing slash (except for the root)
fn normalize_path(path: &str) -> String {
    let lowered = path.to_lowercase();
    let trimmed = lowered.trim_end_matches('/');

    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
