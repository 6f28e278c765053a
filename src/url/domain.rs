use url::Url;

/// Extracts the host (with a non-default port) from a URL
///
/// The host is lowercased; the port is included when the URL names one that
/// differs from the scheme default, so two servers on the same machine are
/// different sites.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use linkscout::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("localhost:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns true if both URLs point at the same host (case-insensitive)
pub fn is_same_domain(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Number of non-empty path segments in a URL
pub fn path_depth(url: &Url) -> usize {
    url.path().split('/').filter(|s| !s.is_empty()).count()
}

/// Depth of `candidate` relative to `seed`, measured in path segments
///
/// Pages shallower than the seed are depth 0.
pub fn depth_from(seed: &Url, candidate: &Url) -> usize {
    path_depth(candidate).saturating_sub(path_depth(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_extract_simple_domain() {
        assert_eq!(
            extract_domain(&url("https://example.com/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_with_port() {
        assert_eq!(
            extract_domain(&url("http://127.0.0.1:4000/x")),
            Some("127.0.0.1:4000".to_string())
        );
    }

    #[test]
    fn test_extract_mixed_case() {
        assert_eq!(
            extract_domain(&url("https://Blog.Example.COM/")),
            Some("blog.example.com".to_string())
        );
    }

    #[test]
    fn test_same_domain() {
        assert!(is_same_domain(
            &url("https://example.com/a"),
            &url("https://EXAMPLE.com/b?x=1")
        ));
        assert!(!is_same_domain(
            &url("https://example.com/"),
            &url("https://blog.example.com/")
        ));
        assert!(!is_same_domain(
            &url("http://localhost:8000/"),
            &url("http://localhost:9000/")
        ));
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth(&url("https://example.com/")), 0);
        assert_eq!(path_depth(&url("https://example.com/a")), 1);
        assert_eq!(path_depth(&url("https://example.com/a/b/")), 2);
    }

    #[test]
    fn test_depth_from_seed() {
        let seed = url("https://example.com/docs/");
        assert_eq!(depth_from(&seed, &url("https://example.com/docs/intro")), 1);
        assert_eq!(depth_from(&seed, &url("https://example.com/")), 0);
        assert_eq!(depth_from(&seed, &url("https://example.com/docs/a/b")), 2);
    }
}
