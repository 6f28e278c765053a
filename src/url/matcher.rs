/// Checks if a URL path matches a robots.txt path pattern
///
/// Three pattern forms are supported:
/// 1. Plain prefix: "/admin" matches "/admin", "/admin/users", "/administrator"
/// 2. Glob: "*" matches any run of characters, "/*.pdf" matches "/files/a.pdf"
/// 3. Anchored: a trailing "$" requires the path to end there, "/page$"
///    matches only "/page"
///
/// # Arguments
///
/// * `pattern` - The robots.txt path pattern
/// * `path` - The path (and query, if any) being checked
///
/// # Examples
///
/// ```
/// use linkscout::url::matches_path_pattern;
///
/// assert!(matches_path_pattern("/admin", "/admin/users"));
/// assert!(matches_path_pattern("/*.pdf", "/docs/report.pdf"));
/// assert!(matches_path_pattern("/page$", "/page"));
/// assert!(!matches_path_pattern("/page$", "/page/2"));
/// ```
pub fn matches_path_pattern(pattern: &str, path: &str) -> bool {
    let (body, anchored) = match pattern.strip_suffix('$') {
        Some(body) => (body, true),
        None => (pattern, false),
    };

    let parts: Vec<&str> = body.split('*').collect();
    let last = parts.len() - 1;

    // The first part is always a literal prefix
    if !path.starts_with(parts[0]) {
        return false;
    }
    let mut pos = parts[0].len();

    for (i, part) in parts.iter().enumerate().skip(1) {
        if i == last && anchored {
            return path.len() >= pos + part.len() && path.ends_with(part);
        }

        match path[pos..].find(part) {
            Some(offset) => pos += offset + part.len(),
            None => return false,
        }
    }

    !anchored || pos == path.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_match() {
        assert!(matches_path_pattern("/admin", "/admin"));
        assert!(matches_path_pattern("/admin", "/admin/users"));
        assert!(matches_path_pattern("/admin", "/administrator"));
        assert!(!matches_path_pattern("/admin", "/public/admin"));
    }

    #[test]
    fn test_root_matches_everything() {
        assert!(matches_path_pattern("/", "/"));
        assert!(matches_path_pattern("/", "/anything/at/all"));
    }

    #[test]
    fn test_wildcard_in_middle() {
        assert!(matches_path_pattern("/private/*/edit", "/private/42/edit"));
        assert!(matches_path_pattern("/private/*/edit", "/private/a/b/edit/x"));
        assert!(!matches_path_pattern("/private/*/edit", "/private/42/view"));
    }

    #[test]
    fn test_wildcard_extension() {
        assert!(matches_path_pattern("/*.pdf", "/files/report.pdf"));
        assert!(matches_path_pattern("/*.pdf", "/files/report.pdf?download=1"));
        assert!(!matches_path_pattern("/*.pdf", "/files/report.html"));
    }

    #[test]
    fn test_anchored_exact() {
        assert!(matches_path_pattern("/page$", "/page"));
        assert!(!matches_path_pattern("/page$", "/page/"));
        assert!(!matches_path_pattern("/page$", "/pages"));
    }

    #[test]
    fn test_anchored_with_wildcard() {
        assert!(matches_path_pattern("/*.php$", "/index.php"));
        assert!(!matches_path_pattern("/*.php$", "/index.php?x=1"));
        assert!(matches_path_pattern("/a*$", "/abc"));
    }

    #[test]
    fn test_consecutive_wildcards() {
        assert!(matches_path_pattern("/a**b", "/axxb"));
        assert!(matches_path_pattern("*", "/anything"));
    }

    #[test]
    fn test_anchored_suffix_cannot_overlap_prefix() {
        assert!(!matches_path_pattern("/ab*ab$", "/ab"));
        assert!(matches_path_pattern("/ab*ab$", "/abab"));
    }
}
