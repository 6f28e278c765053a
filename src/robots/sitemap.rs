//! Sitemap and sitemap-index resolution
//!
//! Sitemaps are fetched breadth-first from a set of roots. A `<loc>` that
//! looks like another sitemap is followed (up to `MAX_SITEMAP_DEPTH` levels);
//! everything else is collected as a page URL. Failures only shrink the
//! result.

use super::fetch_text;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use reqwest::Client;
use std::collections::{BTreeSet, HashSet, VecDeque};
use url::Url;

/// How many levels of nested sitemap indexes are followed
pub const MAX_SITEMAP_DEPTH: usize = 3;

/// Conventional sitemap locations tried when robots.txt declares none
pub const FALLBACK_SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// Extracts every `<loc>` value from a sitemap or sitemap index
///
/// Namespaced tags (`<sm:loc>`) are accepted. Parsing stops quietly at the
/// first XML error, keeping what was read so far.
pub fn parse_sitemap_locs(xml: &[u8]) -> Vec<String> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_loc = false;
    let mut locs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) => {
                if e.name().as_ref().ends_with(b"loc") {
                    in_loc = true;
                }
            }
            Ok(XmlEvent::End(e)) => {
                if e.name().as_ref().ends_with(b"loc") {
                    in_loc = false;
                }
            }
            Ok(XmlEvent::Text(t)) if in_loc => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        locs.push(text.to_string());
                    }
                }
            }
            Ok(XmlEvent::CData(c)) if in_loc => {
                let text = String::from_utf8_lossy(&c.into_inner()).trim().to_string();
                if !text.is_empty() {
                    locs.push(text);
                }
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => {
                tracing::debug!(error = %e, "sitemap XML error, keeping partial result");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    locs
}

/// Returns true if a `<loc>` points at another sitemap rather than a page
pub fn looks_like_sitemap(loc: &str) -> bool {
    let lower = loc.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or("");
    path.ends_with(".xml") || lower.contains("sitemap")
}

/// Fetches the given sitemaps and returns the page URLs they list
///
/// Nested sitemaps are followed until `MAX_SITEMAP_DEPTH`; a sitemap-looking
/// entry found deeper than that is dropped. Each sitemap URL is fetched at
/// most once, so index cycles terminate. Relative `<loc>` values are resolved
/// against the sitemap that contained them.
pub async fn resolve_sitemaps(client: &Client, roots: &[String]) -> BTreeSet<String> {
    let mut pages = BTreeSet::new();
    let mut fetched: HashSet<String> = HashSet::new();
    let mut pending: VecDeque<(String, usize)> =
        roots.iter().map(|root| (root.clone(), 1)).collect();

    while let Some((sitemap_url, depth)) = pending.pop_front() {
        if !fetched.insert(sitemap_url.clone()) {
            continue;
        }

        let Some(body) = fetch_text(client, &sitemap_url).await else {
            tracing::debug!(sitemap = %sitemap_url, "sitemap unavailable");
            continue;
        };

        let locs = parse_sitemap_locs(body.as_bytes());
        tracing::debug!(sitemap = %sitemap_url, entries = locs.len(), depth, "parsed sitemap");

        let base = Url::parse(&sitemap_url).ok();
        for loc in locs {
            let Some(absolute) = absolutize(&loc, base.as_ref()) else {
                continue;
            };

            if looks_like_sitemap(&absolute) {
                if depth < MAX_SITEMAP_DEPTH {
                    pending.push_back((absolute, depth + 1));
                } else {
                    tracing::debug!(sitemap = %absolute, "sitemap nesting limit reached");
                }
            } else {
                pages.insert(absolute);
            }
        }
    }

    pages
}

/// Tries the conventional locations and returns the first sitemap found
pub async fn find_fallback_sitemap(client: &Client, origin: &str) -> Option<String> {
    for path in FALLBACK_SITEMAP_PATHS {
        let candidate = format!("{}{}", origin, path);
        if fetch_text(client, &candidate).await.is_some() {
            tracing::debug!(sitemap = %candidate, "found sitemap at fallback location");
            return Some(candidate);
        }
    }
    None
}

fn absolutize(loc: &str, base: Option<&Url>) -> Option<String> {
    let parsed = match Url::parse(loc) {
        Ok(url) => url,
        Err(_) => base?.join(loc).ok()?,
    };
    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_urlset() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://example.com/</loc><lastmod>2024-01-01</lastmod></url>
              <url><loc> https://example.com/about?a=1&amp;b=2 </loc></url>
            </urlset>"#;
        assert_eq!(
            parse_sitemap_locs(xml),
            vec![
                "https://example.com/".to_string(),
                "https://example.com/about?a=1&b=2".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_sitemap_index_and_prefix() {
        let xml = br#"<sm:sitemapindex xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
              <sm:sitemap><sm:loc>https://example.com/posts.xml</sm:loc></sm:sitemap>
            </sm:sitemapindex>"#;
        assert_eq!(parse_sitemap_locs(xml), vec!["https://example.com/posts.xml".to_string()]);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_sitemap_locs(b"not xml at all").is_empty());
        assert!(parse_sitemap_locs(b"").is_empty());
        let partial = b"<urlset><url><loc>https://example.com/a</loc></url><url><loc>";
        assert_eq!(parse_sitemap_locs(partial), vec!["https://example.com/a".to_string()]);
    }

    #[test]
    fn test_looks_like_sitemap() {
        assert!(looks_like_sitemap("https://example.com/sitemap.xml"));
        assert!(looks_like_sitemap("https://example.com/posts.XML"));
        assert!(looks_like_sitemap("https://example.com/sitemaps/pages"));
        assert!(looks_like_sitemap("https://example.com/feed.xml?page=2"));
        assert!(!looks_like_sitemap("https://example.com/about"));
        assert!(!looks_like_sitemap("https://example.com/xml-guide"));
    }

    #[tokio::test]
    async fn test_resolve_nested_index() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<sitemapindex><sitemap><loc>{base}/pages.xml</loc></sitemap>\
                 <sitemap><loc>{base}/missing.xml</loc></sitemap></sitemapindex>"
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pages.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<urlset><url><loc>{base}/a</loc></url><url><loc>/b</loc></url>\
                 <url><loc>{base}/sitemap_index.xml</loc></url></urlset>"
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = Client::new();
        let pages = resolve_sitemaps(&client, &[format!("{base}/sitemap_index.xml")]).await;

        let expected: BTreeSet<String> = [format!("{base}/a"), format!("{base}/b")].into();
        assert_eq!(pages, expected);
    }

    #[tokio::test]
    async fn test_depth_bound_stops_chains() {
        let server = MockServer::start().await;
        let base = server.uri();

        for level in 1..=5 {
            Mock::given(method("GET"))
                .and(path(format!("/level{level}.xml")))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                    "<sitemapindex><sitemap><loc>{base}/level{}.xml</loc></sitemap></sitemapindex>\
                     <urlset><url><loc>{base}/page{level}</loc></url></urlset>",
                    level + 1
                )))
                .mount(&server)
                .await;
        }

        let client = Client::new();
        let pages = resolve_sitemaps(&client, &[format!("{base}/level1.xml")]).await;

        // Levels 1..=3 are fetched; level 4 is never requested
        assert!(pages.contains(&format!("{base}/page3")));
        assert!(!pages.contains(&format!("{base}/page4")));
    }

    #[tokio::test]
    async fn test_find_fallback_sitemap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<sitemapindex/>"))
            .mount(&server)
            .await;

        let client = Client::new();
        let found = find_fallback_sitemap(&client, &server.uri()).await;
        assert_eq!(found, Some(format!("{}/sitemap_index.xml", server.uri())));
    }
}
