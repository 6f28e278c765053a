//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end through the engine's command and
//! event surface.

use linkscout::crawler::crawl;
use linkscout::output::build_report;
use linkscout::robots::MAX_CRAWL_DELAY_SECS;
use linkscout::storage::{session_id, SessionStore, SqliteSessionStore};
use linkscout::{CrawlConfig, CrawlEngine, CrawlEvent, CrawlResult, CrawlStatus, ScoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Builds an HTML page with enough text not to count as empty
fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>\n", href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>\
         <p>This page has enough visible text to stay above the emptiness threshold \
         used by the auditor in every one of these tests.</p>\n{}</body></html>",
        title, anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html_page(route, links), "text/html"))
        .mount(server)
        .await;
}

async fn mount_slow_page(server: &MockServer, route: &str, links: &[&str], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page(route, links), "text/html")
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/plain"))
        .mount(server)
        .await;
}

/// Creates a test configuration seeded at the mock server's root
fn create_test_config(server: &MockServer) -> CrawlConfig {
    let mut config = CrawlConfig::with_seed(format!("{}/", server.uri()));
    config.timeout_ms = 5_000;
    config.user_agent = "TestBot/1.0".to_string();
    config
}

fn page_url(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}

/// Receives events until a terminal one arrives
async fn collect_events(events: &mut UnboundedReceiver<CrawlEvent>) -> Vec<CrawlEvent> {
    let mut collected = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(20), events.recv())
            .await
            .expect("timed out waiting for crawl events")
            .expect("event stream closed");
        let terminal = event.is_terminal();
        collected.push(event);
        if terminal {
            return collected;
        }
    }
}

/// Receives events until one matches, returning it
async fn wait_for<F>(events: &mut UnboundedReceiver<CrawlEvent>, mut matches: F) -> CrawlEvent
where
    F: FnMut(&CrawlEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(20), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed");
        if matches(&event) {
            return event;
        }
        assert!(!event.is_terminal(), "crawl ended early with {:?}", event);
    }
}

fn completed(events: &[CrawlEvent]) -> &CrawlResult {
    match events.last() {
        Some(CrawlEvent::Completed(result)) => result,
        other => panic!("expected completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_full_crawl_with_broken_link() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/page1", "/page2"]).await;
    mount_page(&server, "/page1", &["/"]).await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (mut engine, mut events) = CrawlEngine::new();
    engine.start(create_test_config(&server)).unwrap();
    let events = collect_events(&mut events).await;

    assert!(matches!(events.first(), Some(CrawlEvent::Started { .. })));
    let logs = events
        .iter()
        .filter(|e| matches!(e, CrawlEvent::Log(_)))
        .count();
    assert_eq!(logs, 3);

    // Counts never go backwards and discovery always covers completion
    let mut last_crawled = 0;
    for event in &events {
        if let CrawlEvent::Progress(snapshot) = event {
            assert!(snapshot.crawled_pages >= last_crawled);
            assert!(snapshot.total_pages >= snapshot.crawled_pages);
            last_crawled = snapshot.crawled_pages;
        }
    }
    assert_eq!(last_crawled, 3);

    let result = completed(&events);
    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.pages.len(), 3);
    assert_eq!(result.stats.crawled_pages, 3);
    assert_eq!(result.stats.total_pages, 3);
    assert_eq!(result.stats.error_count, 1);

    let broken = result
        .pages
        .values()
        .find(|p| p.url == page_url(&server, "/page2"))
        .unwrap();
    assert_eq!(broken.status, 404);
    assert!(broken.error_message.as_deref().unwrap().starts_with("HTTP 404"));
    assert!(broken.internal_links.is_empty());

    let report = build_report(result);
    assert_eq!(report.broken.len(), 1);
    assert_eq!(report.broken[0].url, page_url(&server, "/page2"));
    assert_eq!(report.broken[0].referrers, vec![page_url(&server, "/")]);
    assert!(report.orphaned.is_empty());
}

#[tokio::test]
async fn test_depth_zero_crawls_only_seeds() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/a", "/b"]).await;
    mount_page(&server, "/deep/landing", &[]).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.max_depth = 0;
    config.manual_pages = vec![page_url(&server, "/deep/landing")];

    let result = crawl(config).await.unwrap();

    // Manual pages bypass the depth filter; discovered links do not
    assert_eq!(result.pages.len(), 2);
    assert!(result
        .pages
        .values()
        .any(|p| p.url == page_url(&server, "/deep/landing")));

    // The manual page has no incoming links and is not in a sitemap
    let report = build_report(&result);
    assert_eq!(report.orphaned, vec![page_url(&server, "/deep/landing")]);
}

#[tokio::test]
async fn test_robots_disallow_is_honored() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private\n").await;
    mount_page(&server, "/", &["/public", "/private", "/private/deeper"]).await;
    mount_page(&server, "/public", &[]).await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = crawl(create_test_config(&server)).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    let robots = result.robots.as_ref().unwrap();
    assert_eq!(robots.disallow, vec!["/private".to_string()]);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /\nCrawl-delay: 5\n").await;
    mount_page(&server, "/", &["/a"]).await;
    mount_page(&server, "/a", &[]).await;

    let mut config = create_test_config(&server);
    config.respect_robots = false;

    let started = Instant::now();
    let result = crawl(config).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// Serves a page and remembers when each request arrived
struct TimedPage {
    body: String,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for TimedPage {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200).set_body_raw(self.body.clone(), "text/html")
    }
}

#[tokio::test]
async fn test_crawl_delay_paces_requests() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nCrawl-delay: 1\n").await;

    let arrivals = Arc::new(Mutex::new(Vec::new()));
    for (route, links) in [("/", vec!["/a", "/b", "/c"]), ("/a", vec![]), ("/b", vec![]), ("/c", vec![])] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(TimedPage {
                body: html_page(route, &links),
                arrivals: Arc::clone(&arrivals),
            })
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server);
    config.concurrency = 5;

    let (mut engine, mut events) = CrawlEngine::new();
    engine.start(config).unwrap();
    let events = collect_events(&mut events).await;

    let result = completed(&events);
    assert_eq!(result.pages.len(), 4);

    // Every page request waits a full second after the previous one; the
    // small allowance covers connection setup on the first request
    let arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 4);
    for pair in arrivals.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= Duration::from_millis(950), "requests only {:?} apart", gap);
    }

    // A crawl-delay forces a single lane
    let progress = events
        .iter()
        .find_map(|e| match e {
            CrawlEvent::Progress(snapshot) => Some(snapshot),
            _ => None,
        })
        .unwrap();
    assert_eq!(progress.concurrency, 1);
    assert!(events.iter().all(|e| match e {
        CrawlEvent::Progress(snapshot) => snapshot.in_flight <= 1,
        _ => true,
    }));
}

#[tokio::test]
async fn test_huge_crawl_delay_still_completes() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nCrawl-delay: 1e20\n").await;
    mount_page(&server, "/", &[]).await;

    let (mut engine, mut events) = CrawlEngine::new();
    engine.start(create_test_config(&server)).unwrap();
    let events = collect_events(&mut events).await;

    let result = completed(&events);
    assert_eq!(result.pages.len(), 1);
    let robots = result.robots.as_ref().unwrap();
    assert_eq!(robots.crawl_delay, Some(MAX_CRAWL_DELAY_SECS));
    assert_eq!(engine.wait().await.unwrap(), CrawlStatus::Completed);
}

#[tokio::test]
async fn test_same_host_redirect_is_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/home/"))
        .mount(&server)
        .await;
    mount_page(&server, "/home/", &["about"]).await;
    mount_page(&server, "/home/about", &[]).await;

    let result = crawl(create_test_config(&server)).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    let seed = result
        .pages
        .values()
        .find(|p| p.url == page_url(&server, "/"))
        .unwrap();
    assert_eq!(seed.status, 200);
    assert_eq!(seed.redirected_to, Some(page_url(&server, "/home/")));
    assert!(result
        .pages
        .values()
        .any(|p| p.url == page_url(&server, "/home/about")));
}

#[tokio::test]
async fn test_seed_redirect_to_other_host_is_followed() {
    let old_site = MockServer::start().await;
    let new_site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", page_url(&new_site, "/").as_str()),
        )
        .mount(&old_site)
        .await;
    mount_page(&new_site, "/", &["/about", "/team"]).await;
    mount_page(&new_site, "/about", &[]).await;
    mount_page(&new_site, "/team", &[]).await;

    let result = crawl(create_test_config(&old_site)).await.unwrap();

    assert_eq!(result.pages.len(), 3);
    let seed = result
        .pages
        .values()
        .find(|p| p.url == page_url(&old_site, "/"))
        .unwrap();
    assert_eq!(seed.redirected_to, Some(page_url(&new_site, "/")));
    assert_eq!(seed.internal_links.len(), 2);
    for route in ["/about", "/team"] {
        assert!(result
            .pages
            .values()
            .any(|p| p.url == page_url(&new_site, route) && p.status == 200));
    }
}

#[tokio::test]
async fn test_max_pages_limit() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/1", "/2", "/3", "/4", "/5"]).await;
    for route in ["/1", "/2", "/3", "/4", "/5"] {
        mount_page(&server, route, &[]).await;
    }

    let mut config = create_test_config(&server);
    config.max_pages = 3;
    config.concurrency = 5;

    let result = crawl(config).await.unwrap();

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.pages.len(), 3);
    assert_eq!(result.stats.crawled_pages, 3);
}

#[tokio::test]
async fn test_duplicate_urls_crawled_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/", "/a", "/a/", "/A?ref=nav", "/a#top"]).await;
    mount_page(&server, "/a", &["/"]).await;

    let result = crawl(create_test_config(&server)).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.stats.total_pages, 2);
    // The seed's self-link and /a's link back to the seed
    assert_eq!(result.skipped_count, 2);
}

#[tokio::test]
async fn test_cancel_stops_crawl() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/a", "/b", "/c"]).await;
    mount_page(&server, "/a", &[]).await;
    mount_slow_page(&server, "/b", &[], Duration::from_secs(2)).await;
    mount_slow_page(&server, "/c", &[], Duration::from_secs(2)).await;

    let mut config = create_test_config(&server);
    config.concurrency = 1;

    let (mut engine, mut events) = CrawlEngine::new();
    engine.start(config).unwrap();

    let mut logs = 0;
    wait_for(&mut events, |e| {
        if matches!(e, CrawlEvent::Log(_)) {
            logs += 1;
        }
        logs == 2
    })
    .await;

    engine.cancel().unwrap();

    let cancelled = wait_for(&mut events, |e| matches!(e, CrawlEvent::Cancelled(_))).await;
    match cancelled {
        CrawlEvent::Cancelled(snapshot) => {
            assert_eq!(snapshot.status, CrawlStatus::Cancelled);
            assert_eq!(snapshot.crawled_pages, 2);
        }
        other => panic!("expected cancelled, got {:?}", other),
    }

    // The in-flight /b fetch is discarded and nothing else is reported
    let after = tokio::time::timeout(Duration::from_secs(3), events.recv()).await;
    assert!(after.is_err(), "unexpected event after cancel: {:?}", after);

    assert_eq!(engine.wait().await.unwrap(), CrawlStatus::Cancelled);
    assert!(matches!(engine.cancel(), Err(ScoutError::NotStarted)));
    assert_eq!(engine.status().unwrap().status, CrawlStatus::Cancelled);
}

#[tokio::test]
async fn test_sitemap_pages_are_crawled() {
    let server = MockServer::start().await;
    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{}</loc></url>
  <url><loc>{}</loc></url>
</urlset>"#,
        page_url(&server, "/"),
        page_url(&server, "/hidden")
    );
    mount_robots(
        &server,
        &format!("User-agent: *\nAllow: /\nSitemap: {}\n", page_url(&server, "/sitemap.xml")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sitemap, "application/xml"))
        .mount(&server)
        .await;
    mount_page(&server, "/", &[]).await;
    mount_page(&server, "/hidden", &[]).await;

    let result = crawl(create_test_config(&server)).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.sitemap_urls.len(), 2);
    let hidden = result
        .pages
        .values()
        .find(|p| p.url == page_url(&server, "/hidden"))
        .unwrap();
    assert!(hidden.in_sitemap);

    // Listed in the sitemap, so not orphaned even without incoming links
    assert!(build_report(&result).orphaned.is_empty());
}

#[tokio::test]
async fn test_fallback_sitemap_without_robots() {
    let server = MockServer::start().await;
    let sitemap = format!(
        "<urlset><url><loc>{}</loc></url></urlset>",
        page_url(&server, "/from-sitemap")
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sitemap, "application/xml"))
        .mount(&server)
        .await;
    mount_page(&server, "/", &[]).await;
    mount_page(&server, "/from-sitemap", &[]).await;

    let result = crawl(create_test_config(&server)).await.unwrap();

    assert!(result.robots.is_none());
    assert_eq!(result.pages.len(), 2);
}

#[tokio::test]
async fn test_pause_and_resume() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/a", "/b", "/c"]).await;
    for route in ["/a", "/b", "/c"] {
        mount_slow_page(&server, route, &[], Duration::from_millis(300)).await;
    }

    let mut config = create_test_config(&server);
    config.concurrency = 1;

    let (mut engine, mut events) = CrawlEngine::new();
    engine.start(config).unwrap();

    wait_for(&mut events, |e| matches!(e, CrawlEvent::Log(_))).await;
    engine.pause().unwrap();
    wait_for(&mut events, |e| matches!(e, CrawlEvent::Paused(_))).await;

    // Let the in-flight fetch settle, then confirm nothing new is dispatched
    tokio::time::sleep(Duration::from_millis(800)).await;
    let paused = engine.status().unwrap();
    assert_eq!(paused.status, CrawlStatus::Paused);
    assert_eq!(paused.in_flight, 0);
    assert!(paused.crawled_pages <= 2);
    assert!(paused.queue_size >= 2);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(engine.status().unwrap().crawled_pages, paused.crawled_pages);

    engine.request_status().unwrap();
    match wait_for(&mut events, |e| matches!(e, CrawlEvent::Progress(_))).await {
        CrawlEvent::Progress(snapshot) => assert_eq!(snapshot.status, CrawlStatus::Paused),
        other => panic!("expected progress, got {:?}", other),
    }

    engine.resume().unwrap();
    wait_for(&mut events, |e| matches!(e, CrawlEvent::Resumed(_))).await;

    let rest = collect_events(&mut events).await;
    let result = completed(&rest);
    assert_eq!(result.pages.len(), 4);
    assert_eq!(engine.status().unwrap().status, CrawlStatus::Completed);
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let server = MockServer::start().await;
    mount_slow_page(&server, "/", &[], Duration::from_millis(500)).await;

    let (mut engine, mut events) = CrawlEngine::new();
    engine.start(create_test_config(&server)).unwrap();
    assert!(engine.is_running());

    let second = engine.start(create_test_config(&server));
    assert!(matches!(second, Err(ScoutError::AlreadyRunning)));

    // The first session is unaffected
    let events = collect_events(&mut events).await;
    assert_eq!(completed(&events).pages.len(), 1);

    // A finished engine accepts a new start
    assert!(!engine.is_running());
    engine.start(create_test_config(&server)).unwrap();
    engine.cancel().unwrap();
}

#[tokio::test]
async fn test_connection_failure_is_recorded() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &[]).await;

    let mut config = create_test_config(&server);
    config.manual_pages = vec!["http://127.0.0.1:1/unreachable".to_string()];

    let result = crawl(config).await.unwrap();

    let failed = result
        .pages
        .values()
        .find(|p| p.url == "http://127.0.0.1:1/unreachable")
        .unwrap();
    assert_eq!(failed.status, 0);
    assert!(failed.is_error());
    assert_eq!(result.stats.error_count, 1);
}

#[tokio::test]
async fn test_completed_session_persists() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/about"]).await;
    mount_page(&server, "/about", &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sessions.db");

    let result = crawl(create_test_config(&server)).await.unwrap();
    let id = session_id(&result).unwrap();

    {
        let mut store = SqliteSessionStore::new(&db_path).unwrap();
        store.save(&id, &result).unwrap();
    }

    let store = SqliteSessionStore::new(&db_path).unwrap();
    let loaded = store.load(&id).unwrap().unwrap();
    assert_eq!(loaded, result);

    let sessions = store.list().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, id);
    assert_eq!(sessions[0].crawled_pages, 2);
}
