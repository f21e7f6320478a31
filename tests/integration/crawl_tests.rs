//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawl
//! sessions and single-page reindexing end-to-end against on-disk storage.

use lemma_search::config::{
    Config, ConnectionConfig, CrawlerConfig, SearchConfig, SiteEntry, StorageConfig,
};
use lemma_search::crawler::Coordinator;
use lemma_search::morph::SnowballAnalyzer;
use lemma_search::storage::{self, into_shared, SqliteStorage, Storage};
use lemma_search::{CancelToken, LemmaSearchError, SiteStatus};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn site(url: &str, name: &str) -> SiteEntry {
    SiteEntry {
        url: url.to_string(),
        name: name.to_string(),
    }
}

/// Creates a test configuration for the given sites
fn create_test_config(sites: Vec<SiteEntry>, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            politeness_delay_ms: 0,
            max_concurrent_fetches: 4,
            request_timeout_ms: 2_000,
            ..CrawlerConfig::default()
        },
        connection: ConnectionConfig {
            user_agent: "TestBot/1.0".to_string(),
            referrer: "http://www.google.com".to_string(),
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
        },
        search: SearchConfig::default(),
        sites,
    }
}

fn db_path(dir: &TempDir) -> String {
    dir.path().join("index.db").to_string_lossy().to_string()
}

fn build_coordinator(config: Config) -> Coordinator {
    let storage =
        SqliteStorage::new(Path::new(&config.storage.database_path)).expect("Failed to open DB");
    Coordinator::new(config, into_shared(storage), Arc::new(SnowballAnalyzer::new()))
        .expect("Failed to create coordinator")
}

fn create_coordinator(site_url: &str, dir: &TempDir) -> Coordinator {
    build_coordinator(create_test_config(
        vec![site(site_url, "Test Site")],
        &db_path(dir),
    ))
}

/// Returns a URL on a port nothing listens on
fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);
    url
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

/// Mounts a small site: / links to /a and /b, /a links back to / and to /b,
/// /b links to a missing page. Every path must be fetched exactly once.
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Home</title></head><body>
            <p>Dog</p>
            <a href="/a">first</a> <a href="/b">second</a>
            <a href="/a#top">anchor</a> <a href="/b?x=1">query</a>
            <a href="/logo.png">logo</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(
            r#"<html><head><title>Page A</title></head><body>
            <p>dog cats</p>
            <a href="/">home</a> <a href="/b">second</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html(
            r#"<html><head><title>Page B</title></head><body>
            <p>cat</p>
            <a href="/missing">gone</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&mock_server.uri(), &dir);

    let reports = coordinator
        .crawl_all(CancelToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, SiteStatus::Indexed);
    assert_eq!(reports[0].error, None);
    assert_eq!(reports[0].url, format!("{}/", mock_server.uri()));

    let storage = storage::lock(coordinator.storage()).unwrap();
    let site = storage
        .get_site_by_url(&reports[0].url)
        .unwrap()
        .expect("Site row missing");
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 4);

    let missing = storage
        .get_page_by_path(site.id, "/missing")
        .unwrap()
        .expect("Missing page not stored");
    assert_eq!(missing.code, 404);
    assert_eq!(missing.content, "");

    let dog = storage.get_lemma(site.id, "dog").unwrap().unwrap();
    assert_eq!(dog.frequency, 2);
    assert_eq!(dog.forms, vec!["dog".to_string()]);

    let cat = storage.get_lemma(site.id, "cat").unwrap().unwrap();
    assert_eq!(cat.frequency, 2);
    assert_eq!(cat.forms, vec!["cat".to_string(), "cats".to_string()]);
}

#[tokio::test]
async fn test_root_connection_error() {
    let site_url = unreachable_url();

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&site_url, &dir);

    let reports = coordinator.crawl_all(CancelToken::new()).await.unwrap();
    assert_eq!(reports[0].status, SiteStatus::Failed);
    let error = reports[0].error.clone().expect("No error recorded");
    assert!(!error.is_empty());

    let storage = storage::lock(coordinator.storage()).unwrap();
    let site = storage.get_site_by_url(&site_url).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert_eq!(site.last_error.as_deref(), Some(error.as_str()));

    assert_eq!(storage.count_pages().unwrap(), 1);
    let root = storage.get_page_by_path(site.id, "/").unwrap().unwrap();
    assert_eq!(root.code, 500);
    assert_eq!(root.content, "");
    assert_eq!(storage.count_lemmas().unwrap(), 0);
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><p>dog dog</p><a href="/a">a</a></body></html>"#,
        ))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<html><body><p>dog cat</p></body></html>"#))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&mock_server.uri(), &dir);
    let entry = coordinator.config().sites[0].clone();

    let snapshot = |coordinator: &Coordinator| {
        let storage = storage::lock(coordinator.storage()).unwrap();
        let site = storage
            .get_site_by_url(&format!("{}/", mock_server.uri()))
            .unwrap()
            .unwrap();
        let mut paths: Vec<String> = ["/", "/a"]
            .iter()
            .filter_map(|p| storage.get_page_by_path(site.id, p).unwrap())
            .map(|page| page.path)
            .collect();
        paths.sort();
        let lemmas: Vec<(String, u32)> = storage
            .get_lemmas_by_site(site.id)
            .unwrap()
            .into_iter()
            .map(|l| (l.lemma, l.frequency))
            .collect();
        (storage.count_pages().unwrap(), paths, lemmas)
    };

    let first = coordinator
        .crawl_site(&entry, CancelToken::new())
        .await
        .unwrap();
    assert_eq!(first.status, SiteStatus::Indexed);
    let after_first = snapshot(&coordinator);

    let second = coordinator
        .crawl_site(&entry, CancelToken::new())
        .await
        .unwrap();
    assert_eq!(second.status, SiteStatus::Indexed);
    let after_second = snapshot(&coordinator);

    assert_eq!(after_first, after_second);
    assert_eq!(after_second.0, 2);
    assert!(after_second.2.contains(&("dog".to_string(), 2)));
    assert!(after_second.2.contains(&("cat".to_string(), 1)));
}

#[tokio::test]
async fn test_index_page_replaces_previous_copy() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&mock_server.uri(), &dir);
    coordinator.crawl_all(CancelToken::new()).await.unwrap();

    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(
            r#"<html><body><p>cat cat</p></body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let indexed = coordinator
        .index_page(&format!("{}/a", mock_server.uri()))
        .await
        .expect("Reindex failed");
    assert_eq!(indexed.path, "/a");
    assert_eq!(indexed.status_code, 200);
    assert_eq!(indexed.lemmas, 1);

    let storage = storage::lock(coordinator.storage()).unwrap();
    let site = storage
        .get_site_by_url(&format!("{}/", mock_server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 4);

    let dog = storage.get_lemma(site.id, "dog").unwrap().unwrap();
    assert_eq!(dog.frequency, 1);
    let cat = storage.get_lemma(site.id, "cat").unwrap().unwrap();
    assert_eq!(cat.frequency, 2);

    let page = storage.get_page_by_path(site.id, "/a").unwrap().unwrap();
    assert_eq!(storage.get_rank(page.id, cat.id).unwrap(), Some(2));
    assert_eq!(storage.get_rank(page.id, dog.id).unwrap(), None);
}

#[tokio::test]
async fn test_index_page_creates_site() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<html><body><p>dog</p></body></html>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&mock_server.uri(), &dir);

    let indexed = coordinator
        .index_page(&format!("{}/a", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(indexed.site, format!("{}/", mock_server.uri()));

    let storage = storage::lock(coordinator.storage()).unwrap();
    let sites = storage.list_sites().unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].name, "Test Site");
    assert_eq!(sites[0].status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages().unwrap(), 1);
}

#[tokio::test]
async fn test_index_page_outside_configured_sites() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&format!("{}/docs", mock_server.uri()), &dir);

    let result = coordinator
        .index_page(&format!("{}/blog/post", mock_server.uri()))
        .await;
    assert!(matches!(
        result,
        Err(LemmaSearchError::PageOutsideSites { .. })
    ));
}

#[tokio::test]
async fn test_sites_crawl_independently() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let dead_url = unreachable_url();

    let dir = TempDir::new().unwrap();
    let coordinator = build_coordinator(create_test_config(
        vec![site(&dead_url, "Dead"), site(&mock_server.uri(), "Healthy")],
        &db_path(&dir),
    ));

    let reports = coordinator.crawl_all(CancelToken::new()).await.unwrap();
    assert_eq!(reports.len(), 2);

    assert_eq!(reports[0].name, "Dead");
    assert_eq!(reports[0].status, SiteStatus::Failed);
    assert!(!reports[0].error.clone().unwrap_or_default().is_empty());

    assert_eq!(reports[1].name, "Healthy");
    assert_eq!(reports[1].status, SiteStatus::Indexed);
    assert_eq!(reports[1].error, None);

    let storage = storage::lock(coordinator.storage()).unwrap();
    let dead = storage.get_site_by_url(&dead_url).unwrap().unwrap();
    assert_eq!(dead.status, SiteStatus::Failed);
    assert_eq!(dead.last_error, reports[0].error);
    assert_eq!(storage.count_pages_by_site(dead.id).unwrap(), 1);
    assert_eq!(storage.count_lemmas_by_site(dead.id).unwrap(), 0);

    let healthy = storage.get_site_by_url(&reports[1].url).unwrap().unwrap();
    assert_eq!(healthy.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(healthy.id).unwrap(), 4);
    assert_eq!(
        storage.get_lemma(healthy.id, "dog").unwrap().unwrap().frequency,
        2
    );
    assert_eq!(
        storage.get_lemma(healthy.id, "cat").unwrap().unwrap().frequency,
        2
    );
}

#[tokio::test]
async fn test_index_page_during_crawl_keeps_crawl_healthy() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><p>dog</p><a href="/a">a</a></body></html>"#))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<html><body><p>dog cats</p></body></html>"#))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(
        vec![site(&mock_server.uri(), "Test Site")],
        &db_path(&dir),
    );
    config.crawler.politeness_delay_ms = 300;
    let coordinator = build_coordinator(config);

    let crawler = coordinator.clone();
    let crawl = tokio::spawn(async move { crawler.crawl_all(CancelToken::new()).await });

    // The crawl is still waiting before its first fetch
    tokio::time::sleep(Duration::from_millis(50)).await;
    let indexed = coordinator
        .index_page(&format!("{}/a", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(indexed.status_code, 200);

    let reports = crawl.await.unwrap().unwrap();
    assert_eq!(reports[0].status, SiteStatus::Indexed);
    assert_eq!(reports[0].error, None);

    let storage = storage::lock(coordinator.storage()).unwrap();
    let site = storage.get_site_by_url(&reports[0].url).unwrap().unwrap();
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 2);

    let dog = storage.get_lemma(site.id, "dog").unwrap().unwrap();
    assert_eq!(dog.frequency, 2);
    let cat = storage.get_lemma(site.id, "cat").unwrap().unwrap();
    assert_eq!(cat.frequency, 1);
}
