//! End-to-end search tests
//!
//! A mock site is crawled through the service, then queried the way the
//! command line does it.

use lemma_search::config::{
    Config, ConnectionConfig, CrawlerConfig, SearchConfig, SiteEntry, StorageConfig,
};
use lemma_search::morph::SnowballAnalyzer;
use lemma_search::search::SearchQuery;
use lemma_search::service::Service;
use lemma_search::storage::{self, into_shared, SqliteStorage, Storage};
use lemma_search::SiteStatus;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_service(site_url: &str, dir: &TempDir) -> Service {
    let db_path = dir.path().join("index.db");
    let config = Config {
        crawler: CrawlerConfig {
            politeness_delay_ms: 0,
            request_timeout_ms: 2_000,
            ..CrawlerConfig::default()
        },
        connection: ConnectionConfig::default(),
        storage: StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
        },
        search: SearchConfig::default(),
        sites: vec![SiteEntry {
            url: site_url.to_string(),
            name: "Sports".to_string(),
        }],
    };
    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    Service::new(config, into_shared(storage), Arc::new(SnowballAnalyzer::new()))
        .expect("Failed to create service")
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

async fn crawl(service: &Service) {
    assert!(service.start_indexing().result);
    let reports = service.wait_for_indexing().await.expect("Crawl failed");
    assert!(reports.iter().all(|r| r.status == SiteStatus::Indexed));
}

/// Root page without the word, linking to one page that says it three times
/// and one page that says it once
async fn mount_running_site(server: &MockServer) {
    mount_page(
        server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <p>Walk slowly</p>
        <a href="/p1">one</a> <a href="/p2">two</a>
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        server,
        "/p1",
        r#"<html><head><title>Morning</title></head><body>
        <p>We run every day. I run fast. They run far.</p>
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        server,
        "/p2",
        r#"<html><head><title>Evening</title></head><body>
        <p>Sometimes running helps.</p>
        </body></html>"#
            .to_string(),
    )
    .await;
}

#[tokio::test]
async fn test_ranked_search_in_site() {
    let mock_server = MockServer::start().await;
    mount_running_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let service = create_service(&mock_server.uri(), &dir);
    crawl(&service).await;

    let query = SearchQuery::new("run")
        .site(format!("{}/", mock_server.uri()))
        .offset(0)
        .limit(10);
    let response = service.search(&query);
    assert!(response.result, "{:?}", response.error);

    let found = response.data.unwrap();
    assert_eq!(found.count, 2);
    assert_eq!(found.results.len(), 2);

    let first = &found.results[0];
    assert_eq!(first.uri, "/p1");
    assert_eq!(first.title, "Morning");
    assert_eq!(first.site, mock_server.uri());
    assert_eq!(first.site_name, "Sports");
    assert_eq!(first.relevance, 1.0);
    assert!(first.snippet.contains("<b>run</b>"));

    let second = &found.results[1];
    assert_eq!(second.uri, "/p2");
    assert!((second.relevance - 1.0 / 3.0).abs() < 1e-9);
    assert!(second.snippet.contains("<b>running</b>"));
}

#[tokio::test]
async fn test_search_all_sites_with_paging() {
    let mock_server = MockServer::start().await;
    mount_running_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let service = create_service(&mock_server.uri(), &dir);
    crawl(&service).await;

    let response = service.search(&SearchQuery::new("running").offset(1).limit(10));
    let found = response.data.unwrap();
    assert_eq!(found.count, 2);
    assert_eq!(found.results.len(), 1);
    assert_eq!(found.results[0].uri, "/p2");

    let past_end = service
        .search(&SearchQuery::new("run").offset(5))
        .data
        .unwrap();
    assert_eq!(past_end.count, 2);
    assert!(past_end.results.is_empty());
}

#[tokio::test]
async fn test_every_query_word_must_match() {
    let mock_server = MockServer::start().await;
    mount_running_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let service = create_service(&mock_server.uri(), &dir);
    crawl(&service).await;

    let found = service
        .search(&SearchQuery::new("run fast"))
        .data
        .unwrap();
    assert_eq!(found.count, 1);
    assert_eq!(found.results[0].uri, "/p1");
}

#[tokio::test]
async fn test_empty_query_touches_nothing() {
    let mock_server = MockServer::start().await;
    mount_running_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let service = create_service(&mock_server.uri(), &dir);
    crawl(&service).await;

    let pages_before = storage::lock(service.storage()).unwrap().count_pages().unwrap();

    let response = service.search(&SearchQuery::new(""));
    assert!(!response.result);
    assert_eq!(response.error.as_deref(), Some("Empty search query"));
    assert!(response.data.is_none());

    let pages_after = storage::lock(service.storage()).unwrap().count_pages().unwrap();
    assert_eq!(pages_before, pages_after);
}

#[tokio::test]
async fn test_too_common_lemma_is_ignored() {
    let mock_server = MockServer::start().await;

    // 24 of 25 pages mention the word: 96% of the index
    let links: String = (1..=24)
        .map(|i| format!(r#"<a href="/p{}">next</a> "#, i))
        .collect();
    mount_page(
        &mock_server,
        "/",
        format!("<html><body><p>hub</p>{}</body></html>", links),
    )
    .await;
    for i in 1..=24 {
        mount_page(
            &mock_server,
            &format!("/p{}", i),
            "<html><body><p>weather report</p></body></html>".to_string(),
        )
        .await;
    }

    let dir = TempDir::new().unwrap();
    let service = create_service(&mock_server.uri(), &dir);
    crawl(&service).await;

    let stats = service.statistics().data.unwrap();
    assert_eq!(stats.total.pages, 25);

    let response = service.search(&SearchQuery::new("weather"));
    assert!(response.result);
    let found = response.data.unwrap();
    assert_eq!(found.count, 0);
    assert!(found.results.is_empty());
}

#[tokio::test]
async fn test_unknown_site_filter() {
    let mock_server = MockServer::start().await;
    mount_running_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let service = create_service(&mock_server.uri(), &dir);
    crawl(&service).await;

    let found = service
        .search(&SearchQuery::new("run").site("https://elsewhere.example/"))
        .data
        .unwrap();
    assert_eq!(found.count, 0);
}
