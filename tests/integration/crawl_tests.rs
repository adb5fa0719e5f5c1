//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock listing and article pages and
//! test the full harvest cycle end-to-end, including resuming after a
//! failed run.

use article_harvester::config::Config;
use article_harvester::crawler::{run_harvest, HarvestOptions, HttpFetcher, PageWalker};
use article_harvester::state::{
    Checkpoint, CheckpointStore, FileCheckpointStore, ResumePoint, TerminationReason,
};
use article_harvester::storage::{FilesystemStore, ObjectStore, StorageError, StorageResult};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Three whitespace tokens per article
const ARTICLE_BODY: &str = "Mashoko matatu chete.";

/// Creates a test configuration pointing at the mock server, with no delays
fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.root_url = format!("{}/news", server.uri());
    config.crawler.backoff_multiplier_ms = 0;
    config.crawler.backoff_min_ms = 0;
    config.crawler.backoff_max_ms = 0;
    config.crawler.page_delay_min_ms = 0;
    config.crawler.page_delay_max_ms = 0;
    config.crawler.articles_per_batch = 4;
    config.output.output_path = dir.join("out").to_string_lossy().into_owned();
    config.output.checkpoint_path = dir.join("checkpoint.json").to_string_lossy().into_owned();
    config
}

fn no_shutdown() -> watch::Receiver<bool> {
    let (_, rx) = watch::channel(false);
    rx
}

fn listing_html(slugs: &[String], has_more: bool) -> String {
    let mut html = String::from("<html><body>");
    for slug in slugs {
        html.push_str(&format!(
            r#"<div class="media-block"><a href="/a/{}.html">{}</a></div>"#,
            slug, slug
        ));
    }
    if has_more {
        html.push_str(
            r#"<p class="btn--load-more"><a class="link-showMore" href="/news?page=next">Zvimwe</a></p>"#,
        );
    }
    html.push_str("</body></html>");
    html
}

fn article_html(slug: &str, date: Option<&str>) -> String {
    let date = date
        .map(|d| {
            format!(
                r#"<div class="published"><span class="date"><time datetime="{}">{}</time></span></div>"#,
                d, d
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><body><h1 class="title">Title {}</h1>{}<div class="wsw"><p>{}</p></div></body></html>"#,
        slug, date, ARTICLE_BODY
    )
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

/// Mounts listing page `page` with `articles` dated articles, expecting `hits` fetches
async fn mount_page(server: &MockServer, page: u64, articles: usize, has_more: bool, hits: u64) {
    let slugs: Vec<String> = (0..articles).map(|n| format!("p{}-{}", page, n)).collect();

    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("page", page.to_string()))
        .respond_with(html_response(listing_html(&slugs, has_more)))
        .expect(hits)
        .mount(server)
        .await;

    for slug in &slugs {
        Mock::given(method("GET"))
            .and(path(format!("/a/{}.html", slug)))
            .respond_with(html_response(article_html(slug, Some("2024-05-01T09:00:00+02:00"))))
            .mount(server)
            .await;
    }
}

/// Every stored record, in key order, as JSON values
fn stored_records(config: &Config) -> Vec<serde_json::Value> {
    let store = FilesystemStore::new(&config.output.output_path);
    let keys = store.list(&config.storage.bucket, "DATA/").unwrap();

    keys.iter()
        .flat_map(|key| {
            let body = store.get(&config.storage.bucket, key).unwrap().unwrap();
            String::from_utf8(body)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect::<Vec<serde_json::Value>>()
        })
        .collect()
}

fn stored_urls(config: &Config) -> Vec<String> {
    let mut urls: Vec<String> = stored_records(config)
        .iter()
        .map(|r| r["article_url"].as_str().unwrap().to_string())
        .collect();
    urls.sort();
    urls
}

fn saved_checkpoint(config: &Config) -> Option<Checkpoint> {
    FileCheckpointStore::new(&config.output.checkpoint_path)
        .load()
        .unwrap()
}

/// Delegates to a filesystem store but fails every put after the first `healthy` ones
struct FailingStore {
    inner: FilesystemStore,
    healthy: usize,
    puts: AtomicUsize,
}

impl ObjectStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn put(&self, container: &str, key: &str, body: &[u8]) -> StorageResult<()> {
        if self.puts.fetch_add(1, Ordering::SeqCst) >= self.healthy {
            return Err(StorageError::Unavailable("simulated outage".to_string()));
        }
        self.inner.put(container, key, body)
    }

    fn get(&self, container: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(container, key)
    }

    fn list(&self, container: &str, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(container, prefix)
    }
}

#[tokio::test]
async fn test_full_harvest_completes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(&server, 0, 2, true, 1).await;
    mount_page(&server, 1, 2, true, 1).await;
    mount_page(&server, 2, 2, false, 1).await;
    mount_page(&server, 3, 2, false, 0).await;

    let reason = run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();

    assert_eq!(reason, TerminationReason::Completed);

    let records = stored_records(&config);
    assert_eq!(records.len(), 6);
    for record in &records {
        assert_eq!(record["article_date"], "2024-05-01T09:00:00+02:00");
        assert_eq!(record["article_content"], ARTICLE_BODY);
        assert!(record["scrape_date"].as_str().unwrap().ends_with('Z'));
        assert!(record.get("page_index").is_none());
    }

    // Cursor stays on the last page; it is not advanced past it
    assert_eq!(saved_checkpoint(&config), Some(Checkpoint::new(2, 18)));
}

#[tokio::test]
async fn test_batch_keys_follow_first_record_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(&server, 0, 3, true, 1).await;
    mount_page(&server, 1, 3, false, 1).await;

    run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();

    let store = FilesystemStore::new(&config.output.output_path);
    assert_eq!(
        store.list("articles", "DATA/").unwrap(),
        vec!["DATA/0000000.json", "DATA/0000001.json"]
    );
}

#[tokio::test]
async fn test_article_missing_date_is_dropped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    let slugs = vec!["good-1".to_string(), "undated".to_string(), "good-2".to_string()];
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("page", "0"))
        .respond_with(html_response(listing_html(&slugs, true)))
        .expect(1)
        .mount(&server)
        .await;
    for slug in &slugs {
        let date = (slug != "undated").then_some("2024-05-01");
        Mock::given(method("GET"))
            .and(path(format!("/a/{}.html", slug)))
            .respond_with(html_response(article_html(slug, date)))
            .mount(&server)
            .await;
    }
    // The walk goes on to the next page after dropping the undated article
    mount_page(&server, 1, 2, false, 1).await;

    let reason = run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();

    assert_eq!(reason, TerminationReason::Completed);
    assert_eq!(
        stored_urls(&config),
        vec![
            format!("{}/a/good-1.html", server.uri()),
            format!("{}/a/good-2.html", server.uri()),
            format!("{}/a/p1-0.html", server.uri()),
            format!("{}/a/p1-1.html", server.uri()),
        ]
    );
    assert_eq!(saved_checkpoint(&config), Some(Checkpoint::new(1, 12)));
}

#[tokio::test]
async fn test_unreachable_article_does_not_stop_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    let slugs = vec!["fine".to_string(), "broken".to_string()];
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("page", "0"))
        .respond_with(html_response(listing_html(&slugs, false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/fine.html"))
        .respond_with(html_response(article_html("fine", Some("2024-05-01"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/broken.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let reason = run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();

    assert_eq!(reason, TerminationReason::Completed);
    assert_eq!(stored_records(&config).len(), 1);
}

#[tokio::test]
async fn test_listing_retried_then_succeeds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, 0, 1, false, 1).await;

    let reason = run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();

    assert_eq!(reason, TerminationReason::Completed);
    assert_eq!(stored_records(&config).len(), 1);
}

#[tokio::test]
async fn test_listing_failure_fails_harvest() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.crawler.articles_per_batch = 10;

    mount_page(&server, 0, 2, true, 1).await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let reason = run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();

    assert!(matches!(reason, TerminationReason::Failed(_)));
    // Page 0 never filled a batch, so nothing was written and nothing checkpointed
    assert!(stored_records(&config).is_empty());
    assert_eq!(saved_checkpoint(&config), None);
}

#[tokio::test]
async fn test_restart_after_storage_failure_loses_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.crawler.articles_per_batch = 2;

    // Page 1 is walked by both runs; page 0 only by the first
    mount_page(&server, 0, 2, true, 1).await;
    mount_page(&server, 1, 2, true, 2).await;
    mount_page(&server, 2, 2, false, 1).await;

    // First run: page 0's batch is stored, page 1's batch write fails
    let store = Arc::new(FailingStore {
        inner: FilesystemStore::new(&config.output.output_path),
        healthy: 1,
        puts: AtomicUsize::new(0),
    });
    let checkpoints = Arc::new(FileCheckpointStore::new(&config.output.checkpoint_path));
    let fetcher = Arc::new(HttpFetcher::from_config(&config.user_agent).unwrap());
    let mut walker = PageWalker::from_config(&config, fetcher, store, checkpoints).unwrap();

    let reason = walker.run(0).await;
    assert!(matches!(reason, TerminationReason::Failed(_)));
    assert_eq!(saved_checkpoint(&config), Some(Checkpoint::new(0, 6)));
    assert_eq!(stored_records(&config).len(), 2);

    // Second run resumes on the page whose records never made it
    let resume = ResumePoint::from_saved(saved_checkpoint(&config));
    assert_eq!(resume.start_cursor, 1);

    let reason = run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();
    assert_eq!(reason, TerminationReason::Completed);

    let base = server.uri();
    let mut expected: Vec<String> = (0..3)
        .flat_map(|page| (0..2).map(move |n| (page, n)))
        .map(|(page, n)| format!("{}/a/p{}-{}.html", base, page, n))
        .collect();
    expected.sort();
    assert_eq!(stored_urls(&config), expected);
    assert_eq!(saved_checkpoint(&config), Some(Checkpoint::new(2, 18)));
}

#[tokio::test]
async fn test_resume_from_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    FileCheckpointStore::new(&config.output.checkpoint_path)
        .save(&Checkpoint::new(4, 50))
        .unwrap();

    mount_page(&server, 0, 1, true, 0).await;
    mount_page(&server, 5, 2, false, 1).await;

    let reason = run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();

    assert_eq!(reason, TerminationReason::Completed);
    assert_eq!(saved_checkpoint(&config), Some(Checkpoint::new(5, 56)));

    let store = FilesystemStore::new(&config.output.output_path);
    assert_eq!(
        store.list("articles", "DATA/").unwrap(),
        vec!["DATA/0000005.json"]
    );
}

#[tokio::test]
async fn test_fresh_ignores_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    FileCheckpointStore::new(&config.output.checkpoint_path)
        .save(&Checkpoint::new(9, 500))
        .unwrap();

    mount_page(&server, 0, 1, false, 1).await;

    let options = HarvestOptions {
        fresh: true,
        start_page: None,
    };
    let reason = run_harvest(&config, options, no_shutdown()).await.unwrap();

    assert_eq!(reason, TerminationReason::Completed);
    assert_eq!(saved_checkpoint(&config), Some(Checkpoint::new(0, 3)));
}

#[tokio::test]
async fn test_start_page_override() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(&server, 0, 1, true, 0).await;
    mount_page(&server, 7, 1, false, 1).await;

    let options = HarvestOptions {
        fresh: false,
        start_page: Some(7),
    };
    let reason = run_harvest(&config, options, no_shutdown()).await.unwrap();

    assert_eq!(reason, TerminationReason::Completed);
    assert_eq!(stored_records(&config).len(), 1);
}

#[tokio::test]
async fn test_page_limit_stops_walk() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.crawler.max_pages = Some(2);

    mount_page(&server, 0, 1, true, 1).await;
    mount_page(&server, 1, 1, true, 1).await;
    mount_page(&server, 2, 1, true, 0).await;

    let reason = run_harvest(&config, HarvestOptions::default(), no_shutdown())
        .await
        .unwrap();

    assert_eq!(reason, TerminationReason::PageLimitReached);
    assert_eq!(stored_records(&config).len(), 2);
    assert_eq!(saved_checkpoint(&config), Some(Checkpoint::new(1, 6)));
}

#[tokio::test]
async fn test_shutdown_stops_after_current_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(&server, 0, 3, true, 1).await;
    mount_page(&server, 1, 1, false, 0).await;

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let reason = run_harvest(&config, HarvestOptions::default(), rx)
        .await
        .unwrap();

    assert_eq!(reason, TerminationReason::Interrupted);
    // The in-flight page is still stored and checkpointed
    assert_eq!(stored_records(&config).len(), 3);
    assert_eq!(saved_checkpoint(&config), Some(Checkpoint::new(0, 9)));
}
