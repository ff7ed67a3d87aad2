//! Integration tests for the crawl engine
//!
//! These tests use wiremock to stand in for a registry endpoint and drive
//! the full crawl cycle end-to-end: pagination, document fetch, persistence,
//! change detection, early stop, and bounded retry.

use sayfa::config::{CrawlMode, CrawlerConfig, RetryConfig};
use sayfa::engine::{CrawlEngine, CrawlReport, DocumentFetcher, RetryPolicy};
use sayfa::sites::{DecisionsSource, DecisionsStrategy};
use sayfa::store::{DocumentStore, JsonDirStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a crawler configuration suitable for tests
fn create_test_crawler(
    mode: CrawlMode,
    page_size: u32,
    early_stop_threshold: Option<u32>,
) -> CrawlerConfig {
    CrawlerConfig {
        mode,
        page_size,
        start_page: 1,
        concurrency: 10,
        early_stop_threshold,
    }
}

/// Creates a retry configuration with short waits so tests stay fast
fn create_test_retry() -> RetryConfig {
    RetryConfig {
        initial_error_wait_ms: 10,
        page_retry_wait_ms: 10,
        jitter_cap_ms: 5,
        max_attempts: 3,
    }
}

/// Creates an engine crawling the decision-search site on a mock server
fn create_test_engine(
    server_uri: &str,
    store: Arc<JsonDirStore>,
    crawler: CrawlerConfig,
) -> CrawlEngine {
    let retry = create_test_retry();
    let client = reqwest::Client::new();
    let base_url = Url::parse(&format!("{}/", server_uri)).expect("invalid mock server URI");

    let source = Arc::new(DecisionsSource::new(
        client.clone(),
        base_url.clone(),
        crawler.page_size,
    ));
    let fetcher = DocumentFetcher::new(client, base_url, RetryPolicy::bounded(&retry));

    CrawlEngine::new(
        "test",
        source,
        Arc::new(DecisionsStrategy),
        store,
        fetcher,
        crawler,
        &retry,
    )
}

/// One search entry whose name falls back to the backend id
fn entry(id: &str) -> Value {
    json!({ "id": id, "daire": "1. Daire" })
}

/// Mounts the listing response for one page number
///
/// The search endpoint answers every page of a target; the mocks are told
/// apart by the `pageNumber` field of the request body. Page 1 also serves
/// the count query.
async fn mount_listing(server: &MockServer, page: u32, total: u64, entries: Value) {
    Mock::given(method("POST"))
        .and(path("/aramalist"))
        .and(body_partial_json(json!({"data": {"pageNumber": page}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"recordsFiltered": total, "data": entries}
        })))
        .mount(server)
        .await;
}

/// Mounts the document content for one backend id
async fn mount_document(server: &MockServer, id: &str, content: &[u8], expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/getDokuman"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn create_test_store() -> (TempDir, Arc<JsonDirStore>) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = JsonDirStore::new(dir.path()).expect("failed to open store");
    (dir, Arc::new(store))
}

async fn run_crawl(engine: &CrawlEngine) -> CrawlReport {
    engine.run().await.expect("crawl failed")
}

#[tokio::test]
async fn test_sequential_crawl_persists_every_document() {
    let mock_server = MockServer::start().await;
    let binary = vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xFF];

    // 3 records at page size 2: page 1 yields a and b, page 2 yields c.
    // Page 1 is requested twice per run (count query + page fetch).
    mount_listing(&mock_server, 1, 3, json!([entry("a"), entry("b")])).await;
    mount_listing(&mock_server, 2, 3, json!([entry("c")])).await;
    mount_document(&mock_server, "a", b"content a", 1).await;
    mount_document(&mock_server, "b", b"content b", 1).await;
    mount_document(&mock_server, "c", &binary, 1).await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 2, None),
    );

    let report = run_crawl(&engine).await;

    assert_eq!(report.pages, 2);
    assert_eq!(report.new_documents, 3);
    assert_eq!(report.total_writes(), 3);
    assert!(!report.early_stopped);

    assert!(store.exists("a"));
    assert!(store.exists("b"));
    assert!(store.exists("c"));

    let loaded = store.load("a").expect("load failed");
    assert_eq!(loaded.content_bytes().expect("decode failed"), b"content a");
    assert_eq!(loaded.reference, "getDokuman?id=a");
    assert_eq!(loaded.fields.get("daire"), Some(&json!("1. Daire")));

    // Binary content survives the round trip byte-for-byte
    let loaded = store.load("c").expect("load failed");
    assert_eq!(loaded.content_bytes().expect("decode failed"), binary);
}

#[tokio::test]
async fn test_rerun_with_unchanged_content_suppresses_writes() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 3, json!([entry("a"), entry("b")])).await;
    mount_listing(&mock_server, 2, 3, json!([entry("c")])).await;
    // Change detection compares content, so the second run still fetches
    // every document: two calls each across the two runs.
    mount_document(&mock_server, "a", b"content a", 2).await;
    mount_document(&mock_server, "b", b"content b", 2).await;
    mount_document(&mock_server, "c", b"content c", 2).await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 2, None),
    );

    let first_report = run_crawl(&engine).await;
    assert_eq!(first_report.new_documents, 3);
    let first = store.load("a").expect("load failed");

    let second_report = run_crawl(&engine).await;
    assert_eq!(second_report.new_documents, 0);
    assert_eq!(second_report.updated, 0);
    assert_eq!(second_report.unchanged, 3);
    assert_eq!(second_report.total_writes(), 0);

    // No write happened, so the stored timestamps are untouched
    let second = store.load("a").expect("load failed");
    assert_eq!(second.updated_at, first.updated_at);
    assert_eq!(second.created_at, first.created_at);
}

#[tokio::test]
async fn test_rerun_overwrites_changed_document() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 3, json!([entry("a"), entry("b")])).await;
    mount_listing(&mock_server, 2, 3, json!([entry("c")])).await;
    mount_document(&mock_server, "a", b"content a", 2).await;
    mount_document(&mock_server, "c", b"content c", 2).await;

    // Document b changes upstream between the two runs
    Mock::given(method("GET"))
        .and(path("/getDokuman"))
        .and(query_param("id", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"version 1".to_vec()))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getDokuman"))
        .and(query_param("id", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"version 2".to_vec()))
        .mount(&mock_server)
        .await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 2, None),
    );

    run_crawl(&engine).await;
    let first = store.load("b").expect("load failed");
    let first_neighbour = store.load("a").expect("load failed");
    assert_eq!(first.content_bytes().expect("decode failed"), b"version 1");

    let second_report = run_crawl(&engine).await;
    assert_eq!(second_report.updated, 1);
    assert_eq!(second_report.unchanged, 2);
    assert_eq!(second_report.total_writes(), 1);

    let second = store.load("b").expect("load failed");
    assert_eq!(second.content_bytes().expect("decode failed"), b"version 2");
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);

    // The untouched neighbours kept their timestamps
    let second_neighbour = store.load("a").expect("load failed");
    assert_eq!(second_neighbour.updated_at, first_neighbour.updated_at);
}

#[tokio::test]
async fn test_early_stop_halts_after_consecutive_unchanged() {
    let mock_server = MockServer::start().await;

    let entries = json!([entry("d1"), entry("d2"), entry("d3"), entry("d4"), entry("d5")]);
    mount_listing(&mock_server, 1, 5, entries).await;

    // Second run stops after three consecutive unchanged documents, so d4
    // and d5 are only ever fetched by the first run.
    mount_document(&mock_server, "d1", b"content 1", 2).await;
    mount_document(&mock_server, "d2", b"content 2", 2).await;
    mount_document(&mock_server, "d3", b"content 3", 2).await;
    mount_document(&mock_server, "d4", b"content 4", 1).await;
    mount_document(&mock_server, "d5", b"content 5", 1).await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 5, Some(3)),
    );

    // New documents reset the counter, so a first crawl never stops early
    let first_report = run_crawl(&engine).await;
    assert_eq!(first_report.new_documents, 5);
    assert!(!first_report.early_stopped);

    let second_report = run_crawl(&engine).await;
    assert!(second_report.early_stopped);
    assert_eq!(second_report.unchanged, 3);
    assert_eq!(second_report.new_documents, 0);
}

#[tokio::test]
async fn test_exhausted_fetch_writes_marker_and_continues() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 2, json!([entry("broken"), entry("ok")])).await;
    mount_document(&mock_server, "ok", b"content ok", 2).await;

    // The broken document fails every attempt; the ceiling of 3 means
    // exactly 3 requests, after which the run must keep going.
    Mock::given(method("GET"))
        .and(path("/getDokuman"))
        .and(query_param("id", "broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 5, None),
    );

    let report = run_crawl(&engine).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.new_documents, 1);
    assert!(!store.exists("broken"));
    assert!(store.failure_recorded("getDokuman?id=broken"));
    assert!(store.exists("ok"));

    // The marker gates re-attempts: the next run skips the reference
    // without fetching it (the mock's expected call count stays at 3).
    let second_report = run_crawl(&engine).await;
    assert_eq!(second_report.skipped, 1);
    assert_eq!(second_report.failed, 0);
    assert_eq!(second_report.unchanged, 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried_within_the_ceiling() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 1, json!([entry("flaky")])).await;

    // Two failures, then success: exactly 3 attempts, no marker
    Mock::given(method("GET"))
        .and(path("/getDokuman"))
        .and(query_param("id", "flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getDokuman"))
        .and(query_param("id", "flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"eventual content".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 5, None),
    );

    let report = run_crawl(&engine).await;
    assert_eq!(report.new_documents, 1);
    assert_eq!(report.failed, 0);
    assert!(!store.failure_recorded("getDokuman?id=flaky"));

    let loaded = store.load("flaky").expect("load failed");
    assert_eq!(
        loaded.content_bytes().expect("decode failed"),
        b"eventual content"
    );
}

#[tokio::test]
async fn test_malformed_responses_are_retried() {
    let mock_server = MockServer::start().await;

    // Mocks are matched in mount order as each one is used up. The count
    // query hits a gateway error page first and is retried; the page fetch
    // then gets a payload with the wrong shape and is refetched.
    Mock::given(method("POST"))
        .and(path("/aramalist"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway timeout</html>"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/aramalist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"recordsFiltered": 1, "data": [entry("a")]}
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/aramalist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server, 1, 1, json!([entry("a")])).await;
    mount_document(&mock_server, "a", b"content a", 1).await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 5, None),
    );

    let report = run_crawl(&engine).await;
    assert_eq!(report.pages, 1);
    assert_eq!(report.new_documents, 1);
    assert!(store.exists("a"));
}

#[tokio::test]
async fn test_records_without_reference_are_skipped() {
    let mock_server = MockServer::start().await;

    // The middle entry has no id, so no reference can be derived from it
    mount_listing(
        &mock_server,
        1,
        3,
        json!([entry("a"), {"daire": "2. Daire"}, entry("b")]),
    )
    .await;
    mount_document(&mock_server, "a", b"content a", 1).await;
    mount_document(&mock_server, "b", b"content b", 1).await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 5, None),
    );

    let report = run_crawl(&engine).await;
    assert_eq!(report.new_documents, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn test_batch_crawl_persists_every_document() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 3, json!([entry("a"), entry("b")])).await;
    mount_listing(&mock_server, 2, 3, json!([entry("c")])).await;
    mount_document(&mock_server, "a", b"content a", 2).await;
    mount_document(&mock_server, "b", b"content b", 2).await;
    mount_document(&mock_server, "c", b"content c", 2).await;

    let (_dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Batch, 2, None),
    );

    let report = run_crawl(&engine).await;
    assert_eq!(report.pages, 2);
    assert_eq!(report.new_documents, 3);
    assert!(store.exists("a"));
    assert!(store.exists("b"));
    assert!(store.exists("c"));
    assert_eq!(
        store
            .load("b")
            .expect("load failed")
            .content_bytes()
            .expect("decode failed"),
        b"content b"
    );

    // A batch re-run applies the same skip/update decision per document
    let second_report = run_crawl(&engine).await;
    assert_eq!(second_report.new_documents, 0);
    assert_eq!(second_report.unchanged, 3);
    assert_eq!(second_report.total_writes(), 0);
}

#[tokio::test]
async fn test_corrupt_persisted_record_is_recovered() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 1, json!([entry("a")])).await;
    mount_document(&mock_server, "a", b"content a", 2).await;

    let (dir, store) = create_test_store();
    let engine = create_test_engine(
        &mock_server.uri(),
        Arc::clone(&store),
        create_test_crawler(CrawlMode::Sequential, 5, None),
    );

    run_crawl(&engine).await;

    // Corrupt the stored record on disk; the next run must treat the
    // document as changed and overwrite it instead of failing.
    std::fs::write(dir.path().join("a.json"), "not json {{{").expect("write failed");

    let report = run_crawl(&engine).await;
    assert_eq!(report.updated, 1);
    assert_eq!(
        store
            .load("a")
            .expect("load failed")
            .content_bytes()
            .expect("decode failed"),
        b"content a"
    );
}
