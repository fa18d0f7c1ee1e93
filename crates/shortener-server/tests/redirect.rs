//! Handler-level integration tests for `GET /{code}` (§8 scenarios 2-5,
//! properties C1-C3, E1), exercised through `tower::ServiceExt::oneshot`
//! against in-memory fakes rather than a live Postgres/Redis/AMQP stack.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use shortener_core::{ShortflakeGenerator, SystemClock};
use shortener_server::state::AppState;
use shortener_store::{Cache, ClickEvent, Error, EventPublisher, MappingRecord, MappingStore};
use tower::ServiceExt;

#[derive(Clone, Default)]
struct FakeCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
    reads: Arc<AtomicUsize>,
}

impl Cache for FakeCache {
    async fn get(&self, code: &str) -> Result<Option<String>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().unwrap().get(code).cloned())
    }

    async fn set(&self, code: &str, original_url: &str, _ttl_secs: u64) -> Result<(), Error> {
        self.entries
            .lock()
            .unwrap()
            .insert(code.to_string(), original_url.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeMappingStore {
    records: Arc<Mutex<HashMap<String, MappingRecord>>>,
    reads: Arc<AtomicUsize>,
}

impl FakeMappingStore {
    fn seed(code: &str, original_url: &str) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().insert(
            code.to_string(),
            MappingRecord {
                id: 1,
                original_url: original_url.to_string(),
                code: code.to_string(),
                created_at: Utc::now(),
            },
        );
        store
    }
}

impl MappingStore for FakeMappingStore {
    async fn insert(&self, id: i64, original_url: &str, code: &str) -> Result<MappingRecord, Error> {
        let record = MappingRecord {
            id,
            original_url: original_url.to_string(),
            code: code.to_string(),
            created_at: Utc::now(),
        };
        self.records
            .lock()
            .unwrap()
            .insert(code.to_string(), record.clone());
        Ok(record)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<MappingRecord>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().get(code).cloned())
    }
}

/// Always accepts the event and never returns - panicking would prove the
/// point better, but the contract (E1) is that the caller never observes
/// whatever this does, success or failure.
struct FailingPublisher;

impl EventPublisher for FailingPublisher {
    async fn publish(&self, _event: &ClickEvent) {
        panic!("publisher exploded");
    }
}

fn test_state<M: MappingStore + Clone, C: Cache + Clone>(
    mappings: M,
    cache: C,
) -> AppState<M, C, FailingPublisher> {
    AppState {
        mappings,
        cache,
        generator: Arc::new(ShortflakeGenerator::new(1, SystemClock).unwrap()),
        publisher: Arc::new(FailingPublisher),
        base_url: "http://localhost:8000".to_string(),
    }
}

fn get_request(code: &str) -> Request<Body> {
    let mut request = Request::builder()
        .uri(format!("/{code}"))
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))));
    request
}

/// C1: a cache hit never touches the mapping store.
#[tokio::test]
async fn cache_hit_redirects_without_a_database_read() {
    let cache = FakeCache::default();
    cache
        .entries
        .lock()
        .unwrap()
        .insert("abc123".to_string(), "https://example.com/page".to_string());
    let mappings = FakeMappingStore::default();
    let mapping_reads = mappings.reads.clone();

    let app = shortener_server::app(test_state(mappings, cache));
    let response = app.oneshot(get_request("abc123")).await.unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(axum::http::header::LOCATION).unwrap(),
        "https://example.com/page"
    );
    assert_eq!(mapping_reads.load(Ordering::SeqCst), 0);
}

/// C2: a cache miss falls back to the mapping store and backfills the cache.
#[tokio::test]
async fn cache_miss_reads_through_and_backfills() {
    let cache = FakeCache::default();
    let cache_entries = cache.entries.clone();
    let mappings = FakeMappingStore::seed("xyz789", "https://example.com/other");

    let app = shortener_server::app(test_state(mappings, cache));
    let response = app.oneshot(get_request("xyz789")).await.unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(axum::http::header::LOCATION).unwrap(),
        "https://example.com/other"
    );
    assert_eq!(
        cache_entries.lock().unwrap().get("xyz789").map(String::as_str),
        Some("https://example.com/other")
    );
}

/// C3: an unknown code maps to a 404 with the fixed detail message.
#[tokio::test]
async fn unknown_code_returns_404() {
    let app = shortener_server::app(test_state(FakeMappingStore::default(), FakeCache::default()));
    let response = app.oneshot(get_request("missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["detail"], "Short URL not found");
}

/// E1: a publisher that panics never surfaces through the redirect response -
/// the fan-out happens on a detached task.
#[tokio::test]
async fn publisher_failure_does_not_affect_the_redirect() {
    let mappings = FakeMappingStore::seed("ok1234", "https://example.com/still-works");
    let app = shortener_server::app(test_state(mappings, FakeCache::default()));
    let response = app.oneshot(get_request("ok1234")).await.unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(axum::http::header::LOCATION).unwrap(),
        "https://example.com/still-works"
    );
}
