#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use catalog_sync::error::{AppError, Result};
use catalog_sync::models::{CanonicalProduct, Config, JobLease, SyncProgress, SyncTarget};
use catalog_sync::storage::{CatalogStore, DocumentWrite, MemoryStorage, paths};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const API_PATH: &str = "/rest/v2/korea";

pub fn search_path() -> String {
    format!("{API_PATH}/products/search")
}

pub fn detail_path(code: &str) -> String {
    format!("{API_PATH}/products/{code}")
}

/// Config pointed at `server` with delays shrunk to keep tests fast.
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.source.base_url = server.uri();
    config.source.api_path = API_PATH.to_string();
    config.source.page_delay_ms = 0;
    config.source.window_delay_ms = 0;
    config.source.retry_delays_ms = vec![1, 1, 1];
    config.sync.progress_interval_ms = 0;
    config
}

pub fn search_body(codes: &[&str], total_pages: usize) -> Value {
    json!({
        "products": codes.iter().map(|c| json!({ "code": c })).collect::<Vec<_>>(),
        "pagination": { "totalPages": total_pages }
    })
}

/// One page of search results for `target`.
pub async fn mount_search(
    server: &MockServer,
    target: &SyncTarget,
    page: usize,
    total_pages: usize,
    codes: &[&str],
) {
    Mock::given(method("GET"))
        .and(path(search_path()))
        .and(query_param("query", target.search_query()))
        .and(query_param("currentPage", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(codes, total_pages)))
        .mount(server)
        .await;
}

/// Every search not mocked more specifically returns no products.
pub async fn mount_empty_searches(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&[], 1)))
        .with_priority(10)
        .mount(server)
        .await;
}

pub fn detail_body(code: &str, price: Option<f64>, base_price: Option<f64>) -> Value {
    let mut body = json!({
        "code": code,
        "name": format!("Product {code}"),
        "manufacturer": "Acme",
        "images": [
            { "url": format!("/medias/{code}.jpg"), "format": "product" }
        ]
    });
    if let Some(price) = price {
        body["price"] = json!({ "value": price });
    }
    if let Some(base) = base_price {
        body["basePrice"] = json!({ "value": base });
    }
    body
}

pub async fn mount_detail(server: &MockServer, code: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(detail_path(code)))
        .and(query_param("fields", "FULL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answers every detail request after `delay`, noting when each arrived.
#[derive(Clone)]
pub struct SlowDetails {
    pub delay: Duration,
    pub arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl SlowDetails {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            arrivals: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path_regex(format!("^{API_PATH}/products/[^/]+$")))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    /// Most requests that arrived within any `span` of each other.
    pub fn peak(&self, span: Duration) -> usize {
        let mut arrivals = self.arrivals.lock().unwrap().clone();
        arrivals.sort();
        (0..arrivals.len())
            .map(|i| {
                arrivals[..=i]
                    .iter()
                    .filter(|earlier| arrivals[i].duration_since(**earlier) <= span)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }
}

impl Respond for SlowDetails {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        let code = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
        ResponseTemplate::new(200)
            .set_body_json(detail_body(&code, Some(100.0), None))
            .set_delay(self.delay)
    }
}

/// Stored document fields as f64, for comparisons across int/float JSON.
pub fn number(doc: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    doc.get(key).and_then(Value::as_f64)
}

pub fn tags(doc: &serde_json::Map<String, Value>) -> Vec<String> {
    doc.get("additionalCategories")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Memory store whose commits and reads can be made to fail.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStorage,
    failing_commits: AtomicUsize,
    failing_reads: AtomicBool,
    failing_credentials: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` commits without applying them.
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Fail every catalog read until switched off.
    pub fn fail_reads(&self, fail: bool) {
        self.failing_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_credentials(&self, fail: bool) {
        self.failing_credentials.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<()> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(AppError::store("catalog unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for FaultyStore {
    async fn get_products(&self, ids: &[String]) -> Result<HashMap<String, CanonicalProduct>> {
        self.check_reads()?;
        self.inner.get_products(ids).await
    }

    async fn list_products(&self) -> Result<Vec<CanonicalProduct>> {
        self.check_reads()?;
        self.inner.list_products().await
    }

    async fn commit(&self, writes: &[DocumentWrite]) -> Result<()> {
        let failing = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::store("commit rejected"));
        }
        self.inner.commit(writes).await
    }

    async fn read_document(&self, path: &str) -> Result<Option<Value>> {
        if path == paths::CREDENTIALS && self.failing_credentials.load(Ordering::SeqCst) {
            return Err(AppError::store("credentials unavailable"));
        }
        self.inner.read_document(path).await
    }

    async fn write_documents(&self, documents: &[(String, Value)]) -> Result<()> {
        self.inner.write_documents(documents).await
    }

    async fn try_acquire_lease(&self, lease: &JobLease) -> Result<Option<JobLease>> {
        self.inner.try_acquire_lease(lease).await
    }

    async fn release_lease(&self, job: &str, holder: &str) -> Result<()> {
        self.inner.release_lease(job, holder).await
    }

    async fn save_progress(&self, progress: &SyncProgress) -> Result<()> {
        self.inner.save_progress(progress).await
    }
}
