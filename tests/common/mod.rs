//! Shared test harness: builds a router over an in-memory store with a
//! fixed admin token, and helpers for issuing requests through it with
//! `tower::ServiceExt::oneshot` rather than binding a real socket.

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use scim_server::config::AppConfig;
use scim_server::http::{self, AppState};
use scim_server::observability::{LogConfig, Logger, RequestLogRecord, RequestLogSink, RequestLogWriter, TracingRequestLogSink};
use scim_server::store::InMemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestApp {
    pub router: Router,
}

pub fn test_app() -> TestApp {
    let config = AppConfig {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..AppConfig::default()
    };
    let logger = Arc::new(Logger::new(LogConfig::default(), 200));
    let request_log = Arc::new(RequestLogWriter::new(TracingRequestLogSink));
    let state = AppState::new(InMemoryStore::new(), config, logger, request_log);
    TestApp { router: http::build(state) }
}

/// A [`RequestLogSink`] that keeps every flushed record in memory instead of
/// persisting it, so a test can assert on exactly what the request-logging
/// interceptor enqueued.
#[derive(Default)]
pub struct CapturingSink {
    records: Mutex<Vec<RequestLogRecord>>,
}

impl RequestLogSink for CapturingSink {
    async fn write_batch(&self, records: Vec<RequestLogRecord>) -> Result<(), String> {
        self.records.lock().await.extend(records);
        Ok(())
    }
}

/// Builds a [`TestApp`] whose request-log writer flushes into a
/// [`CapturingSink`], plus a handle to that writer and sink for assertions.
pub fn test_app_with_capture() -> (TestApp, Arc<RequestLogWriter<CapturingSinkRef>>, Arc<CapturingSink>) {
    let config = AppConfig {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..AppConfig::default()
    };
    let sink = Arc::new(CapturingSink::default());
    let logger = Arc::new(Logger::new(LogConfig::default(), 200));
    let request_log = Arc::new(RequestLogWriter::new(CapturingSinkRef(Arc::clone(&sink))));
    let state = AppState::new(InMemoryStore::new(), config, logger, request_log.clone());
    (TestApp { router: http::build(state) }, request_log, sink)
}

/// Thin `RequestLogSink` wrapper so [`RequestLogWriter`] can own a clone of
/// the `Arc<CapturingSink>` the test keeps for itself.
pub struct CapturingSinkRef(pub Arc<CapturingSink>);

impl RequestLogSink for CapturingSinkRef {
    async fn write_batch(&self, records: Vec<RequestLogRecord>) -> Result<(), String> {
        self.0.write_batch(records).await
    }
}

impl CapturingSink {
    pub async fn records(&self) -> Vec<RequestLogRecord> {
        self.records.lock().await.clone()
    }
}

impl TestApp {
    pub async fn admin_request(&self, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(method, path, Some(ADMIN_TOKEN), None, body).await
    }

    pub async fn scim_request(
        &self,
        method: &str,
        path: &str,
        bearer: Option<&str>,
        if_match: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request(method, path, bearer, if_match, body).await
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        bearer: Option<&str>,
        if_match: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.raw_request(method, path, bearer, if_match, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn raw_request(
        &self,
        method: &str,
        path: &str,
        bearer: Option<&str>,
        if_match: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path).header("content-type", "application/scim+json");
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        if let Some(etag) = if_match {
            builder = builder.header("if-match", etag);
        }
        let body = match body {
            Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
            None => Body::empty(),
        };
        let request = builder.body(body).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Creates an endpoint through the admin plane and returns its id.
pub async fn create_endpoint(app: &TestApp, name: &str) -> String {
    let (status, body) = app
        .admin_request("POST", "/admin/endpoints", Some(serde_json::json!({ "name": name })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body:?}");
    body["id"].as_str().unwrap().to_string()
}

/// Creates a bearer credential for `endpoint_id` and returns the plaintext token.
pub async fn create_credential(app: &TestApp, endpoint_id: &str, token: &str) -> String {
    let (status, body) = app
        .admin_request(
            "POST",
            &format!("/admin/endpoints/{endpoint_id}/credentials"),
            Some(serde_json::json!({ "token": token })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body:?}");
    body["token"].as_str().unwrap().to_string()
}
