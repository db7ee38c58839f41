//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use gateway_engine::config::{EndpointConfig, ExtraConfig, ServiceConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Router namespace holding `error_body`.
pub const ROUTER_NS: &str = "github_com/luraproject/lura/router/gin";

/// Extension mapping with a single namespace.
pub fn extra(namespace: &str, section: Value) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(namespace.to_string(), section);
    Value::Object(map)
}

/// Service with `GET /users`, `POST /users` and `GET /status`.
pub fn service_config(extra: Value) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.endpoints.push(EndpointConfig::new("GET", "/users"));
    config.endpoints.push(EndpointConfig::new("POST", "/users"));

    let mut status = EndpointConfig::new("GET", "/status");
    status.static_response = Some(json!({ "status": "ok" }));
    config.endpoints.push(status);

    config.extra_config = match extra {
        Value::Object(map) => ExtraConfig::from(map),
        Value::Null => ExtraConfig::new(),
        other => panic!("extra config must be an object, got {other}"),
    };
    config
}

/// Collected response parts.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    TestResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn request(router: &Router, method: &str, uri: &str) -> TestResponse {
    send(
        router,
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines logged at `level` (e.g. "WARN").
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.split_whitespace().any(|word| word == level))
            .map(str::to_owned)
            .collect()
    }
}

/// Run `f` with a subscriber writing every event into a buffer.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer)
}
