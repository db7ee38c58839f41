//! Fallback traffic is measured and traced like routed traffic.

use axum::http::StatusCode;
use gateway_engine::observability::metrics::{NO_METHOD, NO_ROUTE};
use gateway_engine::observability::TRACE_SERVICE_NAME;
use gateway_engine::{new_engine, EngineOptions};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tokio::runtime::Runtime;

mod common;

use common::{capture_logs, get, request, service_config};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Value of the request counter carrying every label in `labels`.
fn request_count(rendered: &str, labels: &[&str]) -> Option<u64> {
    rendered
        .lines()
        .filter(|line| line.starts_with("gateway_requests_total{"))
        .find(|line| labels.iter().all(|label| line.contains(label)))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

#[test]
fn test_fallbacks_are_counted_under_their_own_labels() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let router = new_engine(&service_config(Value::Null), EngineOptions::default())
        .unwrap()
        .into_router();

    metrics::with_local_recorder(&recorder, || {
        runtime().block_on(async {
            assert_eq!(get(&router, "/missing").await.status, StatusCode::NOT_FOUND);
            assert_eq!(get(&router, "/also-missing").await.status, StatusCode::NOT_FOUND);
            assert_eq!(
                request(&router, "DELETE", "/users").await.status,
                StatusCode::METHOD_NOT_ALLOWED
            );
            assert_eq!(get(&router, "/status").await.status, StatusCode::OK);
        })
    });

    let rendered = handle.render();
    let no_route = format!("endpoint=\"{NO_ROUTE}\"");
    let no_method = format!("endpoint=\"{NO_METHOD}\"");

    assert_eq!(
        request_count(&rendered, &[no_route.as_str(), "method=\"GET\"", "status=\"404\""]),
        Some(2),
        "{rendered}"
    );
    assert_eq!(
        request_count(&rendered, &[no_method.as_str(), "method=\"DELETE\"", "status=\"405\""]),
        Some(1),
        "{rendered}"
    );
    assert_eq!(
        request_count(&rendered, &["endpoint=\"/status\"", "method=\"GET\"", "status=\"200\""]),
        Some(1),
        "{rendered}"
    );
}

#[test]
fn test_fallback_spans_carry_service_and_request_id() {
    let router = new_engine(&service_config(Value::Null), EngineOptions::default())
        .unwrap()
        .into_router();

    let (_, logs) = capture_logs(|| {
        runtime().block_on(async {
            get(&router, "/missing").await;
            request(&router, "PUT", "/status").await;
        })
    });

    let service = format!("service={TRACE_SERVICE_NAME}");
    for uri in ["uri=/missing", "uri=/status"] {
        let spans: Vec<String> = logs
            .contents()
            .lines()
            .filter(|line| line.contains("request{") && line.contains(uri))
            .map(str::to_owned)
            .collect();
        assert!(!spans.is_empty(), "no span for {uri}:\n{}", logs.contents());
        for line in spans {
            assert!(line.contains(&service), "{line}");
            assert!(!line.contains("request_id=unknown"), "{line}");
        }
    }
}
