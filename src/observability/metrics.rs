//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by endpoint, method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//!
//! Routed endpoints and the two fallback conditions go through the same
//! [`observe`] wrapper, so fallback traffic shows up under the `NoRoute` and
//! `NoMethod` endpoint labels next to normal routes.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Endpoint label for requests that matched no route.
pub const NO_ROUTE: &str = "NoRoute";
/// Endpoint label for requests whose method is not served on the path.
pub const NO_METHOD: &str = "NoMethod";

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(endpoint: &str, method: &Method, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "endpoint" => endpoint.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "gateway_request_duration_seconds",
        "endpoint" => endpoint.to_string(),
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Run a handler future and record its outcome under `endpoint`.
pub async fn observe<F>(endpoint: &str, method: Method, handler: F) -> Response
where
    F: Future<Output = Response>,
{
    let start = Instant::now();
    let response = handler.await;
    record_request(endpoint, &method, response.status().as_u16(), start);
    response
}
