//! Request tracing and the telemetry handle.
//!
//! # Responsibilities
//! - Own the telemetry lifecycle (start before the engine, stop after it)
//! - Build the outermost trace layer with the service identifier on every span
//!
//! # Design Decisions
//! - No process-global tracer: the handle is passed explicitly through
//!   `EngineOptions`, and the guard returned by [`Telemetry::start`] marks
//!   the end of the telemetry scope when dropped
//! - The trace layer wraps fallback responses too, so unmatched traffic is
//!   traced like routed traffic

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Span;

/// Service identifier attached to every request span.
pub const TRACE_SERVICE_NAME: &str = "gateway-engine";

/// Shared handle to the telemetry scope.
#[derive(Debug, Clone)]
pub struct Telemetry {
    service: Arc<str>,
    active: Arc<AtomicBool>,
}

impl Telemetry {
    /// Start a telemetry scope. Keep the guard alive until the server stops.
    pub fn start(service: &str) -> TelemetryGuard {
        let telemetry = Self {
            service: Arc::from(service),
            active: Arc::new(AtomicBool::new(true)),
        };
        tracing::info!(service = %telemetry.service, "Telemetry started");
        TelemetryGuard { telemetry }
    }

    /// Service identifier recorded on request spans.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Whether the owning scope is still open.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Trace layer labelled with this handle's service identifier.
    pub fn trace_layer(&self) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, ServiceSpan> {
        TraceLayer::new_for_http().make_span_with(ServiceSpan {
            service: Arc::clone(&self.service),
        })
    }
}

impl Default for Telemetry {
    /// An inactive handle, for engines built outside a telemetry scope.
    fn default() -> Self {
        Self {
            service: Arc::from(TRACE_SERVICE_NAME),
            active: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Closes the telemetry scope on drop.
#[derive(Debug)]
pub struct TelemetryGuard {
    telemetry: Telemetry,
}

impl TelemetryGuard {
    pub fn handle(&self) -> Telemetry {
        self.telemetry.clone()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        self.telemetry.active.store(false, Ordering::Release);
        tracing::info!(service = %self.telemetry.service, "Telemetry stopped");
    }
}

/// Span factory for the trace layer.
#[derive(Debug, Clone)]
pub struct ServiceSpan {
    service: Arc<str>,
}

impl<B> MakeSpan<B> for ServiceSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(crate::http::request::X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        tracing::info_span!(
            "request",
            service = %self.service,
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_closes_scope() {
        let guard = Telemetry::start(TRACE_SERVICE_NAME);
        let handle = guard.handle();
        assert!(handle.is_active());
        assert_eq!(handle.service(), TRACE_SERVICE_NAME);

        drop(guard);
        assert!(!handle.is_active());
    }

    #[test]
    fn test_default_handle_is_inactive() {
        let handle = Telemetry::default();
        assert!(!handle.is_active());
        assert_eq!(handle.service(), TRACE_SERVICE_NAME);
    }
}
