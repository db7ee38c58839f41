//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine composition and request handling produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms per endpoint)
//!     → tracing.rs (request spans labelled with the service identifier)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through every request span
//! - Fallback handlers are instrumented exactly like routed endpoints

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::tracing::{Telemetry, TelemetryGuard, TRACE_SERVICE_NAME};
