//! Request identification.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID when the client sent none
//! - Echo the request ID back on the response
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing: the generating
//!   layer sits outside the trace layer so every span can record it

use axum::http::HeaderName;
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

fn header_name() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Copy the request ID onto the response. Applied just inside the
/// assigning layer, both outside the trace layer.
pub fn propagate_request_id(router: Router) -> Router {
    router.layer(PropagateRequestIdLayer::new(header_name()))
}

/// Assign a request ID to requests without one. Applied outermost.
pub fn assign_request_id(router: Router) -> Router {
    router.layer(SetRequestIdLayer::new(header_name(), MakeRequestUuid))
}
