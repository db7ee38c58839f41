//! Endpoint handler factories.
//!
//! The composer does not implement endpoint logic. It asks the
//! [`HandlerFactory`] in `EngineOptions` for one handler per configured
//! endpoint and wraps it with the endpoint instrumentation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::config::EndpointConfig;

/// A heap-allocated, type-erased response future.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Endpoint logic behind one route.
pub trait EndpointHandler: Send + Sync + 'static {
    fn call(&self, request: Request<Body>) -> BoxFuture;
}

impl<F, Fut> EndpointHandler for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request<Body>) -> BoxFuture {
        Box::pin((self)(request))
    }
}

/// Creates the handler of each configured endpoint.
pub trait HandlerFactory: Send + Sync {
    fn new_handler(&self, endpoint: &EndpointConfig) -> Arc<dyn EndpointHandler>;
}

/// Serves each endpoint's `static_response`, or `{}` when none is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticHandlerFactory;

impl HandlerFactory for StaticHandlerFactory {
    fn new_handler(&self, endpoint: &EndpointConfig) -> Arc<dyn EndpointHandler> {
        let body = Arc::new(
            endpoint
                .static_response
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
        );

        Arc::new(move |_request: Request<Body>| {
            let body = Arc::clone(&body);
            async move { (StatusCode::OK, Json(body.as_ref())).into_response() }
        })
    }
}
