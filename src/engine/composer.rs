//! Engine composition.
//!
//! # Order
//! ```text
//! base router (endpoints, each instrumented)
//!     → request-id        (outermost)
//!     → tracing           (service-labelled spans, wraps fallbacks too)
//!     → fallbacks         (404 / 405, resolved once, instrumented)
//!     → security-headers  ┐
//!     → scripting         ├ optional, fixed order
//!     → bot-detector      ┘
//!     → limits            (timeout, body size; innermost)
//! ```
//!
//! Only a malformed base router is fatal. A capability that fails to attach
//! is logged at warn level and left out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::capability::{self, AttachError, Capability};
use crate::config::validation::{validate_config, validate_endpoint};
use crate::config::{EndpointConfig, ServiceConfig, ValidationError};
use crate::engine::builder::{Engine, EngineBuilder};
use crate::engine::error::EngineError;
use crate::engine::handler::{BoxFuture, HandlerFactory};
use crate::engine::EngineOptions;
use crate::http::fallback::{FallbackConfig, FallbackKind, FallbackResponder};
use crate::http::request::{assign_request_id, propagate_request_id};
use crate::observability::metrics;

/// Builds engines from service configuration.
pub struct EngineComposer {
    capabilities: Vec<Box<dyn Capability>>,
}

impl EngineComposer {
    /// Composer attaching the builtin capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(capability::builtin())
    }

    /// Composer attaching `capabilities` in the given order.
    pub fn with_capabilities(capabilities: Vec<Box<dyn Capability>>) -> Self {
        Self { capabilities }
    }

    pub fn compose(
        &self,
        config: &ServiceConfig,
        options: &EngineOptions,
    ) -> Result<Engine, EngineError> {
        let _entered = options.logger.enter();

        let router = base_router(config, options.handler_factory.as_ref())?;
        let mut engine = EngineBuilder::new(router);

        engine.intercept("request-id", |router| {
            assign_request_id(propagate_request_id(router))
        });

        let trace = options.telemetry.trace_layer();
        engine.intercept("tracing", move |router| router.layer(trace));

        let fallback = FallbackConfig::from_extra(&config.extra_config);
        for kind in [FallbackKind::NotFound, FallbackKind::MethodNotAllowed] {
            let responder = FallbackResponder::from_config(kind, &fallback);
            tracing::debug!(
                status = kind.status().as_u16(),
                custom_body = responder.has_custom_body(),
                "Fallback handler registered"
            );
            engine.fallback(responder);
        }

        let mut attached = Vec::new();
        for capability in &self.capabilities {
            match capability.attach(&config.extra_config, &mut engine, &options.logger) {
                Ok(()) => {
                    tracing::debug!(module = capability.name(), "Successfully loaded module");
                    attached.push(capability.name());
                }
                Err(AttachError::NotConfigured) => {}
                Err(e) => {
                    tracing::warn!(
                        module = capability.name(),
                        namespace = capability.namespace(),
                        error = %e,
                        "Module not loaded"
                    );
                }
            }
        }

        let timeout = Duration::from_millis(config.timeout);
        let max_body_bytes = config.max_body_bytes;
        #[allow(deprecated)]
        engine.intercept("limits", move |router| {
            router
                .layer(RequestBodyLimitLayer::new(max_body_bytes))
                .layer(TimeoutLayer::new(timeout))
        });

        let engine = engine.finish(attached);
        tracing::info!(
            service = %config.name,
            endpoints = config.endpoints.len(),
            telemetry = options.telemetry.is_active(),
            layers = ?engine.layers(),
            "Engine composed"
        );
        Ok(engine)
    }
}

impl Default for EngineComposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Register every endpoint, grouped by path, each wrapped by the endpoint
/// instrumentation.
fn base_router(config: &ServiceConfig, factory: &dyn HandlerFactory) -> Result<Router, EngineError> {
    validate_config(config).map_err(EngineError::InvalidConfig)?;

    let mut wildcards = WildcardIndex::default();
    let mut grouped: Vec<(&str, Vec<&EndpointConfig>)> = Vec::new();
    for endpoint in &config.endpoints {
        let path = endpoint.endpoint.as_str();
        wildcards.insert(path)?;

        match grouped.iter_mut().find(|(p, _)| *p == path) {
            Some((_, endpoints)) => endpoints.push(endpoint),
            None => grouped.push((path, vec![endpoint])),
        }
    }

    let mut router = Router::new();
    for (path, endpoints) in grouped {
        let mut method_router: MethodRouter = MethodRouter::new();
        for endpoint in endpoints {
            method_router = method_router.on(method_filter(endpoint)?, instrumented(endpoint, factory));
        }
        tracing::trace!(path, "Route registered");
        router = router.route(path, method_router);
    }
    Ok(router)
}

fn method_filter(endpoint: &EndpointConfig) -> Result<MethodFilter, EngineError> {
    let invalid = |e: ValidationError| EngineError::InvalidConfig(vec![e]);
    let method = validate_endpoint(endpoint).map_err(invalid)?;
    MethodFilter::try_from(method).map_err(|_| {
        invalid(ValidationError::UnsupportedMethod {
            endpoint: endpoint.endpoint.clone(),
            method: endpoint.method.clone(),
        })
    })
}

fn instrumented(
    endpoint: &EndpointConfig,
    factory: &dyn HandlerFactory,
) -> impl Fn(Request<Body>) -> BoxFuture + Clone + Send + Sync + 'static {
    let handler = factory.new_handler(endpoint);
    let label: Arc<str> = Arc::from(endpoint.label());

    move |request: Request<Body>| -> BoxFuture {
        let handler = Arc::clone(&handler);
        let label = Arc::clone(&label);
        Box::pin(async move {
            let method = request.method().clone();
            metrics::observe(&label, method, handler.call(request)).await
        })
    }
}

/// Wildcard segments seen so far, keyed by the erased path leading to them.
///
/// The router keeps one wildcard per position: two paths sharing a prefix
/// must agree on the parameter there, both in kind (`{x}` or `{*x}`) and in
/// name.
#[derive(Default)]
struct WildcardIndex<'a> {
    seen: HashMap<String, (&'a str, &'a str)>,
}

impl<'a> WildcardIndex<'a> {
    fn insert(&mut self, path: &'a str) -> Result<(), EngineError> {
        let segments: Vec<&str> = path.split('/').collect();
        for (position, segment) in segments.iter().enumerate() {
            if !segment.starts_with('{') {
                continue;
            }
            let prefix = route_shape(&segments[..position].join("/"));
            let (existing_segment, existing) =
                *self.seen.entry(prefix).or_insert((*segment, path));
            if existing_segment != *segment {
                return Err(EngineError::RouteConflict {
                    endpoint: path.to_string(),
                    existing: existing.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Path with every parameter name erased.
fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
