//! Fallback responses for unmatched routes and methods.
//!
//! # Responsibilities
//! - Decode the `error_body` section of the router namespace
//! - Build the responder for each fallback condition
//! - Mark every fallback response with the product and completeness headers
//!
//! # Design Decisions
//! - The handler for each condition is resolved before registration, so each
//!   condition is registered (and instrumented) exactly once
//! - Presence of a body key decides, not its value: `null` and `{}` are
//!   rendered verbatim
//! - A malformed `error_body` never blocks startup; both conditions fall back
//!   to the builtin empty body

use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::ExtraConfig;
use crate::observability::metrics::{self, NO_METHOD, NO_ROUTE};

/// Namespace of the router's own settings in `extra_config`.
pub const ROUTER_NAMESPACE: &str = "github_com/luraproject/lura/router/gin";

/// Product identification header set on every fallback response.
pub const PRODUCT_HEADER_NAME: &str = "x-gateway";
pub const PRODUCT_HEADER_VALUE: &str = concat!("Version ", env!("CARGO_PKG_VERSION"));

/// Marks a response as not produced by normal endpoint processing.
pub const COMPLETED_HEADER_NAME: &str = "x-gateway-completed";
pub const INCOMPLETE_RESPONSE_VALUE: &str = "false";

/// The two fallback conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// No route matches the path.
    NotFound,
    /// The path matches but not with the request's method.
    MethodNotAllowed,
}

impl FallbackKind {
    pub fn status(self) -> StatusCode {
        match self {
            FallbackKind::NotFound => StatusCode::NOT_FOUND,
            FallbackKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Endpoint label used by the request instrumentation.
    pub fn endpoint_label(self) -> &'static str {
        match self {
            FallbackKind::NotFound => NO_ROUTE,
            FallbackKind::MethodNotAllowed => NO_METHOD,
        }
    }
}

/// Configured fallback bodies. `None` means builtin behaviour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackConfig {
    pub not_found: Option<Value>,
    pub method_not_allowed: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RouterOptions {
    #[serde(default)]
    error_body: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "404", default, deserialize_with = "present")]
    not_found: Option<Value>,
    #[serde(rename = "405", default, deserialize_with = "present")]
    method_not_allowed: Option<Value>,
}

/// A key that is present yields `Some`, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FallbackConfig {
    /// Resolve the fallback bodies from the router namespace.
    pub fn from_extra(extra: &ExtraConfig) -> Self {
        let section = match extra.section(ROUTER_NAMESPACE) {
            None | Some(Value::Null) => return Self::default(),
            Some(section) => section,
        };

        match RouterOptions::deserialize(section) {
            Ok(options) => Self {
                not_found: options.error_body.not_found,
                method_not_allowed: options.error_body.method_not_allowed,
            },
            Err(e) => {
                tracing::warn!(
                    namespace = ROUTER_NAMESPACE,
                    error = %e,
                    "Ignoring malformed error_body, using builtin fallback responses"
                );
                Self::default()
            }
        }
    }

    pub fn body(&self, kind: FallbackKind) -> Option<&Value> {
        match kind {
            FallbackKind::NotFound => self.not_found.as_ref(),
            FallbackKind::MethodNotAllowed => self.method_not_allowed.as_ref(),
        }
    }
}

/// Produces the response for one fallback condition.
#[derive(Debug, Clone)]
pub struct FallbackResponder {
    kind: FallbackKind,
    body: Option<Arc<Value>>,
}

impl FallbackResponder {
    pub fn new(kind: FallbackKind, body: Option<Value>) -> Self {
        Self {
            kind,
            body: body.map(Arc::new),
        }
    }

    pub fn from_config(kind: FallbackKind, config: &FallbackConfig) -> Self {
        Self::new(kind, config.body(kind).cloned())
    }

    pub fn kind(&self) -> FallbackKind {
        self.kind
    }

    pub fn has_custom_body(&self) -> bool {
        self.body.is_some()
    }

    /// Build the fallback response.
    pub fn respond(&self) -> Response {
        let mut response = match &self.body {
            Some(body) => (self.kind.status(), Json(body.as_ref())).into_response(),
            None => self.kind.status().into_response(),
        };

        let headers = response.headers_mut();
        headers.insert(PRODUCT_HEADER_NAME, HeaderValue::from_static(PRODUCT_HEADER_VALUE));
        headers.insert(
            COMPLETED_HEADER_NAME,
            HeaderValue::from_static(INCOMPLETE_RESPONSE_VALUE),
        );
        response
    }

    /// Instrumented request handler.
    pub async fn handle(self, method: Method) -> Response {
        metrics::observe(self.kind.endpoint_label(), method, async { self.respond() }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extra(section: Value) -> ExtraConfig {
        let mut extra = ExtraConfig::new();
        extra.insert(ROUTER_NAMESPACE, section);
        extra
    }

    #[test]
    fn test_absent_namespace_uses_builtin() {
        let config = FallbackConfig::from_extra(&ExtraConfig::new());
        assert_eq!(config, FallbackConfig::default());
    }

    #[test]
    fn test_null_body_is_present() {
        let config = FallbackConfig::from_extra(&extra(json!({ "error_body": { "404": null } })));
        assert_eq!(config.not_found, Some(Value::Null));
        assert_eq!(config.method_not_allowed, None);
    }

    #[test]
    fn test_other_router_options_are_ignored() {
        let config = FallbackConfig::from_extra(&extra(json!({
            "return_error_msg": true,
            "error_body": { "405": { "error": "method" } }
        })));
        assert_eq!(config.not_found, None);
        assert_eq!(config.method_not_allowed, Some(json!({ "error": "method" })));
    }

    #[test]
    fn test_malformed_error_body_is_lenient() {
        let config = FallbackConfig::from_extra(&extra(json!({ "error_body": "oops" })));
        assert_eq!(config, FallbackConfig::default());
    }

    #[test]
    fn test_builtin_response_has_headers_and_status() {
        let response = FallbackResponder::new(FallbackKind::MethodNotAllowed, None).respond();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[PRODUCT_HEADER_NAME], PRODUCT_HEADER_VALUE);
        assert_eq!(response.headers()[COMPLETED_HEADER_NAME], INCOMPLETE_RESPONSE_VALUE);
        assert!(response.headers().get("content-type").is_none());
    }

    #[test]
    fn test_custom_body_is_json() {
        let responder = FallbackResponder::new(FallbackKind::NotFound, Some(json!({ "error": "nf" })));
        assert!(responder.has_custom_body());

        let response = responder.respond();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()[PRODUCT_HEADER_NAME], PRODUCT_HEADER_VALUE);
    }
}
