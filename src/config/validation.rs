//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port and timeout non-zero)
//! - Check endpoint paths and methods
//! - Detect duplicate routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Paths are checked one at a time here; collisions between paths (a
//!   parameter and a catch-all at the same position, or parameter names that
//!   disagree) are reported by the engine composer as route conflicts

use std::collections::HashSet;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{EndpointConfig, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("port must be non-zero")]
    ZeroPort,

    #[error("timeout must be non-zero")]
    ZeroTimeout,

    #[error("endpoint `{0}` must start with '/'")]
    RelativePath(String),

    #[error("endpoint `{0}` has a malformed path parameter")]
    MalformedPath(String),

    #[error("endpoint `{endpoint}` uses unsupported method `{method}`")]
    UnsupportedMethod { endpoint: String, method: String },

    #[error("endpoint `{endpoint}` is declared twice for {method}")]
    DuplicateEndpoint { endpoint: String, method: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.timeout == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let mut seen = HashSet::new();
    for endpoint in &config.endpoints {
        if let Err(e) = validate_endpoint(endpoint) {
            errors.push(e);
            continue;
        }
        let key = (endpoint.endpoint.as_str(), endpoint.method.to_ascii_uppercase());
        if !seen.insert(key) {
            errors.push(ValidationError::DuplicateEndpoint {
                endpoint: endpoint.endpoint.clone(),
                method: endpoint.method.to_ascii_uppercase(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check one endpoint in isolation and resolve its method.
pub fn validate_endpoint(endpoint: &EndpointConfig) -> Result<Method, ValidationError> {
    if !endpoint.endpoint.starts_with('/') {
        return Err(ValidationError::RelativePath(endpoint.endpoint.clone()));
    }
    if !well_formed_params(&endpoint.endpoint) {
        return Err(ValidationError::MalformedPath(endpoint.endpoint.clone()));
    }
    parse_method(&endpoint.method).ok_or_else(|| ValidationError::UnsupportedMethod {
        endpoint: endpoint.endpoint.clone(),
        method: endpoint.method.clone(),
    })
}

/// Parameters are whole segments written `{name}` or `{*name}`; a
/// catch-all may only be the last segment.
fn well_formed_params(path: &str) -> bool {
    if path.split('/').rev().skip(1).any(|s| s.starts_with("{*")) {
        return false;
    }
    path.split('/').all(|segment| {
        if segment.starts_with(':') || segment.starts_with('*') {
            return false;
        }
        if !segment.contains(['{', '}']) {
            return true;
        }
        segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .map(|name| name.strip_prefix('*').unwrap_or(name))
            .is_some_and(|name| !name.is_empty() && !name.contains(['{', '}']))
    })
}

/// Methods the router can dispatch on.
pub fn parse_method(method: &str) -> Option<Method> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        "HEAD" => Some(Method::HEAD),
        "OPTIONS" => Some(Method::OPTIONS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.port = 0;
        config.timeout = 0;
        config.endpoints.push(EndpointConfig::new("GET", "users"));
        config.endpoints.push(EndpointConfig::new("BREW", "/coffee"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroPort));
        assert!(errors.contains(&ValidationError::RelativePath("users".into())));
    }

    #[test]
    fn test_path_parameters() {
        for ok in ["/users/{id}", "/files/{*rest}", "/", "/a/b"] {
            assert!(validate_endpoint(&EndpointConfig::new("GET", ok)).is_ok(), "{ok}");
        }
        for bad in ["/users/:id", "/files/*rest", "/users/{id", "/users/{}", "/x/{{y}}", "/{*a}/b"] {
            assert_eq!(
                validate_endpoint(&EndpointConfig::new("GET", bad)),
                Err(ValidationError::MalformedPath(bad.into())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_duplicate_detection_ignores_method_case() {
        let mut config = ServiceConfig::default();
        config.endpoints.push(EndpointConfig::new("get", "/users"));
        config.endpoints.push(EndpointConfig::new("GET", "/users"));
        config.endpoints.push(EndpointConfig::new("POST", "/users"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateEndpoint {
                endpoint: "/users".into(),
                method: "GET".into(),
            }]
        );
    }
}
