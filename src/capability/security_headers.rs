//! Security response headers and host allow-listing.
//!
//! # Responsibilities
//! - Reject requests whose Host is not allow-listed
//! - Add HSTS, frame, sniffing, XSS, CSP and referrer headers to responses
//!
//! # Design Decisions
//! - Header values are validated at attach time; a bad value disables the
//!   module instead of failing requests
//! - `is_development` turns off host checks and HSTS
//! - Fallback responses get the headers too, since the layer sits above
//!   route dispatch

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::Span;

use super::{decode, AttachError, Capability};
use crate::config::ExtraConfig;
use crate::engine::EngineBuilder;

pub const NAMESPACE: &str = "security/http";

/// Raw module configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecureConfig {
    pub allowed_hosts: Vec<String>,
    pub sts_seconds: u64,
    pub sts_include_subdomains: bool,
    pub frame_deny: bool,
    pub custom_frame_options_value: String,
    pub content_type_nosniff: bool,
    pub browser_xss_filter: bool,
    pub content_security_policy: String,
    pub referrer_policy: String,
    pub is_development: bool,
}

/// Compiled policy shared by all requests.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    allowed_hosts: Vec<String>,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityPolicy {
    pub fn compile(config: SecureConfig) -> Result<Self, AttachError> {
        let mut headers = Vec::new();

        if config.sts_seconds > 0 && !config.is_development {
            let mut value = format!("max-age={}", config.sts_seconds);
            if config.sts_include_subdomains {
                value.push_str("; includeSubDomains");
            }
            headers.push((header::STRICT_TRANSPORT_SECURITY, header_value("sts", &value)?));
        }

        if !config.custom_frame_options_value.is_empty() {
            headers.push((
                header::X_FRAME_OPTIONS,
                header_value("custom_frame_options_value", &config.custom_frame_options_value)?,
            ));
        } else if config.frame_deny {
            headers.push((header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")));
        }

        if config.content_type_nosniff {
            headers.push((header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")));
        }
        if config.browser_xss_filter {
            headers.push((header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")));
        }
        if !config.content_security_policy.is_empty() {
            headers.push((
                header::CONTENT_SECURITY_POLICY,
                header_value("content_security_policy", &config.content_security_policy)?,
            ));
        }
        if !config.referrer_policy.is_empty() {
            headers.push((
                header::REFERRER_POLICY,
                header_value("referrer_policy", &config.referrer_policy)?,
            ));
        }

        let allowed_hosts = if config.is_development {
            Vec::new()
        } else {
            config
                .allowed_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect()
        };

        Ok(Self {
            allowed_hosts,
            headers,
        })
    }

    /// Whether the request's host passes the allow-list.
    pub fn host_allowed(&self, host: Option<&str>) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        host.map(|h| self.allowed_hosts.iter().any(|a| a.eq_ignore_ascii_case(h)))
            .unwrap_or(false)
    }

    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue, AttachError> {
    HeaderValue::from_str(value)
        .map_err(|_| AttachError::InvalidConfig(format!("`{field}` is not a valid header value")))
}

/// Middleware applying the policy.
pub async fn security_headers_middleware(
    State(policy): State<Arc<SecurityPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()));

    if !policy.host_allowed(host) {
        tracing::debug!(host = ?host, "Host not allowed");
        return (StatusCode::BAD_REQUEST, "Bad Host").into_response();
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in policy.headers() {
        headers.insert(name.clone(), value.clone());
    }
    response
}

/// The security headers capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders;

impl Capability for SecurityHeaders {
    fn name(&self) -> &'static str {
        "security-headers"
    }

    fn namespace(&self) -> &'static str {
        NAMESPACE
    }

    fn attach(
        &self,
        extra: &ExtraConfig,
        engine: &mut EngineBuilder,
        logger: &Span,
    ) -> Result<(), AttachError> {
        let config: SecureConfig = decode(extra, NAMESPACE)?;
        let policy = Arc::new(SecurityPolicy::compile(config)?);

        tracing::trace!(
            parent: logger,
            headers = policy.headers().len(),
            allowed_hosts = policy.allowed_hosts.len(),
            "Security policy compiled"
        );

        engine.intercept(self.name(), move |router| {
            router.layer(middleware::from_fn_with_state(policy, security_headers_middleware))
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_headers() {
        let policy = SecurityPolicy::compile(SecureConfig {
            sts_seconds: 3600,
            sts_include_subdomains: true,
            frame_deny: true,
            content_type_nosniff: true,
            ..Default::default()
        })
        .unwrap();

        let headers = policy.headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].1, "max-age=3600; includeSubDomains");
        assert_eq!(headers[1].1, "DENY");
    }

    #[test]
    fn test_custom_frame_value_wins() {
        let policy = SecurityPolicy::compile(SecureConfig {
            frame_deny: true,
            custom_frame_options_value: "SAMEORIGIN".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(policy.headers(), &[(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"))]);
    }

    #[test]
    fn test_invalid_header_value() {
        let err = SecurityPolicy::compile(SecureConfig {
            content_security_policy: "default-src\n'self'".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AttachError::InvalidConfig(_)));
    }

    #[test]
    fn test_host_allow_list() {
        let policy = SecurityPolicy::compile(SecureConfig {
            allowed_hosts: vec!["API.example.com".into()],
            ..Default::default()
        })
        .unwrap();

        assert!(policy.host_allowed(Some("api.example.com")));
        assert!(!policy.host_allowed(Some("evil.com")));
        assert!(!policy.host_allowed(None));
    }

    #[test]
    fn test_development_disables_hosts_and_sts() {
        let policy = SecurityPolicy::compile(SecureConfig {
            allowed_hosts: vec!["api.example.com".into()],
            sts_seconds: 60,
            is_development: true,
            ..Default::default()
        })
        .unwrap();

        assert!(policy.host_allowed(Some("localhost")));
        assert!(policy.headers().is_empty());
    }
}
