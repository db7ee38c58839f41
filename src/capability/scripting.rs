//! Declarative request/response hooks.
//!
//! A hook script is two ordered lists of operations: `pre` runs on the
//! request before routing, `post` runs on the response. Each operation may be
//! guarded by `when_header`, in which case it only runs when the request
//! carries that header.
//!
//! ```json
//! {
//!   "pre":  [{ "op": "reject", "status": 403, "when_header": "x-blocked" }],
//!   "post": [{ "op": "set_header", "name": "x-served-by", "value": "edge" },
//!            { "op": "remove_header", "name": "server" }]
//! }
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::Span;

use super::{decode, AttachError, Capability};
use crate::config::ExtraConfig;
use crate::engine::EngineBuilder;

pub const NAMESPACE: &str = "modifier/script";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptConfig {
    #[serde(default)]
    pub pre: Vec<HookOp>,
    #[serde(default)]
    pub post: Vec<HookOp>,
}

/// One operation as written in the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HookOp {
    SetHeader {
        name: String,
        value: String,
        #[serde(default)]
        when_header: Option<String>,
    },
    RemoveHeader {
        name: String,
        #[serde(default)]
        when_header: Option<String>,
    },
    Reject {
        status: u16,
        #[serde(default)]
        body: Option<Value>,
        #[serde(default)]
        when_header: Option<String>,
    },
}

#[derive(Debug, Clone)]
enum Action {
    SetHeader(HeaderName, HeaderValue),
    RemoveHeader(HeaderName),
    Reject(StatusCode, Option<Arc<Value>>),
}

#[derive(Debug, Clone)]
struct Step {
    guard: Option<HeaderName>,
    action: Action,
}

impl Step {
    fn compile(op: HookOp) -> Result<Self, AttachError> {
        let (guard, action) = match op {
            HookOp::SetHeader {
                name,
                value,
                when_header,
            } => {
                let value = HeaderValue::from_str(&value).map_err(|_| {
                    AttachError::InvalidConfig(format!("invalid value for header `{name}`"))
                })?;
                (when_header, Action::SetHeader(header_name(&name)?, value))
            }
            HookOp::RemoveHeader { name, when_header } => {
                (when_header, Action::RemoveHeader(header_name(&name)?))
            }
            HookOp::Reject {
                status,
                body,
                when_header,
            } => {
                let status = StatusCode::from_u16(status)
                    .map_err(|_| AttachError::InvalidConfig(format!("invalid status {status}")))?;
                (when_header, Action::Reject(status, body.map(Arc::new)))
            }
        };

        Ok(Self {
            guard: guard.as_deref().map(header_name).transpose()?,
            action,
        })
    }

    fn applies(&self, request_headers: &HeaderMap) -> bool {
        self.guard
            .as_ref()
            .map(|g| request_headers.contains_key(g))
            .unwrap_or(true)
    }
}

fn header_name(name: &str) -> Result<HeaderName, AttachError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| AttachError::InvalidConfig(format!("invalid header name `{name}`")))
}

fn reject(status: StatusCode, body: &Option<Arc<Value>>) -> Response {
    match body {
        Some(body) => (status, Json(body.as_ref())).into_response(),
        None => status.into_response(),
    }
}

/// Compiled hook script.
#[derive(Debug, Clone)]
pub struct HookScript {
    pre: Vec<Step>,
    post: Vec<Step>,
}

impl HookScript {
    pub fn compile(config: ScriptConfig) -> Result<Self, AttachError> {
        if config.pre.is_empty() && config.post.is_empty() {
            return Err(AttachError::InvalidConfig("script defines no hooks".into()));
        }
        Ok(Self {
            pre: config.pre.into_iter().map(Step::compile).collect::<Result<_, _>>()?,
            post: config.post.into_iter().map(Step::compile).collect::<Result<_, _>>()?,
        })
    }

    /// Run the request hooks. Returns a response when a hook rejects.
    fn run_pre(&self, request: &mut Request<Body>) -> Option<Response> {
        for step in &self.pre {
            if !step.applies(request.headers()) {
                continue;
            }
            match &step.action {
                Action::SetHeader(name, value) => {
                    request.headers_mut().insert(name.clone(), value.clone());
                }
                Action::RemoveHeader(name) => {
                    request.headers_mut().remove(name);
                }
                Action::Reject(status, body) => return Some(reject(*status, body)),
            }
        }
        None
    }

    fn run_post(&self, request_headers: &HeaderMap, mut response: Response) -> Response {
        for step in &self.post {
            if !step.applies(request_headers) {
                continue;
            }
            match &step.action {
                Action::SetHeader(name, value) => {
                    response.headers_mut().insert(name.clone(), value.clone());
                }
                Action::RemoveHeader(name) => {
                    response.headers_mut().remove(name);
                }
                Action::Reject(status, body) => response = reject(*status, body),
            }
        }
        response
    }

    fn post_needs_request_headers(&self) -> bool {
        self.post.iter().any(|s| s.guard.is_some())
    }
}

/// Middleware running a hook script around the inner service.
pub async fn script_middleware(
    State(script): State<Arc<HookScript>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(response) = script.run_pre(&mut request) {
        return response;
    }

    let request_headers = if script.post_needs_request_headers() {
        request.headers().clone()
    } else {
        HeaderMap::new()
    };

    let response = next.run(request).await;
    script.run_post(&request_headers, response)
}

/// The scripting hooks capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scripting;

impl Capability for Scripting {
    fn name(&self) -> &'static str {
        "scripting"
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
        let config: ScriptConfig = decode(extra, NAMESPACE)?;
        let script = Arc::new(HookScript::compile(config)?);

        tracing::trace!(
            parent: logger,
            pre = script.pre.len(),
            post = script.post.len(),
            "Hook script compiled"
        );

        engine.intercept(self.name(), move |router| {
            router.layer(middleware::from_fn_with_state(script, script_middleware))
        });
        Ok(())
    }
}
