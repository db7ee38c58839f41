//! User-Agent based bot detection.
//!
//! Decision order for a User-Agent:
//! 1. empty → bot only if `empty_user_agent_is_bot`
//! 2. exact match in `allow` → not a bot
//! 3. exact match in `deny` → bot
//! 4. any of `patterns` matches → bot
//!
//! The User-Agent is matched as raw header bytes; a value that is not valid
//! UTF-8 still goes through the lists and patterns. Pattern verdicts are
//! memoised in a bounded cache when `cache_size > 0`.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use regex::bytes::RegexSet;
use serde::Deserialize;
use tracing::Span;

use super::{decode, AttachError, Capability};
use crate::config::ExtraConfig;
use crate::engine::EngineBuilder;

pub const NAMESPACE: &str = "security/bot-detector";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
    pub patterns: Vec<String>,
    pub cache_size: usize,
    pub empty_user_agent_is_bot: bool,
}

/// Compiled detector.
#[derive(Debug)]
pub struct Detector {
    allow: HashSet<Vec<u8>>,
    deny: HashSet<Vec<u8>>,
    patterns: RegexSet,
    empty_user_agent_is_bot: bool,
    cache: DashMap<Vec<u8>, bool>,
    cache_size: usize,
}

impl Detector {
    pub fn new(config: BotConfig) -> Result<Self, AttachError> {
        let patterns = RegexSet::new(&config.patterns)
            .map_err(|e| AttachError::InitFailed(format!("bad pattern: {e}")))?;

        Ok(Self {
            allow: config.allow.into_iter().map(String::into_bytes).collect(),
            deny: config.deny.into_iter().map(String::into_bytes).collect(),
            patterns,
            empty_user_agent_is_bot: config.empty_user_agent_is_bot,
            cache: DashMap::new(),
            cache_size: config.cache_size,
        })
    }

    pub fn is_bot(&self, user_agent: impl AsRef<[u8]>) -> bool {
        let user_agent = user_agent.as_ref();
        if user_agent.is_empty() {
            return self.empty_user_agent_is_bot;
        }
        if self.allow.contains(user_agent) {
            return false;
        }
        if self.deny.contains(user_agent) {
            return true;
        }
        if self.cache_size == 0 {
            return self.patterns.is_match(user_agent);
        }

        if let Some(verdict) = self.cache.get(user_agent) {
            return *verdict;
        }
        let verdict = self.patterns.is_match(user_agent);
        // Full cache: keep serving, stop memoising.
        if self.cache.len() < self.cache_size {
            self.cache.insert(user_agent.to_vec(), verdict);
        }
        verdict
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Middleware rejecting detected bots with 403.
pub async fn bot_detector_middleware(
    State(detector): State<Arc<Detector>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .map(HeaderValue::as_bytes)
        .unwrap_or_default();

    if detector.is_bot(user_agent) {
        tracing::debug!(user_agent = %String::from_utf8_lossy(user_agent), "Bot rejected");
        return (StatusCode::FORBIDDEN, "bot rejected").into_response();
    }
    next.run(request).await
}

/// The bot detection capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct BotDetector;

impl Capability for BotDetector {
    fn name(&self) -> &'static str {
        "bot-detector"
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
        let config: BotConfig = decode(extra, NAMESPACE)?;
        let detector = Arc::new(Detector::new(config)?);

        tracing::trace!(
            parent: logger,
            allow = detector.allow.len(),
            deny = detector.deny.len(),
            patterns = detector.patterns.len(),
            "Bot detector compiled"
        );

        engine.intercept(self.name(), move |router| {
            router.layer(middleware::from_fn_with_state(detector, bot_detector_middleware))
        });
        Ok(())
    }
}
