//! Optional capability modules.
//!
//! # Data Flow
//! ```text
//! ExtraConfig (namespace → raw blob)
//!     → Capability::attach (module decodes its own namespace)
//!     → EngineBuilder::intercept (module registers its interceptor)
//!     → or AttachError::NotConfigured / InvalidConfig / InitFailed
//! ```
//!
//! # Design Decisions
//! - The composer never looks at module fields; modules are opaque
//! - A missing namespace is not an error, only a reason to skip
//! - Attachment order is fixed by the composer, not by the modules

pub mod bot_detector;
pub mod scripting;
pub mod security_headers;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::Span;

use crate::config::ExtraConfig;
use crate::engine::EngineBuilder;

pub use bot_detector::BotDetector;
pub use scripting::Scripting;
pub use security_headers::SecurityHeaders;

/// Why a capability did not attach.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// The module's namespace is absent. Expected; skipped silently.
    #[error("no config present for the module")]
    NotConfigured,

    /// The namespace is present but does not decode to a valid config.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The config is valid but the module could not be initialized.
    #[error("initialization failed: {0}")]
    InitFailed(String),
}

/// An optional request-processing behaviour attached to the engine.
pub trait Capability: Send + Sync {
    /// Module name used in logs.
    fn name(&self) -> &'static str;

    /// Namespace key of the module in `extra_config`.
    fn namespace(&self) -> &'static str;

    /// Decode the module config and register its interceptor on `engine`.
    fn attach(
        &self,
        extra: &ExtraConfig,
        engine: &mut EngineBuilder,
        logger: &Span,
    ) -> Result<(), AttachError>;
}

/// Decode the blob stored under `namespace`.
///
/// An absent or `null` namespace is [`AttachError::NotConfigured`].
pub fn decode<T: DeserializeOwned>(extra: &ExtraConfig, namespace: &str) -> Result<T, AttachError> {
    match extra.section(namespace) {
        None | Some(Value::Null) => Err(AttachError::NotConfigured),
        Some(section) => {
            T::deserialize(section).map_err(|e| AttachError::InvalidConfig(e.to_string()))
        }
    }
}

/// The builtin modules, in attachment order.
pub fn builtin() -> Vec<Box<dyn Capability>> {
    vec![
        Box::new(SecurityHeaders),
        Box::new(Scripting),
        Box::new(BotDetector),
    ]
}
