//! Stable construction entry point.

use crate::config::ServiceConfig;
use crate::engine::builder::Engine;
use crate::engine::composer::EngineComposer;
use crate::engine::error::EngineError;
use crate::engine::EngineOptions;

/// Creates ready-to-serve engines.
///
/// The server only depends on this trait, so the engine implementation can
/// be swapped without touching it.
pub trait EngineFactory: Send + Sync {
    fn new_engine(
        &self,
        config: &ServiceConfig,
        options: EngineOptions,
    ) -> Result<Engine, EngineError>;
}

/// The default engine: axum router with the builtin capabilities.
#[derive(Default)]
pub struct GatewayEngineFactory {
    composer: EngineComposer,
}

impl GatewayEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_composer(composer: EngineComposer) -> Self {
        Self { composer }
    }
}

impl EngineFactory for GatewayEngineFactory {
    fn new_engine(
        &self,
        config: &ServiceConfig,
        options: EngineOptions,
    ) -> Result<Engine, EngineError> {
        self.composer.compose(config, &options)
    }
}

/// Build an engine with the default factory.
pub fn new_engine(config: &ServiceConfig, options: EngineOptions) -> Result<Engine, EngineError> {
    GatewayEngineFactory::new().new_engine(config, options)
}
