//! Engine composition subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceConfig + EngineOptions
//!     → factory.rs (stable entry point)
//!     → composer.rs (base router, tracing, fallbacks, capabilities)
//!     → builder.rs (ordered interceptors → Engine)
//!     → Engine (immutable, cloned into the server)
//! ```
//!
//! # Design Decisions
//! - Composition runs once, synchronously, before any traffic is served
//! - Only base router construction can fail; capabilities degrade
//! - The engine is read-only after composition; no locks on the hot path

pub mod builder;
pub mod composer;
pub mod error;
pub mod factory;
pub mod handler;

use std::sync::Arc;

use tracing::Span;

use crate::observability::Telemetry;

pub use builder::{Engine, EngineBuilder};
pub use composer::EngineComposer;
pub use error::EngineError;
pub use factory::{new_engine, EngineFactory, GatewayEngineFactory};
pub use handler::{EndpointHandler, HandlerFactory, StaticHandlerFactory};

/// Caller-supplied options for one engine instance.
#[derive(Clone)]
pub struct EngineOptions {
    /// Span that composition and module attachment log under.
    pub logger: Span,
    /// Telemetry scope the trace layer belongs to.
    pub telemetry: Telemetry,
    /// Produces the endpoint handlers.
    pub handler_factory: Arc<dyn HandlerFactory>,
}

impl EngineOptions {
    pub fn new(telemetry: Telemetry) -> Self {
        Self {
            logger: tracing::info_span!("engine", router = "axum"),
            telemetry,
            handler_factory: Arc::new(StaticHandlerFactory),
        }
    }

    pub fn with_logger(mut self, logger: Span) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_handler_factory(mut self, factory: Arc<dyn HandlerFactory>) -> Self {
        self.handler_factory = factory;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new(Telemetry::default())
    }
}

impl std::fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("logger", &self.logger)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}
