//! HTTP server setup.
//!
//! # Responsibilities
//! - Obtain the engine from an [`EngineFactory`]
//! - Serve it on a bound listener
//! - Stop accepting on the shutdown signal and drain in-flight requests

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServiceConfig;
use crate::engine::{Engine, EngineError, EngineFactory, EngineOptions};

/// HTTP server for one gateway service.
pub struct GatewayServer {
    engine: Engine,
    config: Arc<ServiceConfig>,
}

impl GatewayServer {
    /// Compose the engine. Fails only on a malformed base router.
    pub fn new(
        factory: &dyn EngineFactory,
        config: ServiceConfig,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let engine = factory.new_engine(&config, options)?;
        Ok(Self {
            engine,
            config: Arc::new(config),
        })
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.name,
            capabilities = ?self.engine.capabilities(),
            "HTTP server starting"
        );

        axum::serve(listener, self.engine.into_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
