//! API gateway engine bootstrap.
//!
//! Composes the request-handling engine: a base router wrapped, in a fixed
//! order, by tracing, fallback responses and the optional capability modules
//! (security headers, scripting hooks, bot detection).

pub mod capability;
pub mod config;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use engine::{new_engine, Engine, EngineError, EngineFactory, EngineOptions, GatewayEngineFactory};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
