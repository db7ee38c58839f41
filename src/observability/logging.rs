//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem once per process
//! - Pick the log level from `RUST_LOG`, then the CLI, then the default
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Library code only emits events; only the binary installs a subscriber

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit level is given.
pub const DEFAULT_FILTER: &str = "gateway_engine=info,tower_http=info";

/// Build the env filter for the subscriber.
pub fn filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
        Some(level) => format!("gateway_engine={level},tower_http={level}").into(),
        None => DEFAULT_FILTER.into(),
    })
}

/// Install the global subscriber.
pub fn init(level: Option<&str>) {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
