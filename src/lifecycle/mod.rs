//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Start telemetry → Compose engine → Bind listener
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain connections → Stop telemetry
//! ```
//!
//! # Design Decisions
//! - Ordered startup: telemetry before the engine, listener last
//! - Ordered shutdown: telemetry stops only after the server returned

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
