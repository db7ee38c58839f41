//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum::serve over the composed engine)
//!     → request.rs (request ID assigned and echoed)
//!     → routed endpoint, or fallback.rs for unmatched path / method
//!     → Send to client
//! ```

pub mod fallback;
pub mod request;
pub mod server;

pub use fallback::{FallbackConfig, FallbackKind, FallbackResponder};
pub use request::X_REQUEST_ID;
pub use server::GatewayServer;
