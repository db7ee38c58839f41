//! Fatal composition errors.

use thiserror::Error;

use crate::config::ValidationError;

/// Errors that prevent the base router from being built.
///
/// Capability problems never surface here; they are logged and the module
/// is left out.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid service configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    InvalidConfig(Vec<ValidationError>),

    #[error("endpoint `{endpoint}` conflicts with `{existing}`")]
    RouteConflict { endpoint: String, existing: String },
}
