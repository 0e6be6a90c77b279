//! Control-plane error taxonomy.
//!
//! Every fallible operation across the workspace bottoms out in
//! [`CoreError`]. The variants map one-to-one onto HTTP status codes at
//! the server boundary (400 / 401 / 404 / 409 / 500 / 502), so the
//! store and domain layers never need to know about HTTP.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Unified control-plane error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input rejected before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation targeted a record that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Create targeted an identifier that already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No valid session. Checked before any other validation.
    #[error("unauthorized")]
    Unauthorized,

    /// Transient persistent-store failure. Never retried here; the
    /// caller owns any retry policy.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The external pipeline rejected or failed a delegated call.
    #[error("pipeline call failed: {0}")]
    Upstream(String),
}

impl CoreError {
    /// Stable machine-readable code for the HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Upstream(_) => "upstream_error",
        }
    }
}
