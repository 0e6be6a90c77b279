//! Store-level errors and their mapping onto the control-plane taxonomy.

use mailgate_core::CoreError;
use thiserror::Error;

/// Result alias for repository and store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence-layer error.
///
/// Repositories only ever produce the I/O-ish variants; the not-found
/// and conflict variants are raised by the high-level store where the
/// domain contract requires them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool exhausted or broken.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A JSON column failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record absent where the contract requires presence.
    #[error("not found: {0}")]
    NotFound(String),

    /// Create against an existing identifier.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invariant violation inside the store itself.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// `true` for SQLITE_BUSY / SQLITE_LOCKED, the retryable class.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Sqlite(_)
            | StoreError::Pool(_)
            | StoreError::Serialization(_)
            | StoreError::Internal(_) => Self::StoreUnavailable(err.to_string()),
        }
    }
}
