//! Settings loading errors.

use thiserror::Error;

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors raised while loading or parsing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Config file could not be read.
    #[error("failed to read settings file {path}: {reason}")]
    Read {
        /// File path.
        path: String,
        /// OS error description.
        reason: String,
    },
    /// Config file is not valid JSON or does not match the schema.
    #[error("failed to parse settings file {path}: {reason}")]
    Parse {
        /// File path.
        path: String,
        /// Parser error description.
        reason: String,
    },
}
