//! Core error types for focusloop-core.
//!
//! Most engine failures are recovered locally (logged and swallowed), so these
//! types mostly surface from the storage and configuration layers.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring an engine up on its on-disk store and config.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Byte store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by a [`ByteStore`](crate::storage::ByteStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Read or write against the backend failed
    #[error("Store operation failed: {0}")]
    Io(String),

    /// The backend is locked by another writer
    #[error("Store is locked")]
    Locked,
}

/// Errors raised while encoding or decoding the persisted background state.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The store could not be reached
    #[error("Persistence unreachable: {0}")]
    Io(#[from] StoreError),

    /// The stored payload is not a valid background state
    #[error("Corrupt background state: {0}")]
    Corrupt(String),

    /// The envelope carries a version this build does not understand
    #[error("Unsupported background state version {0}")]
    UnsupportedVersion(u32),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Failure reported by an external collaborator (tracker, rewards, notifier).
///
/// Collaborator calls are best-effort: the engine logs these and carries on.
#[derive(Error, Debug)]
#[error("{collaborator} failed: {message}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Locked
            }
            _ => StoreError::Io(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_wraps_layer_errors() {
        let err: CoreError = ConfigError::UnknownKey("cycle.nope".into()).into();
        assert!(matches!(err, CoreError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Unknown configuration key: cycle.nope"
        );

        let err: CoreError = StoreError::Locked.into();
        assert_eq!(err.to_string(), "Store error: Store is locked");
    }
}
