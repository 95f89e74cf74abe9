//! Key-value store error types

use thiserror::Error;

/// Errors raised by key-value store backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend rejected or failed an operation
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The backend could not be opened or reached
    #[error("Storage connection error: {0}")]
    Connection(String),

    /// The configured backend kind has no driver in this build
    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A compare-and-set loop gave up after repeated conflicting writes
    #[error("Conflicting concurrent writes to key: {0}")]
    Conflict(String),

    /// A blocking storage task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Task(String),

    /// IO error (creating database directories, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Task(err.to_string())
    }
}

/// Result type alias for key-value store operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::Conflict("agent_ids".into());
        assert_eq!(err.to_string(), "Conflicting concurrent writes to key: agent_ids");

        let err = StorageError::BackendUnavailable("redis".into());
        assert_eq!(err.to_string(), "Storage backend unavailable: redis");
    }

    #[test]
    fn test_error_from_sqlite() {
        let err: StorageError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
