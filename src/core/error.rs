//! Error types for agents, sessions and turns

use thiserror::Error;

use crate::kvstore::StorageError;

/// Errors that can occur managing agents, sessions and turns
#[derive(Error, Debug)]
pub enum AgentsError {
    /// An agent, session, turn or step is absent
    #[error("{what} not found: {key}")]
    NotFound {
        /// Kind of entity ("Agent", "Session", ...)
        what: &'static str,
        /// Storage key or identifier that was looked up
        key: String,
    },

    /// A stored record failed to parse
    #[error("Malformed record at {key}: {reason}")]
    Malformed {
        /// Storage key of the record
        key: String,
        /// Parse failure
        reason: String,
    },

    /// The requested mode is not supported
    #[error("Not implemented: {0}")]
    Unsupported(String),

    /// The storage backend could not be built at startup
    #[error("Fatal backend error: {0}")]
    BackendFatal(String),

    /// An identifier cannot be used inside a storage key
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// A request failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A resume request named a turn that is not waiting for tool results
    #[error("Turn {turn_id} is not awaiting input (status: {status})")]
    TurnNotAwaiting {
        /// The turn that was named
        turn_id: String,
        /// Its current status
        status: String,
    },

    /// An inference, safety, retrieval or tool collaborator failed
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Storage backend error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentsError {
    /// Create a not-found error naming the missing key
    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        AgentsError::NotFound {
            what,
            key: key.into(),
        }
    }

    /// Create a malformed-record error
    pub fn malformed(key: impl Into<String>, reason: impl ToString) -> Self {
        AgentsError::Malformed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a collaborator error
    pub fn collaborator(msg: impl ToString) -> Self {
        AgentsError::Collaborator(msg.to_string())
    }

    /// Whether this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AgentsError::NotFound { .. })
    }
}

/// Result type alias for agents operations
pub type AgentsResult<T> = Result<T, AgentsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentsError::not_found("Agent", "agent:abc123");
        assert_eq!(err.to_string(), "Agent not found: agent:abc123");
        assert!(err.is_not_found());

        let err = AgentsError::Unsupported("Non-streaming agent turns not yet implemented".into());
        assert_eq!(
            err.to_string(),
            "Not implemented: Non-streaming agent turns not yet implemented"
        );
    }

    #[test]
    fn test_error_from_storage() {
        let err: AgentsError = StorageError::Conflict("agent_ids".into()).into();
        assert!(matches!(err, AgentsError::Storage(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AgentsError = json_err.into();
        assert!(matches!(err, AgentsError::Serialization(_)));
    }
}
