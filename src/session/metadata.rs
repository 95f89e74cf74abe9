//! Session metadata types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for a session
///
/// Persisted under `session:{agent_id}:{session_id}`, separately from the
/// session's turns. Never changed after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Unique session ID
    pub session_id: String,

    /// Human-readable name given at creation
    pub session_name: String,

    /// When the session was created
    pub started_at: DateTime<Utc>,
}

impl SessionInfo {
    /// Create metadata for a new session with a fresh id
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            session_name: session_name.into(),
            started_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_info_creation() {
        let a = SessionInfo::new("planning");
        let b = SessionInfo::new("planning");
        assert_eq!(a.session_name, "planning");
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_session_info_serialization() {
        let info = SessionInfo::new("planning");
        let json = serde_json::to_string(&info).unwrap();
        let loaded: SessionInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, info);
    }
}
