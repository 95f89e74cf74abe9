//! Safety shield collaborator
//!
//! Shields named in an agent's `input_shields` / `output_shields` are run
//! against the turn's messages. A violation at `Error` level ends the turn.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentsResult;
use crate::llm::Message;

/// Severity of a shield violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationLevel {
    Info,
    Warn,
    Error,
}

/// A violation reported by a shield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyViolation {
    /// Severity
    pub violation_level: ViolationLevel,
    /// Message to show the user in place of the model's output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    /// Shield-specific details
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl SafetyViolation {
    /// Create a violation with a user-facing message
    pub fn new(level: ViolationLevel, user_message: impl Into<String>) -> Self {
        Self {
            violation_level: level,
            user_message: Some(user_message.into()),
            metadata: HashMap::new(),
        }
    }

    /// Whether this violation ends the turn
    pub fn is_blocking(&self) -> bool {
        self.violation_level == ViolationLevel::Error
    }
}

/// Result of running one shield
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunShieldResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<SafetyViolation>,
}

impl RunShieldResponse {
    /// A response with no violation
    pub fn pass() -> Self {
        Self::default()
    }

    /// A response carrying `violation`
    pub fn violation(violation: SafetyViolation) -> Self {
        Self {
            violation: Some(violation),
        }
    }
}

/// Trait for the safety collaborator
#[async_trait]
pub trait SafetyProvider: Send + Sync {
    /// Run `shield_id` over `messages`
    async fn run_shield(&self, shield_id: &str, messages: &[Message])
        -> AgentsResult<RunShieldResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_violation_blocking() {
        assert!(SafetyViolation::new(ViolationLevel::Error, "no").is_blocking());
        assert!(!SafetyViolation::new(ViolationLevel::Warn, "hmm").is_blocking());
    }

    #[test]
    fn test_response_serialization() {
        let value = serde_json::to_value(RunShieldResponse::pass()).unwrap();
        assert_eq!(value, json!({}));

        let response = RunShieldResponse::violation(SafetyViolation::new(
            ViolationLevel::Error,
            "I can't help with that.",
        ));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["violation"]["violation_level"], "error");
    }
}
