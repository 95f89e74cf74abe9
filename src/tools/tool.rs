//! Tool runtime trait
//!
//! Server-side tools are executed through this collaborator. Client-side
//! tools are never executed here: the turn suspends until the caller
//! supplies their results.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentsResult;
use crate::llm::{ToolCall, ToolResponse};

/// Result of executing a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    /// The output of the tool
    pub content: String,
    /// Set when the tool failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ToolInvocationResult {
    /// Create a successful tool result
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error_message: None,
        }
    }

    /// Create an error tool result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            error_message: Some(message.into()),
        }
    }

    /// Convert into the response recorded for `call`
    pub fn into_response(self, call: &ToolCall) -> ToolResponse {
        match self.error_message {
            Some(message) => ToolResponse::error(&call.call_id, &call.tool_name, message),
            None => ToolResponse::success(&call.call_id, &call.tool_name, self.content),
        }
    }
}

/// Trait for the tool-execution collaborator
#[async_trait]
pub trait ToolRuntime: Send + Sync {
    /// Execute `tool_name` with `arguments`
    async fn invoke_tool(&self, tool_name: &str, arguments: &Value)
        -> AgentsResult<ToolInvocationResult>;
}
