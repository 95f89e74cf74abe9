//! Turn request types

use serde::{Deserialize, Serialize};

use crate::core::{AgentsError, AgentsResult};
use crate::llm::{Message, ToolConfig, ToolResponse};
use crate::tools::AgentToolGroup;
use crate::vector_io::Document;

fn default_stream() -> bool {
    true
}

/// Request to start a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTurnCreateRequest {
    pub agent_id: String,
    pub session_id: String,

    /// Input messages; `user` or `tool` only
    pub messages: Vec<Message>,

    /// Only streaming turns are supported
    #[serde(default = "default_stream")]
    pub stream: bool,

    /// Documents to retrieve context from
    #[serde(default)]
    pub documents: Vec<Document>,

    /// Tool groups for this turn in place of the agent's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolgroups: Option<Vec<AgentToolGroup>>,

    /// Tool configuration for this turn in place of the agent's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
}

impl AgentTurnCreateRequest {
    /// Create a streaming turn request
    pub fn new(
        agent_id: impl Into<String>,
        session_id: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            messages,
            stream: true,
            documents: Vec::new(),
            toolgroups: None,
            tool_config: None,
        }
    }

    /// Set whether the turn is streamed
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Attach a document
    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.push(document);
        self
    }

    /// Use these tool groups for the turn
    pub fn with_toolgroups(mut self, toolgroups: Vec<AgentToolGroup>) -> Self {
        self.toolgroups = Some(toolgroups);
        self
    }

    /// Fail unless the turn is streamed
    pub fn require_stream(&self) -> AgentsResult<()> {
        require_stream(self.stream)
    }

    /// Check the input messages
    pub fn validate_messages(&self) -> AgentsResult<()> {
        if self.messages.is_empty() {
            return Err(AgentsError::InvalidRequest(
                "turn requires at least one input message".to_string(),
            ));
        }
        if let Some(message) = self.messages.iter().find(|m| !m.is_turn_input()) {
            return Err(AgentsError::InvalidRequest(format!(
                "turn input cannot contain {} messages",
                message.role()
            )));
        }
        Ok(())
    }
}

/// Request to resume a turn that is waiting for client tool results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTurnResumeRequest {
    pub agent_id: String,
    pub session_id: String,
    pub turn_id: String,

    /// One response per pending tool call
    pub tool_responses: Vec<ToolResponse>,

    /// Only streaming turns are supported
    #[serde(default = "default_stream")]
    pub stream: bool,
}

impl AgentTurnResumeRequest {
    /// Create a streaming resume request
    pub fn new(
        agent_id: impl Into<String>,
        session_id: impl Into<String>,
        turn_id: impl Into<String>,
        tool_responses: Vec<ToolResponse>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            turn_id: turn_id.into(),
            tool_responses,
            stream: true,
        }
    }

    /// Set whether the turn is streamed
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Fail unless the turn is streamed
    pub fn require_stream(&self) -> AgentsResult<()> {
        require_stream(self.stream)
    }
}

fn require_stream(stream: bool) -> AgentsResult<()> {
    if stream {
        Ok(())
    } else {
        Err(AgentsError::Unsupported(
            "Non-streaming agent turns not yet implemented".to_string(),
        ))
    }
}
