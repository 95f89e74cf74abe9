//! Message and inference types shared by turns and the inference collaborator

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Messages
// ============================================================================

/// A message in a turn's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// User input
    User {
        /// Text content
        content: String,
        /// Retrieved context attached to this message
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },

    /// System instructions
    System {
        /// Text content
        content: String,
    },

    /// Model output
    Assistant(CompletionMessage),

    /// Result of a tool call
    Tool(ToolResponse),
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
            context: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a tool response message
    pub fn tool(response: ToolResponse) -> Self {
        Message::Tool(response)
    }

    /// Role name as serialized
    pub fn role(&self) -> &'static str {
        match self {
            Message::User { .. } => "user",
            Message::System { .. } => "system",
            Message::Assistant(_) => "assistant",
            Message::Tool(_) => "tool",
        }
    }

    /// Whether callers may send this as turn input
    pub fn is_turn_input(&self) -> bool {
        matches!(self, Message::User { .. } | Message::Tool(_))
    }
}

/// Why the model stopped producing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Finished its turn
    #[default]
    EndOfTurn,
    /// Finished a message but expects to continue (e.g. after tool calls)
    EndOfMessage,
    /// Hit the token limit
    OutOfTokens,
}

/// An assistant message produced by inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    /// Text content
    pub content: String,

    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: StopReason,

    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl CompletionMessage {
    /// Create a plain text completion that ends the turn
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stop_reason: StopReason::EndOfTurn,
            tool_calls: Vec::new(),
        }
    }

    /// Create a completion that requests tool calls
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            stop_reason: StopReason::EndOfMessage,
            tool_calls,
        }
    }

    /// Whether the model requested any tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ============================================================================
// Tools
// ============================================================================

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Id used to match the response to this call
    pub call_id: String,
    /// Name of the tool
    pub tool_name: String,
    /// Arguments as JSON
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Create a tool call
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// The result of a tool call, either executed here or supplied by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Id of the call this answers
    pub call_id: String,
    /// Name of the tool
    pub tool_name: String,
    /// Output of the tool
    pub content: String,
    /// Whether the tool failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResponse {
    /// Create a successful tool response
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool response
    pub fn error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: message.into(),
            is_error: true,
        }
    }
}

/// Tool definition offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON schema of the tool's arguments
    #[serde(default)]
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// How the model should use tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides
    #[default]
    Auto,
    /// Model must call a tool
    Required,
    /// Model must not call tools
    None,
}

/// Tool usage configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    /// How the model should use tools
    #[serde(default)]
    pub tool_choice: ToolChoice,
}

/// Sampling parameters passed through to inference
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One inference call made by the turn loop
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Model identifier from the agent config
    pub model: String,
    /// Full history, system instructions first
    pub messages: Vec<Message>,
    /// Tools the model may call
    pub tools: Vec<ToolDefinition>,
    /// Tool usage configuration
    pub tool_config: ToolConfig,
    /// Sampling parameters
    pub sampling_params: SamplingParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serialization_is_role_tagged() {
        let msg = Message::user("Hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "Hello"}));

        let assistant = Message::Assistant(CompletionMessage::with_tool_calls(
            "",
            vec![ToolCall::new("call_1", "get_weather", json!({"city": "Paris"}))],
        ));
        let value = serde_json::to_value(&assistant).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["stop_reason"], "end_of_message");
        assert_eq!(value["tool_calls"][0]["tool_name"], "get_weather");

        let loaded: Message = serde_json::from_value(value).unwrap();
        assert_eq!(loaded, assistant);
    }

    #[test]
    fn test_turn_input_roles() {
        assert!(Message::user("hi").is_turn_input());
        assert!(Message::tool(ToolResponse::success("c", "t", "ok")).is_turn_input());
        assert!(!Message::system("rules").is_turn_input());
        assert!(!Message::Assistant(CompletionMessage::text("hi")).is_turn_input());
    }

    #[test]
    fn test_tool_response_constructors() {
        let ok = ToolResponse::success("c1", "search", "found");
        assert!(!ok.is_error);

        let err = ToolResponse::error("c1", "search", "boom");
        assert!(err.is_error);
        assert_eq!(err.content, "boom");
    }
}
