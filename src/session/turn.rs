//! Turn and step records
//!
//! A turn is persisted as one JSON document holding its steps. Steps are only
//! ever appended, and a turn takes no more steps once it is completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::TurnStatus;
use crate::llm::{CompletionMessage, Message, ToolCall, ToolConfig, ToolResponse};
use crate::safety::SafetyViolation;
use crate::tools::AgentToolGroup;

/// Kind of a step, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    Inference,
    ToolExecution,
    ShieldCall,
    MemoryRetrieval,
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepType::Inference => "inference",
            StepType::ToolExecution => "tool_execution",
            StepType::ShieldCall => "shield_call",
            StepType::MemoryRetrieval => "memory_retrieval",
        };
        f.write_str(name)
    }
}

/// Payload of a step, tagged by `step_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum StepDetails {
    /// One inference call
    Inference {
        /// What the model returned
        model_response: CompletionMessage,
    },

    /// Tool calls and their responses, executed here or supplied by the client
    ToolExecution {
        tool_calls: Vec<ToolCall>,
        tool_responses: Vec<ToolResponse>,
    },

    /// One shield run
    ShieldCall {
        #[serde(default)]
        violation: Option<SafetyViolation>,
    },

    /// Documents retrieved into the turn's context
    MemoryRetrieval {
        vector_db_ids: Vec<String>,
        inserted_context: String,
    },
}

impl StepDetails {
    /// Kind of this step
    pub fn step_type(&self) -> StepType {
        match self {
            StepDetails::Inference { .. } => StepType::Inference,
            StepDetails::ToolExecution { .. } => StepType::ToolExecution,
            StepDetails::ShieldCall { .. } => StepType::ShieldCall,
            StepDetails::MemoryRetrieval { .. } => StepType::MemoryRetrieval,
        }
    }
}

/// A recorded unit of work within a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step_id: String,
    pub turn_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub details: StepDetails,
}

impl Step {
    /// Create a step that started at `started_at` and completes now
    pub fn new(turn_id: impl Into<String>, started_at: DateTime<Utc>, details: StepDetails) -> Self {
        Self {
            step_id: Uuid::new_v4().to_string(),
            turn_id: turn_id.into(),
            started_at,
            completed_at: Some(Utc::now()),
            details,
        }
    }

    /// Kind of this step
    pub fn step_type(&self) -> StepType {
        self.details.step_type()
    }
}

/// A turn: one exchange started by caller input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: String,
    pub session_id: String,

    /// Caller input that started the turn
    pub input_messages: Vec<Message>,

    /// Recorded steps, in order
    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default)]
    pub status: TurnStatus,

    /// Client tool calls the turn is waiting on; empty unless awaiting input
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_tool_calls: Vec<ToolCall>,

    /// Final assistant message, set on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_message: Option<CompletionMessage>,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Tool groups requested for this turn in place of the agent's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolgroups: Option<Vec<AgentToolGroup>>,

    /// Tool configuration requested for this turn in place of the agent's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
}

impl Turn {
    /// Create an in-progress turn with no steps
    pub fn new(
        turn_id: impl Into<String>,
        session_id: impl Into<String>,
        input_messages: Vec<Message>,
    ) -> Self {
        Self {
            turn_id: turn_id.into(),
            session_id: session_id.into(),
            input_messages,
            steps: Vec::new(),
            status: TurnStatus::InProgress,
            pending_tool_calls: Vec::new(),
            output_message: None,
            started_at: Utc::now(),
            completed_at: None,
            toolgroups: None,
            tool_config: None,
        }
    }

    /// Look up a step by id
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Append a step
    pub fn push_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Suspend waiting for the caller to answer `calls`
    pub fn await_input(&mut self, calls: Vec<ToolCall>) {
        self.status = TurnStatus::AwaitingInput;
        self.pending_tool_calls = calls;
    }

    /// Clear the pending calls and continue executing
    pub fn resume(&mut self) {
        self.status = TurnStatus::InProgress;
        self.pending_tool_calls.clear();
    }

    /// Complete with `output`
    pub fn complete(&mut self, output: CompletionMessage) {
        self.status = TurnStatus::Completed;
        self.pending_tool_calls.clear();
        self.output_message = Some(output);
        self.completed_at = Some(Utc::now());
    }

    /// The most recent model response, if any
    pub fn last_model_response(&self) -> Option<&CompletionMessage> {
        self.steps.iter().rev().find_map(|s| match &s.details {
            StepDetails::Inference { model_response } => Some(model_response),
            _ => None,
        })
    }

    /// Number of inference steps so far
    pub fn inference_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.step_type() == StepType::Inference)
            .count()
    }

    /// This turn's contribution to the conversation history
    ///
    /// Input messages come first, with retrieved context attached to the
    /// last user message, followed by the messages derived from each step:
    /// model responses as assistant messages and tool responses as tool
    /// messages. Shield steps contribute nothing.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = self.input_messages.clone();

        let retrieved = self.steps.iter().rev().find_map(|s| match &s.details {
            StepDetails::MemoryRetrieval {
                inserted_context, ..
            } => Some(inserted_context.clone()),
            _ => None,
        });
        if let Some(retrieved) = retrieved {
            let last_user = messages
                .iter_mut()
                .rev()
                .find(|m| matches!(m, Message::User { .. }));
            if let Some(Message::User { context, .. }) = last_user {
                *context = Some(retrieved);
            }
        }

        for step in &self.steps {
            match &step.details {
                StepDetails::Inference { model_response } => {
                    messages.push(Message::Assistant(model_response.clone()));
                }
                StepDetails::ToolExecution { tool_responses, .. } => {
                    messages.extend(tool_responses.iter().cloned().map(Message::Tool));
                }
                StepDetails::ShieldCall { .. } | StepDetails::MemoryRetrieval { .. } => {}
            }
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inference_step(turn_id: &str, text: &str) -> Step {
        Step::new(
            turn_id,
            Utc::now(),
            StepDetails::Inference {
                model_response: CompletionMessage::text(text),
            },
        )
    }

    #[test]
    fn test_step_serialization_is_flat() {
        let step = inference_step("t1", "hello");
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["step_type"], "inference");
        assert_eq!(value["turn_id"], "t1");
        assert_eq!(value["model_response"]["content"], "hello");

        let loaded: Step = serde_json::from_value(value).unwrap();
        assert_eq!(loaded, step);
    }

    #[test]
    fn test_turn_state_transitions() {
        let mut turn = Turn::new("t1", "s1", vec![Message::user("hi")]);
        assert_eq!(turn.status, TurnStatus::InProgress);

        turn.await_input(vec![ToolCall::new("c1", "get_location", json!({}))]);
        assert!(turn.status.is_waiting());
        assert_eq!(turn.pending_tool_calls.len(), 1);

        turn.resume();
        assert_eq!(turn.status, TurnStatus::InProgress);
        assert!(turn.pending_tool_calls.is_empty());

        turn.complete(CompletionMessage::text("done"));
        assert!(turn.status.is_terminal());
        assert!(turn.completed_at.is_some());
        assert_eq!(turn.output_message.unwrap().content, "done");
    }

    #[test]
    fn test_step_lookup() {
        let mut turn = Turn::new("t1", "s1", vec![Message::user("hi")]);
        let step = inference_step("t1", "hello");
        let step_id = step.step_id.clone();
        turn.push_step(step);

        assert_eq!(turn.step(&step_id).unwrap().step_type(), StepType::Inference);
        assert!(turn.step("missing").is_none());
        assert_eq!(turn.inference_count(), 1);
    }

    #[test]
    fn test_messages_follow_steps() {
        let mut turn = Turn::new("t1", "s1", vec![Message::user("where am I?")]);
        turn.push_step(Step::new(
            "t1",
            Utc::now(),
            StepDetails::MemoryRetrieval {
                vector_db_ids: vec!["s1-documents".into()],
                inserted_context: "You are in Paris.".into(),
            },
        ));
        let call = ToolCall::new("c1", "get_location", json!({}));
        turn.push_step(Step::new(
            "t1",
            Utc::now(),
            StepDetails::Inference {
                model_response: CompletionMessage::with_tool_calls("", vec![call.clone()]),
            },
        ));
        turn.push_step(Step::new(
            "t1",
            Utc::now(),
            StepDetails::ShieldCall { violation: None },
        ));
        turn.push_step(Step::new(
            "t1",
            Utc::now(),
            StepDetails::ToolExecution {
                tool_calls: vec![call],
                tool_responses: vec![ToolResponse::success("c1", "get_location", "Paris")],
            },
        ));

        let messages = turn.messages();
        let roles: Vec<_> = messages.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool"]);
        assert!(matches!(
            &messages[0],
            Message::User { context: Some(c), .. } if c == "You are in Paris."
        ));
        assert_eq!(
            turn.last_model_response().unwrap().tool_calls[0].call_id,
            "c1"
        );
    }

    #[test]
    fn test_turn_defaults_when_loading() {
        let turn: Turn = serde_json::from_value(json!({
            "turn_id": "t1",
            "session_id": "s1",
            "input_messages": [{"role": "user", "content": "hi"}],
            "started_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(turn.steps.is_empty());
        assert_eq!(turn.status, TurnStatus::InProgress);
        assert!(turn.output_message.is_none());
    }
}
