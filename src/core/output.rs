//! Events streamed from a turn

use serde::{Deserialize, Serialize};

use crate::session::{Step, Turn};

/// Events yielded by a turn stream
///
/// Each event is yielded only after the state it describes has been written
/// to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Turn started (or resumed)
    TurnStart {
        /// Turn being executed
        turn_id: String,
    },

    /// A step was recorded
    StepComplete {
        /// The recorded step
        step: Step,
    },

    /// Turn suspended waiting for client tool results
    TurnAwaitingInput {
        /// The persisted turn, with `pending_tool_calls` set
        turn: Turn,
    },

    /// Turn completed
    TurnComplete {
        /// The persisted turn, with `output_message` set
        turn: Turn,
    },
}

impl TurnEvent {
    /// Check if this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnEvent::TurnAwaitingInput { .. } | TurnEvent::TurnComplete { .. }
        )
    }

    /// The turn carried by a terminal event
    pub fn turn(&self) -> Option<&Turn> {
        match self {
            TurnEvent::TurnAwaitingInput { turn } | TurnEvent::TurnComplete { turn } => Some(turn),
            _ => None,
        }
    }

    /// The step carried by a step event
    pub fn step(&self) -> Option<&Step> {
        match self {
            TurnEvent::StepComplete { step } => Some(step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    #[test]
    fn test_event_checks() {
        let start = TurnEvent::TurnStart {
            turn_id: "t1".into(),
        };
        assert!(!start.is_terminal());
        assert!(start.turn().is_none());

        let turn = Turn::new("t1", "s1", vec![Message::user("hi")]);
        let done = TurnEvent::TurnComplete { turn };
        assert!(done.is_terminal());
        assert_eq!(done.turn().map(|t| t.turn_id.as_str()), Some("t1"));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let value = serde_json::to_value(TurnEvent::TurnStart {
            turn_id: "t1".into(),
        })
        .unwrap();
        assert_eq!(value["event_type"], "turn_start");
        assert_eq!(value["turn_id"], "t1");
    }
}
