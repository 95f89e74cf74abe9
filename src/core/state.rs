//! Turn state types

use serde::{Deserialize, Serialize};

/// Persisted status of a turn
///
/// `InProgress` is also what a turn is left in when its stream is dropped or
/// a collaborator fails; the last persisted step is the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Turn is executing
    #[default]
    InProgress,

    /// Turn is suspended until the caller supplies client tool results
    AwaitingInput,

    /// Turn has an output message and takes no more steps
    Completed,
}

impl TurnStatus {
    /// Check if the turn is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnStatus::Completed)
    }

    /// Check if the turn is waiting for external input
    pub fn is_waiting(&self) -> bool {
        matches!(self, TurnStatus::AwaitingInput)
    }

    /// Serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStatus::InProgress => "in_progress",
            TurnStatus::AwaitingInput => "awaiting_input",
            TurnStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
