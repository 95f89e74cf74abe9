//! Session view
//!
//! `Session` combines a session's metadata with its turns in creation order.
//! It is assembled on read and never stored as one record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::Message;

use super::metadata::SessionInfo;
use super::turn::Turn;

/// A session with its turns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub session_name: String,
    pub started_at: DateTime<Utc>,

    /// Turns in creation order
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl Session {
    /// Assemble a session from its metadata and turns
    ///
    /// Turns are sorted by `started_at`; ties keep their given order.
    pub fn from_parts(info: SessionInfo, mut turns: Vec<Turn>) -> Self {
        sort_turns(&mut turns);
        Self {
            session_id: info.session_id,
            session_name: info.session_name,
            started_at: info.started_at,
            turns,
        }
    }

    /// Keep only turns whose id is in `turn_ids`
    ///
    /// An empty list keeps every turn.
    pub fn retain_turns(&mut self, turn_ids: &[String]) {
        if turn_ids.is_empty() {
            return;
        }
        self.turns.retain(|t| turn_ids.contains(&t.turn_id));
    }

    /// Look up a turn by id
    pub fn turn(&self, turn_id: &str) -> Option<&Turn> {
        self.turns.iter().find(|t| t.turn_id == turn_id)
    }

    /// Conversation history across every turn, oldest first
    pub fn history(&self) -> Vec<Message> {
        self.turns.iter().flat_map(Turn::messages).collect()
    }
}

/// Sort turns into creation order
pub(crate) fn sort_turns(turns: &mut [Turn]) {
    turns.sort_by(|a, b| {
        a.started_at
            .cmp(&b.started_at)
            .then_with(|| a.turn_id.cmp(&b.turn_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn turn_at(turn_id: &str, offset_secs: i64) -> Turn {
        let mut turn = Turn::new(turn_id, "s1", vec![Message::user(turn_id)]);
        turn.started_at = Utc::now() + Duration::seconds(offset_secs);
        turn
    }

    #[test]
    fn test_turns_sorted_by_creation() {
        let info = SessionInfo::new("s");
        let session = Session::from_parts(info, vec![turn_at("t2", 10), turn_at("t1", 0)]);
        let ids: Vec<_> = session.turns.iter().map(|t| t.turn_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
    }

    #[test]
    fn test_retain_turns() {
        let info = SessionInfo::new("s");
        let mut session = Session::from_parts(info, vec![turn_at("t1", 0), turn_at("t2", 1)]);

        let mut unfiltered = session.clone();
        unfiltered.retain_turns(&[]);
        assert_eq!(unfiltered.turns.len(), 2);

        session.retain_turns(&["t1".to_string()]);
        assert_eq!(session.turns.len(), 1);
        assert!(session.turn("t1").is_some());
        assert!(session.turn("t2").is_none());
    }

    #[test]
    fn test_history_spans_turns() {
        let info = SessionInfo::new("s");
        let session = Session::from_parts(info, vec![turn_at("t1", 0), turn_at("t2", 1)]);
        let history = session.history();
        assert_eq!(history, vec![Message::user("t1"), Message::user("t2")]);
    }
}
