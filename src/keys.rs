//! Key namespace over the flat key-value store
//!
//! ```text
//! agent:{agent_id}                             -> agent configuration
//! agent:{agent_id}:created_at                  -> creation timestamp
//! agent_ids                                    -> enumeration index (cache)
//! session:{agent_id}:{session_id}              -> session metadata
//! session:{agent_id}:{session_id}:{turn_id}    -> turn with its steps
//! ```
//!
//! Identifiers never contain `:`, so nesting depth is recoverable from a key.

use serde::de::DeserializeOwned;

use crate::core::{AgentsError, AgentsResult};

/// Key holding the JSON list of known agent ids
pub const AGENT_IDS_KEY: &str = "agent_ids";

/// Prefix shared by agent configuration and timestamp keys
pub const AGENT_PREFIX: &str = "agent:";

const SEPARATOR: char = ':';

/// `agent:{agent_id}`
pub fn agent_key(agent_id: &str) -> String {
    format!("{AGENT_PREFIX}{agent_id}")
}

/// `agent:{agent_id}:created_at`
pub fn agent_created_at_key(agent_id: &str) -> String {
    format!("{AGENT_PREFIX}{agent_id}:created_at")
}

/// `session:{agent_id}:` - every session and turn key of an agent
pub fn session_prefix(agent_id: &str) -> String {
    format!("session:{agent_id}:")
}

/// `session:{agent_id}:{session_id}`
pub fn session_key(agent_id: &str, session_id: &str) -> String {
    format!("session:{agent_id}:{session_id}")
}

/// `session:{agent_id}:{session_id}:` - every turn key of a session
pub fn turn_prefix(agent_id: &str, session_id: &str) -> String {
    format!("session:{agent_id}:{session_id}:")
}

/// `session:{agent_id}:{session_id}:{turn_id}`
pub fn turn_key(agent_id: &str, session_id: &str, turn_id: &str) -> String {
    format!("session:{agent_id}:{session_id}:{turn_id}")
}

/// Reject ids that would break the key hierarchy
pub fn validate_id(what: &str, id: &str) -> AgentsResult<()> {
    if id.is_empty() {
        return Err(AgentsError::InvalidId(format!("{what} id cannot be empty")));
    }
    if id.contains(SEPARATOR) {
        return Err(AgentsError::InvalidId(format!(
            "{what} id contains '{SEPARATOR}': {id:?}"
        )));
    }
    if id.chars().any(|c| c.is_control()) {
        return Err(AgentsError::InvalidId(format!(
            "{what} id contains control characters: {id:?}"
        )));
    }
    Ok(())
}

/// Parse the JSON record stored under `key`
pub fn decode_record<T: DeserializeOwned>(key: &str, raw: &str) -> AgentsResult<T> {
    serde_json::from_str(raw).map_err(|e| AgentsError::malformed(key, e))
}

/// Agent id of an `agent:{agent_id}` configuration key
///
/// Returns `None` for timestamp keys and anything else nested deeper.
pub fn parse_agent_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(AGENT_PREFIX)?;
    if rest.is_empty() || rest.contains(SEPARATOR) {
        return None;
    }
    Some(rest)
}

/// What a key under `session:{agent_id}:` refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKeyKind<'a> {
    /// Session metadata
    Session {
        /// Session id
        session_id: &'a str,
    },
    /// A turn record
    Turn {
        /// Owning session id
        session_id: &'a str,
        /// Turn id
        turn_id: &'a str,
    },
}

/// Classify a key by its depth below `session:{agent_id}:`
///
/// Keys outside the agent's namespace or nested deeper than a turn yield `None`.
pub fn classify_session_key<'a>(agent_id: &str, key: &'a str) -> Option<SessionKeyKind<'a>> {
    let rest = key
        .strip_prefix("session:")?
        .strip_prefix(agent_id)?
        .strip_prefix(SEPARATOR)?;

    let mut parts = rest.split(SEPARATOR);
    let session_id = parts.next().filter(|s| !s.is_empty())?;
    match (parts.next(), parts.next()) {
        (None, _) => Some(SessionKeyKind::Session { session_id }),
        (Some(turn_id), None) if !turn_id.is_empty() => Some(SessionKeyKind::Turn {
            session_id,
            turn_id,
        }),
        _ => None,
    }
}
