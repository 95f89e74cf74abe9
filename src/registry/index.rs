//! The agent enumeration index
//!
//! `agent_ids` holds a JSON list of agent ids. It is a cache: the agent
//! configuration keys are authoritative. Updates go through
//! `compare_and_set` so concurrent creates and deletes do not overwrite each
//! other's changes.

use crate::core::AgentsResult;
use crate::keys::{self, AGENT_IDS_KEY};
use crate::kvstore::{KvStore, StorageError};

/// Attempts before an index update gives up with `StorageError::Conflict`
pub const MAX_INDEX_RETRIES: usize = 20;

/// Read the index
///
/// A missing index is empty. A malformed index is logged and treated as empty.
pub async fn load_index(store: &dyn KvStore) -> AgentsResult<Vec<String>> {
    let raw = store.get(AGENT_IDS_KEY).await?;
    Ok(parse_index(raw.as_deref()))
}

fn parse_index(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match keys::decode_record::<Vec<String>>(AGENT_IDS_KEY, raw) {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!("[AgentIndex] Treating index as empty: {}", e);
            Vec::new()
        }
    }
}

/// Apply `edit` to the index and write it back atomically
///
/// `edit` returns whether it changed the list; nothing is written if not.
/// On a conflicting write the index is re-read and `edit` applied again.
pub async fn update_index<F>(store: &dyn KvStore, mut edit: F) -> AgentsResult<()>
where
    F: FnMut(&mut Vec<String>) -> bool + Send,
{
    for attempt in 1..=MAX_INDEX_RETRIES {
        let raw = store.get(AGENT_IDS_KEY).await?;
        let mut ids = parse_index(raw.as_deref());
        if !edit(&mut ids) {
            return Ok(());
        }

        let value = serde_json::to_string(&ids)?;
        if store
            .compare_and_set(AGENT_IDS_KEY, raw.as_deref(), &value)
            .await?
        {
            return Ok(());
        }

        tracing::debug!(
            "[AgentIndex] Concurrent update, retrying (attempt {}/{})",
            attempt,
            MAX_INDEX_RETRIES
        );
        tokio::task::yield_now().await;
    }

    Err(StorageError::Conflict(AGENT_IDS_KEY.to_string()).into())
}

/// Append `agent_id` unless already present
pub async fn add_agent_id(store: &dyn KvStore, agent_id: &str) -> AgentsResult<()> {
    update_index(store, |ids| {
        if ids.iter().any(|id| id == agent_id) {
            return false;
        }
        ids.push(agent_id.to_string());
        true
    })
    .await
}

/// Remove `agent_id` if present
pub async fn remove_agent_id(store: &dyn KvStore, agent_id: &str) -> AgentsResult<()> {
    update_index(store, |ids| {
        let before = ids.len();
        ids.retain(|id| id != agent_id);
        ids.len() != before
    })
    .await
}
