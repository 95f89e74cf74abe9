//! Agent registry
//!
//! Creates, reads, enumerates and deletes agents. Each agent is two records,
//! its configuration and its creation timestamp, plus an entry in the
//! enumeration index.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentConfig;
use crate::core::{AgentsError, AgentsResult};
use crate::keys::{self, AGENT_PREFIX};
use crate::kvstore::KvStore;

use super::index;

/// A registered agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub agent_config: AgentConfig,
    pub created_at: DateTime<Utc>,
}

/// Result of enumerating agents
#[derive(Debug, Clone, Default)]
pub struct AgentListing {
    /// Agents in index order
    pub data: Vec<Agent>,
    /// Malformed agent records that were skipped
    pub skipped: usize,
}

/// Agent registry over a key-value store
#[derive(Clone)]
pub struct AgentRegistry {
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("store", &self.store.kind())
            .finish()
    }
}

impl AgentRegistry {
    /// Create a registry backed by `store`
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Register a new agent and return its id
    ///
    /// The configuration is written before the index entry, so a crash in
    /// between leaves an agent that is readable but not enumerated.
    pub async fn create_agent(&self, config: AgentConfig) -> AgentsResult<String> {
        let agent_id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        self.store
            .set(&keys::agent_key(&agent_id), &serde_json::to_string(&config)?, None)
            .await?;
        self.store
            .set(&keys::agent_created_at_key(&agent_id), &created_at, None)
            .await?;
        index::add_agent_id(self.store.as_ref(), &agent_id).await?;

        tracing::info!(
            "[AgentRegistry] Created agent {} (model: {})",
            agent_id,
            config.model
        );
        Ok(agent_id)
    }

    /// Load an agent
    pub async fn get_agent(&self, agent_id: &str) -> AgentsResult<Agent> {
        keys::validate_id("Agent", agent_id)?;

        let key = keys::agent_key(agent_id);
        let raw = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| AgentsError::not_found("Agent", &key))?;
        let agent_config: AgentConfig = keys::decode_record(&key, &raw)?;

        let created_at = self.load_created_at(agent_id).await?;
        Ok(Agent {
            agent_id: agent_id.to_string(),
            agent_config,
            created_at,
        })
    }

    /// Enumerate agents
    ///
    /// Index entries whose configuration is gone are skipped silently.
    /// Malformed records are skipped and counted. When the store can
    /// enumerate keys cheaply, configurations missing from the index are
    /// found by scanning and the index is repaired.
    pub async fn list_agents(&self) -> AgentsResult<AgentListing> {
        let mut agent_ids = index::load_index(self.store.as_ref()).await?;

        if self.store.capabilities().cheap_enumeration {
            let missing = self.unindexed_agent_ids(&agent_ids).await?;
            if !missing.is_empty() {
                tracing::info!(
                    "[AgentRegistry] Found {} agents missing from the index",
                    missing.len()
                );
                agent_ids.extend(missing.iter().cloned());
                self.heal_index(missing).await;
            }
        }

        let mut listing = AgentListing::default();
        for agent_id in agent_ids {
            match self.get_agent(&agent_id).await {
                Ok(agent) => listing.data.push(agent),
                Err(AgentsError::NotFound { .. }) => {
                    tracing::debug!("[AgentRegistry] Index entry {} is stale", agent_id);
                }
                Err(e @ (AgentsError::Malformed { .. } | AgentsError::InvalidId(_))) => {
                    tracing::warn!("[AgentRegistry] Skipping agent {}: {}", agent_id, e);
                    listing.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(listing)
    }

    /// Delete an agent
    ///
    /// Idempotent. The agent's sessions and turns are left in place.
    pub async fn delete_agent(&self, agent_id: &str) -> AgentsResult<()> {
        keys::validate_id("Agent", agent_id)?;

        self.store.delete(&keys::agent_key(agent_id)).await?;
        self.store
            .delete(&keys::agent_created_at_key(agent_id))
            .await?;
        index::remove_agent_id(self.store.as_ref(), agent_id).await?;

        tracing::info!("[AgentRegistry] Deleted agent {}", agent_id);
        Ok(())
    }

    /// Read the enumeration index
    pub async fn load_index(&self) -> AgentsResult<Vec<String>> {
        index::load_index(self.store.as_ref()).await
    }

    /// Creation time of an agent, falling back to now if missing or unreadable
    async fn load_created_at(&self, agent_id: &str) -> AgentsResult<DateTime<Utc>> {
        let key = keys::agent_created_at_key(agent_id);
        let raw = self.store.get(&key).await?;
        match raw.as_deref().and_then(parse_timestamp) {
            Some(created_at) => Ok(created_at),
            None => {
                tracing::warn!(
                    "[AgentRegistry] No valid timestamp at {} ({:?}), using now",
                    key,
                    raw
                );
                Ok(Utc::now())
            }
        }
    }

    /// Ids of agent configurations not present in `indexed`
    async fn unindexed_agent_ids(&self, indexed: &[String]) -> AgentsResult<Vec<String>> {
        let known: HashSet<&str> = indexed.iter().map(String::as_str).collect();
        let keys = if self.store.capabilities().native_prefix_scan {
            self.store.list_keys(Some(AGENT_PREFIX)).await?
        } else {
            self.store.list_keys(None).await?
        };

        Ok(keys
            .iter()
            .filter_map(|k| keys::parse_agent_key(k))
            .filter(|id| !known.contains(id))
            .map(str::to_string)
            .collect())
    }

    /// Add `missing` to the stored index; failures are logged, not returned
    async fn heal_index(&self, missing: Vec<String>) {
        let result = index::update_index(self.store.as_ref(), |ids| {
            let before = ids.len();
            for id in &missing {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
            ids.len() != before
        })
        .await;

        if let Err(e) = result {
            tracing::warn!("[AgentRegistry] Failed to write repaired index: {}", e);
        }
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
