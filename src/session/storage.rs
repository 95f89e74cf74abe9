//! Session and turn storage
//!
//! Reads and writes session metadata and turn records for one agent through
//! a key-value store.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::{AgentsError, AgentsResult};
use crate::keys::{self, SessionKeyKind};
use crate::kvstore::{prefix_end, KvStore};

use super::metadata::SessionInfo;
use super::session::{sort_turns, Session};
use super::turn::Turn;

/// Sessions of one agent, with the number of malformed records left out
#[derive(Debug, Clone, Default)]
pub struct SessionListing {
    /// Sessions, oldest first
    pub data: Vec<Session>,
    /// Malformed session or turn records that were skipped
    pub skipped: usize,
}

/// Session storage bound to one agent and one store
#[derive(Clone)]
pub struct SessionStorage {
    agent_id: String,
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("agent_id", &self.agent_id)
            .field("store", &self.store.kind())
            .finish()
    }
}

impl SessionStorage {
    /// Create session storage for `agent_id` backed by `store`
    pub fn new(agent_id: impl Into<String>, store: Arc<dyn KvStore>) -> Self {
        Self {
            agent_id: agent_id.into(),
            store,
        }
    }

    /// Agent this storage belongs to
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// The backing store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Create a session and persist its metadata
    pub async fn create_session(&self, name: &str) -> AgentsResult<String> {
        let info = SessionInfo::new(name);
        let key = keys::session_key(&self.agent_id, &info.session_id);
        self.store
            .set(&key, &serde_json::to_string(&info)?, None)
            .await?;

        tracing::info!(
            "[SessionStorage] Created session {} for agent {}",
            info.session_id,
            self.agent_id
        );
        Ok(info.session_id)
    }

    /// Load session metadata, or `None` if the session does not exist
    pub async fn get_session_info(&self, session_id: &str) -> AgentsResult<Option<SessionInfo>> {
        keys::validate_id("Session", session_id)?;
        let key = keys::session_key(&self.agent_id, session_id);
        match self.store.get(&key).await? {
            Some(raw) => Ok(Some(keys::decode_record(&key, &raw)?)),
            None => Ok(None),
        }
    }

    /// Write a turn record, replacing any previous version
    pub async fn save_turn(&self, turn: &Turn) -> AgentsResult<()> {
        keys::validate_id("Session", &turn.session_id)?;
        keys::validate_id("Turn", &turn.turn_id)?;
        let key = keys::turn_key(&self.agent_id, &turn.session_id, &turn.turn_id);
        self.store
            .set(&key, &serde_json::to_string(turn)?, None)
            .await?;

        tracing::debug!(
            "[SessionStorage] Saved turn {} ({} steps, {})",
            turn.turn_id,
            turn.steps.len(),
            turn.status
        );
        Ok(())
    }

    /// Load one turn
    pub async fn get_session_turn(&self, session_id: &str, turn_id: &str) -> AgentsResult<Turn> {
        keys::validate_id("Session", session_id)?;
        keys::validate_id("Turn", turn_id)?;
        let key = keys::turn_key(&self.agent_id, session_id, turn_id);
        let raw = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| AgentsError::not_found("Turn", &key))?;
        keys::decode_record(&key, &raw)
    }

    /// All turns of a session in creation order
    ///
    /// Malformed turn records are logged and left out.
    pub async fn get_session_turns(&self, session_id: &str) -> AgentsResult<Vec<Turn>> {
        keys::validate_id("Session", session_id)?;
        let (turns, _skipped) = self.load_turns(session_id).await?;
        Ok(turns)
    }

    /// Load a session with its turns
    ///
    /// With `turn_ids`, only the listed turns are kept; an empty list keeps all.
    pub async fn get_session(
        &self,
        session_id: &str,
        turn_ids: Option<&[String]>,
    ) -> AgentsResult<Session> {
        let info = self.get_session_info(session_id).await?.ok_or_else(|| {
            AgentsError::not_found("Session", keys::session_key(&self.agent_id, session_id))
        })?;

        let turns = self.get_session_turns(session_id).await?;
        let mut session = Session::from_parts(info, turns);
        if let Some(ids) = turn_ids {
            session.retain_turns(ids);
        }
        Ok(session)
    }

    /// Delete a session's metadata
    ///
    /// Its turn records stay in the store.
    pub async fn delete_session(&self, session_id: &str) -> AgentsResult<()> {
        keys::validate_id("Session", session_id)?;
        self.store
            .delete(&keys::session_key(&self.agent_id, session_id))
            .await?;

        tracing::info!(
            "[SessionStorage] Deleted session {} of agent {}",
            session_id,
            self.agent_id
        );
        Ok(())
    }

    /// All sessions of this agent with their turns
    ///
    /// Turns whose session metadata is gone are not reported.
    pub async fn list_sessions(&self) -> AgentsResult<SessionListing> {
        let prefix = keys::session_prefix(&self.agent_id);
        let all_keys = if self.store.capabilities().native_prefix_scan {
            self.store.list_keys(Some(&prefix)).await?
        } else {
            tracing::debug!(
                "[SessionStorage] {} has no prefix scan, filtering all keys",
                self.store.kind()
            );
            self.store
                .list_keys(None)
                .await?
                .into_iter()
                .filter(|k| k.starts_with(&prefix))
                .collect()
        };

        let mut session_ids = BTreeSet::new();
        let mut turn_sessions = BTreeSet::new();
        for key in &all_keys {
            match keys::classify_session_key(&self.agent_id, key) {
                Some(SessionKeyKind::Session { session_id }) => {
                    session_ids.insert(session_id.to_string());
                }
                Some(SessionKeyKind::Turn { session_id, .. }) => {
                    turn_sessions.insert(session_id.to_string());
                }
                None => {}
            }
        }

        let orphaned = turn_sessions.difference(&session_ids).count();
        if orphaned > 0 {
            tracing::debug!(
                "[SessionStorage] {} sessions of agent {} have turns but no metadata",
                orphaned,
                self.agent_id
            );
        }

        let mut listing = SessionListing::default();
        for session_id in session_ids {
            let key = keys::session_key(&self.agent_id, &session_id);
            let info: SessionInfo = match self.store.get(&key).await? {
                Some(raw) => match keys::decode_record(&key, &raw) {
                    Ok(info) => info,
                    Err(e) => {
                        tracing::warn!("[SessionStorage] Skipping session: {}", e);
                        listing.skipped += 1;
                        continue;
                    }
                },
                // Deleted since the key listing
                None => continue,
            };

            let (turns, skipped) = self.load_turns(&session_id).await?;
            listing.skipped += skipped;
            listing.data.push(Session::from_parts(info, turns));
        }

        listing.data.sort_by_key(|s| s.started_at);
        Ok(listing)
    }

    /// Turns of a session in creation order, and the number of malformed records skipped
    async fn load_turns(&self, session_id: &str) -> AgentsResult<(Vec<Turn>, usize)> {
        let start = keys::turn_prefix(&self.agent_id, session_id);
        let values = self.store.range(&start, &prefix_end(&start)).await?;

        let mut turns = Vec::with_capacity(values.len());
        let mut skipped = 0;
        for raw in values {
            match keys::decode_record::<Turn>(&start, &raw) {
                Ok(turn) => turns.push(turn),
                Err(e) => {
                    tracing::warn!("[SessionStorage] Skipping turn record: {}", e);
                    skipped += 1;
                }
            }
        }

        sort_turns(&mut turns);
        Ok((turns, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use tempfile::TempDir;

    use crate::kvstore::{
        InMemoryKvStore, KvStoreType, SqliteKvStore, StorageResult, StoreCapabilities,
    };
    use crate::llm::Message;

    fn create_test_storage() -> (SessionStorage, Arc<InMemoryKvStore>) {
        let store = Arc::new(InMemoryKvStore::new());
        let storage = SessionStorage::new("agent-1", store.clone());
        (storage, store)
    }

    fn new_turn(session_id: &str, turn_id: &str, offset_secs: i64) -> Turn {
        let mut turn = Turn::new(turn_id, session_id, vec![Message::user(turn_id)]);
        turn.started_at = Utc::now() + Duration::seconds(offset_secs);
        turn
    }

    /// Wraps the in-memory store but reports no native prefix scan
    struct FullScanStore(InMemoryKvStore);

    #[async_trait]
    impl KvStore for FullScanStore {
        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.0.get(key).await
        }
        async fn set(
            &self,
            key: &str,
            value: &str,
            expiration: Option<DateTime<Utc>>,
        ) -> StorageResult<()> {
            self.0.set(key, value, expiration).await
        }
        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.0.delete(key).await
        }
        async fn range(&self, start_key: &str, end_key: &str) -> StorageResult<Vec<String>> {
            self.0.range(start_key, end_key).await
        }
        async fn list_keys(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
            assert!(prefix.is_none(), "prefix listing used without capability");
            self.0.list_keys(None).await
        }
        async fn compare_and_set(
            &self,
            key: &str,
            expected: Option<&str>,
            value: &str,
        ) -> StorageResult<bool> {
            self.0.compare_and_set(key, expected, value).await
        }
        fn capabilities(&self) -> StoreCapabilities {
            StoreCapabilities::point_lookup_only()
        }
        fn kind(&self) -> KvStoreType {
            KvStoreType::Redis
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (storage, _store) = create_test_storage();

        let session_id = storage.create_session("planning").await.unwrap();
        let info = storage.get_session_info(&session_id).await.unwrap().unwrap();
        assert_eq!(info.session_name, "planning");

        let session = storage.get_session(&session_id, None).await.unwrap();
        assert_eq!(session.session_id, session_id);
        assert!(session.turns.is_empty());
    }

    #[tokio::test]
    async fn test_missing_session() {
        let (storage, _store) = create_test_storage();

        assert!(storage.get_session_info("nope").await.unwrap().is_none());
        let err = storage.get_session("nope", None).await.unwrap_err();
        assert!(matches!(
            err,
            AgentsError::NotFound { ref key, .. } if key == "session:agent-1:nope"
        ));
    }

    #[tokio::test]
    async fn test_invalid_session_id() {
        let (storage, _store) = create_test_storage();
        let err = storage.get_session_info("a:b").await.unwrap_err();
        assert!(matches!(err, AgentsError::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_turns_in_creation_order_and_filtered() {
        let (storage, _store) = create_test_storage();
        let session_id = storage.create_session("s").await.unwrap();

        // ids chosen so key order disagrees with creation order
        storage.save_turn(&new_turn(&session_id, "zzz", 0)).await.unwrap();
        storage.save_turn(&new_turn(&session_id, "aaa", 5)).await.unwrap();

        let turns = storage.get_session_turns(&session_id).await.unwrap();
        let ids: Vec<_> = turns.iter().map(|t| t.turn_id.as_str()).collect();
        assert_eq!(ids, vec!["zzz", "aaa"]);

        let filtered = storage
            .get_session(&session_id, Some(&["zzz".to_string()]))
            .await
            .unwrap();
        assert_eq!(filtered.turns.len(), 1);
        assert_eq!(filtered.turns[0].turn_id, "zzz");

        let all_ids = vec!["zzz".to_string(), "aaa".to_string()];
        let full = storage.get_session(&session_id, Some(&all_ids)).await.unwrap();
        let unfiltered = storage.get_session(&session_id, None).await.unwrap();
        let empty_filter = storage.get_session(&session_id, Some(&[])).await.unwrap();
        assert_eq!(full, unfiltered);
        assert_eq!(empty_filter, unfiltered);
    }

    #[tokio::test]
    async fn test_get_session_turn() {
        let (storage, _store) = create_test_storage();
        let session_id = storage.create_session("s").await.unwrap();
        let turn = new_turn(&session_id, "t1", 0);
        storage.save_turn(&turn).await.unwrap();

        assert_eq!(storage.get_session_turn(&session_id, "t1").await.unwrap(), turn);
        assert!(storage
            .get_session_turn(&session_id, "t2")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_turn_is_skipped() {
        let (storage, store) = create_test_storage();
        let session_id = storage.create_session("s").await.unwrap();
        storage.save_turn(&new_turn(&session_id, "t1", 0)).await.unwrap();
        store
            .set(&keys::turn_key("agent-1", &session_id, "bad"), "{oops", None)
            .await
            .unwrap();

        assert_eq!(storage.get_session_turns(&session_id).await.unwrap().len(), 1);
        assert!(matches!(
            storage.get_session_turn(&session_id, "bad").await,
            Err(AgentsError::Malformed { .. })
        ));

        let listing = storage.list_sessions().await.unwrap();
        assert_eq!(listing.data.len(), 1);
        assert_eq!(listing.skipped, 1);
    }

    #[tokio::test]
    async fn test_delete_session_keeps_turns() {
        let (storage, store) = create_test_storage();
        let session_id = storage.create_session("s").await.unwrap();
        storage.save_turn(&new_turn(&session_id, "t1", 0)).await.unwrap();

        storage.delete_session(&session_id).await.unwrap();
        assert!(storage.get_session(&session_id, None).await.unwrap_err().is_not_found());
        assert!(store
            .get(&keys::turn_key("agent-1", &session_id, "t1"))
            .await
            .unwrap()
            .is_some());

        // orphaned turns are not listed
        assert!(storage.list_sessions().await.unwrap().data.is_empty());
    }

    #[tokio::test]
    async fn test_list_sessions_scoped_to_agent() {
        let store = Arc::new(InMemoryKvStore::new());
        let storage = SessionStorage::new("a1", store.clone());
        let other = SessionStorage::new("a10", store.clone());

        let s1 = storage.create_session("first").await.unwrap();
        let s2 = storage.create_session("second").await.unwrap();
        other.create_session("other").await.unwrap();
        storage.save_turn(&new_turn(&s1, "t1", 0)).await.unwrap();
        storage.save_turn(&new_turn(&s1, "t2", 1)).await.unwrap();

        let listing = storage.list_sessions().await.unwrap();
        assert_eq!(listing.skipped, 0);
        assert_eq!(listing.data.len(), 2);
        let first = listing.data.iter().find(|s| s.session_id == s1).unwrap();
        assert_eq!(first.turns.len(), 2);
        let second = listing.data.iter().find(|s| s.session_id == s2).unwrap();
        assert!(second.turns.is_empty());
    }

    #[tokio::test]
    async fn test_list_sessions_without_prefix_scan() {
        let storage = SessionStorage::new("a1", Arc::new(FullScanStore(InMemoryKvStore::new())));
        let session_id = storage.create_session("s").await.unwrap();
        storage.save_turn(&new_turn(&session_id, "t1", 0)).await.unwrap();

        let listing = storage.list_sessions().await.unwrap();
        assert_eq!(listing.data.len(), 1);
        assert_eq!(listing.data[0].turns.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_session_storage() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteKvStore::open(temp_dir.path().join("kv.db")).await.unwrap();
        let storage = SessionStorage::new("a1", Arc::new(store));

        let session_id = storage.create_session("durable").await.unwrap();
        storage.save_turn(&new_turn(&session_id, "t1", 0)).await.unwrap();
        storage.save_turn(&new_turn(&session_id, "t2", 1)).await.unwrap();

        let session = storage.get_session(&session_id, None).await.unwrap();
        let ids: Vec<_> = session.turns.iter().map(|t| t.turn_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(storage.list_sessions().await.unwrap().data.len(), 1);
    }
}
