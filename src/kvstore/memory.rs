//! Volatile in-process key-value store
//!
//! Data lives in a `BTreeMap` behind a tokio `RwLock` and is lost when the
//! process exits. Used for tests and for agents that opt out of durable
//! session persistence.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::api::{is_live, KvStore, StoreCapabilities};
use super::config::KvStoreType;
use super::error::StorageResult;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expiration: Option<DateTime<Utc>>,
}

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<String, MemoryEntry>>,
}

impl InMemoryKvStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| is_live(e.expiration, now)).count()
    }

    /// Whether the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| is_live(e.expiration, now))
            .map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expiration,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn range(&self, start_key: &str, end_key: &str) -> StorageResult<Vec<String>> {
        if start_key >= end_key {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let entries = self.entries.read().await;
        Ok(entries
            .range::<str, _>((Bound::Included(start_key), Bound::Excluded(end_key)))
            .filter(|(_, e)| is_live(e.expiration, now))
            .map(|(_, e)| e.value.clone())
            .collect())
    }

    async fn list_keys(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        let live = entries.iter().filter(|(_, e)| is_live(e.expiration, now));
        Ok(match prefix {
            Some(prefix) => live
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, _)| k.clone())
                .collect(),
            None => live.map(|(k, _)| k.clone()).collect(),
        })
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> StorageResult<bool> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let current = entries
            .get(key)
            .filter(|e| is_live(e.expiration, now))
            .map(|e| e.value.as_str());
        if current != expected {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expiration: None,
            },
        );
        Ok(true)
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            cheap_enumeration: true,
            native_prefix_scan: true,
        }
    }

    fn kind(&self) -> KvStoreType {
        KvStoreType::Memory
    }
}
