//! Durable single-file key-value store backed by SQLite
//!
//! One table, `kvstore(key TEXT PRIMARY KEY, value TEXT, expiration TEXT)`.
//! Every operation opens its own connection on the blocking pool and closes it
//! when done; no connection state is held between calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::api::{KvStore, StoreCapabilities};
use super::config::KvStoreType;
use super::error::StorageResult;

/// Default table name
const TABLE_NAME: &str = "kvstore";

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed key-value store
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    db_path: PathBuf,
    table_name: String,
}

impl SqliteKvStore {
    /// Create a store for the database file at `db_path`
    ///
    /// Call [`initialize`](Self::initialize) before use.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            table_name: TABLE_NAME.to_string(),
        }
    }

    /// Create a store and make sure its table exists
    pub async fn open(db_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self::new(db_path);
        store.initialize().await?;
        Ok(store)
    }

    /// Create the parent directory and the table if they don't exist
    pub async fn initialize(&self) -> StorageResult<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                key TEXT PRIMARY KEY,
                value TEXT,
                expiration TEXT
            )",
            self.table_name
        );
        self.with_connection(move |conn| {
            conn.execute(&sql, [])?;
            Ok(())
        })
        .await?;

        tracing::info!("[SqliteKvStore] Initialized at {:?}", self.db_path);
        Ok(())
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` with a fresh connection on the blocking pool
    async fn with_connection<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            f(&mut conn)
        })
        .await?
    }
}

/// Timestamps are stored in one fixed format so that text comparison orders them
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let sql = format!(
            "SELECT value FROM {} WHERE key = ?1 AND (expiration IS NULL OR expiration > ?2)",
            self.table_name
        );
        let key = key.to_string();
        let now = format_timestamp(Utc::now());
        self.with_connection(move |conn| {
            let value = conn
                .query_row(&sql, params![key, now], |row| row.get::<_, String>(0))
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (key, value, expiration) VALUES (?1, ?2, ?3)",
            self.table_name
        );
        let key = key.to_string();
        let value = value.to_string();
        let expiration = expiration.map(format_timestamp);
        self.with_connection(move |conn| {
            conn.execute(&sql, params![key, value, expiration])?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", self.table_name);
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.execute(&sql, params![key])?;
            Ok(())
        })
        .await
    }

    async fn range(&self, start_key: &str, end_key: &str) -> StorageResult<Vec<String>> {
        let sql = format!(
            "SELECT value FROM {} WHERE key >= ?1 AND key < ?2 \
             AND (expiration IS NULL OR expiration > ?3) ORDER BY key",
            self.table_name
        );
        let start_key = start_key.to_string();
        let end_key = end_key.to_string();
        let now = format_timestamp(Utc::now());
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![start_key, end_key, now], |row| {
                row.get::<_, String>(0)
            })?;
            let mut values = Vec::new();
            for row in rows {
                values.push(row?);
            }
            Ok(values)
        })
        .await
    }

    async fn list_keys(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let now = format_timestamp(Utc::now());
        let prefix = prefix.map(str::to_string);
        let table = self.table_name.clone();
        self.with_connection(move |conn| {
            let mut keys = Vec::new();
            match prefix {
                // substr keeps the match exact: LIKE would treat `_`/`%` as
                // wildcards and fold ASCII case
                Some(prefix) => {
                    let sql = format!(
                        "SELECT key FROM {table} WHERE substr(key, 1, length(?1)) = ?1 \
                         AND (expiration IS NULL OR expiration > ?2) ORDER BY key"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(params![prefix, now], |row| row.get::<_, String>(0))?;
                    for row in rows {
                        keys.push(row?);
                    }
                }
                None => {
                    let sql = format!(
                        "SELECT key FROM {table} WHERE expiration IS NULL OR expiration > ?1 \
                         ORDER BY key"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(params![now], |row| row.get::<_, String>(0))?;
                    for row in rows {
                        keys.push(row?);
                    }
                }
            }
            Ok(keys)
        })
        .await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> StorageResult<bool> {
        let select = format!(
            "SELECT value FROM {} WHERE key = ?1 AND (expiration IS NULL OR expiration > ?2)",
            self.table_name
        );
        let upsert = format!(
            "INSERT OR REPLACE INTO {} (key, value, expiration) VALUES (?1, ?2, NULL)",
            self.table_name
        );
        let key = key.to_string();
        let expected = expected.map(str::to_string);
        let value = value.to_string();
        let now = format_timestamp(Utc::now());
        self.with_connection(move |conn| {
            // IMMEDIATE takes the write lock up front so the read and the
            // write below see no interleaved writer
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = tx
                .query_row(&select, params![key, now], |row| row.get::<_, String>(0))
                .optional()?;
            if current != expected {
                return Ok(false);
            }
            tx.execute(&upsert, params![key, value])?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            cheap_enumeration: false,
            native_prefix_scan: true,
        }
    }

    fn kind(&self) -> KvStoreType {
        KvStoreType::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    async fn create_test_store() -> (SqliteKvStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteKvStore::open(temp_dir.path().join("nested/dir/kv.db"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_initialize_creates_parent_dirs() {
        let (store, _temp) = create_test_store().await;
        assert!(store.db_path().exists());

        // Initializing twice is fine
        store.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_is_upsert() {
        let (store, _temp) = create_test_store().await;

        store.set("agent:1", "first", None).await.unwrap();
        store.set("agent:1", "second", None).await.unwrap();
        assert_eq!(
            store.get("agent:1").await.unwrap(),
            Some("second".to_string())
        );

        store.delete("agent:1").await.unwrap();
        assert_eq!(store.get("agent:1").await.unwrap(), None);
        store.delete("agent:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_range_excludes_end_key() {
        let (store, _temp) = create_test_store().await;
        for k in ["s:1", "s:2", "s:3"] {
            store.set(k, k, None).await.unwrap();
        }

        let values = store.range("s:1", "s:3").await.unwrap();
        assert_eq!(values, vec!["s:1", "s:2"]);
    }

    #[tokio::test]
    async fn test_prefix_match_is_literal() {
        let (store, _temp) = create_test_store().await;
        store.set("session:a_b:1", "x", None).await.unwrap();
        store.set("session:aXb:1", "y", None).await.unwrap();
        store.set("SESSION:a_b:2", "z", None).await.unwrap();

        let keys = store.list_keys(Some("session:a_b:")).await.unwrap();
        assert_eq!(keys, vec!["session:a_b:1"]);

        let all = store.list_keys(None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_expiration() {
        let (store, _temp) = create_test_store().await;
        store
            .set("gone", "x", Some(Utc::now() - ChronoDuration::seconds(1)))
            .await
            .unwrap();
        store
            .set("kept", "y", Some(Utc::now() + ChronoDuration::hours(1)))
            .await
            .unwrap();

        assert_eq!(store.get("gone").await.unwrap(), None);
        assert_eq!(store.get("kept").await.unwrap(), Some("y".to_string()));
        assert_eq!(store.list_keys(None).await.unwrap(), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_compare_and_set() {
        let (store, _temp) = create_test_store().await;

        assert!(store.compare_and_set("agent_ids", None, "[\"a\"]").await.unwrap());
        assert!(!store.compare_and_set("agent_ids", None, "[\"b\"]").await.unwrap());
        assert!(store
            .compare_and_set("agent_ids", Some("[\"a\"]"), "[\"a\",\"b\"]")
            .await
            .unwrap());
        assert_eq!(
            store.get("agent_ids").await.unwrap(),
            Some("[\"a\",\"b\"]".to_string())
        );
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kv.db");

        let store = SqliteKvStore::open(&path).await.unwrap();
        store.set("agent:1", "{}", None).await.unwrap();
        drop(store);

        let reopened = SqliteKvStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("agent:1").await.unwrap(), Some("{}".to_string()));
    }
}
