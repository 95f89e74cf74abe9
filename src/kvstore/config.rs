//! Key-value backend selection
//!
//! A backend is chosen by the `type` tag of [`KvStoreConfig`]. Only the
//! volatile and durable single-file backends ship with this crate; the
//! network kinds are recognised so that configs stay portable, but building
//! one fails at startup.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::api::KvStore;
use super::error::{StorageError, StorageResult};
use super::memory::InMemoryKvStore;
use super::sqlite::SqliteKvStore;

/// Backend kinds a config may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvStoreType {
    /// Volatile in-process map
    Memory,
    /// Durable single-file SQLite database
    Sqlite,
    /// Relational network database
    Postgres,
    /// Document store
    Mongodb,
    /// Network cache
    Redis,
}

impl KvStoreType {
    /// The config tag for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            KvStoreType::Memory => "memory",
            KvStoreType::Sqlite => "sqlite",
            KvStoreType::Postgres => "postgres",
            KvStoreType::Mongodb => "mongodb",
            KvStoreType::Redis => "redis",
        }
    }
}

impl fmt::Display for KvStoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KvStoreType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(KvStoreType::Memory),
            "sqlite" => Ok(KvStoreType::Sqlite),
            "postgres" => Ok(KvStoreType::Postgres),
            "mongodb" => Ok(KvStoreType::Mongodb),
            "redis" => Ok(KvStoreType::Redis),
            other => Err(StorageError::BackendUnavailable(format!(
                "Unknown kvstore type {}",
                other
            ))),
        }
    }
}

/// Configuration for one key-value backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KvStoreConfig {
    /// Volatile in-process store
    Memory,

    /// Durable single-file store
    Sqlite {
        /// Path of the database file (parent directories are created)
        db_path: PathBuf,
    },

    /// Relational network database
    Postgres {
        #[serde(default = "default_host")]
        host: String,
        #[serde(default = "default_postgres_port")]
        port: u16,
        db: String,
        user: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        #[serde(default = "default_table_name")]
        table_name: String,
    },

    /// Document store
    Mongodb {
        #[serde(default = "default_host")]
        host: String,
        #[serde(default = "default_mongodb_port")]
        port: u16,
        db: String,
        #[serde(default = "default_table_name")]
        collection_name: String,
    },

    /// Network cache
    Redis {
        #[serde(default = "default_host")]
        host: String,
        #[serde(default = "default_redis_port")]
        port: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_mongodb_port() -> u16 {
    27017
}

fn default_redis_port() -> u16 {
    6379
}

fn default_table_name() -> String {
    "kvstore".to_string()
}

impl KvStoreConfig {
    /// Config for a SQLite file at `db_path`
    pub fn sqlite(db_path: impl Into<PathBuf>) -> Self {
        KvStoreConfig::Sqlite {
            db_path: db_path.into(),
        }
    }

    /// The backend kind this config selects
    pub fn kind(&self) -> KvStoreType {
        match self {
            KvStoreConfig::Memory => KvStoreType::Memory,
            KvStoreConfig::Sqlite { .. } => KvStoreType::Sqlite,
            KvStoreConfig::Postgres { .. } => KvStoreType::Postgres,
            KvStoreConfig::Mongodb { .. } => KvStoreType::Mongodb,
            KvStoreConfig::Redis { .. } => KvStoreType::Redis,
        }
    }
}

/// Build and initialize the backend selected by `config`
pub async fn kvstore_impl(config: &KvStoreConfig) -> StorageResult<Arc<dyn KvStore>> {
    tracing::info!("[KvStore] Opening {} backend", config.kind());

    match config {
        KvStoreConfig::Memory => Ok(Arc::new(InMemoryKvStore::new())),
        KvStoreConfig::Sqlite { db_path } => {
            let store = SqliteKvStore::open(db_path.clone()).await?;
            Ok(Arc::new(store))
        }
        other => Err(StorageError::BackendUnavailable(format!(
            "no {} driver is built into this crate",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_sqlite_config() {
        let config: KvStoreConfig =
            serde_json::from_str(r#"{"type": "sqlite", "db_path": "/tmp/agents.db"}"#).unwrap();
        assert_eq!(config, KvStoreConfig::sqlite("/tmp/agents.db"));
        assert_eq!(config.kind(), KvStoreType::Sqlite);
    }

    #[test]
    fn test_parse_network_config_defaults() {
        let config: KvStoreConfig =
            serde_json::from_str(r#"{"type": "postgres", "db": "llama", "user": "me"}"#).unwrap();
        match config {
            KvStoreConfig::Postgres {
                host,
                port,
                table_name,
                ..
            } => {
                assert_eq!(host, "localhost");
                assert_eq!(port, 5432);
                assert_eq!(table_name, "kvstore");
            }
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<KvStoreConfig, _> =
            serde_json::from_str(r#"{"type": "cassandra"}"#);
        assert!(result.is_err());

        assert!("cassandra".parse::<KvStoreType>().is_err());
        assert_eq!("redis".parse::<KvStoreType>().unwrap(), KvStoreType::Redis);
    }

    #[tokio::test]
    async fn test_kvstore_impl() {
        let store = kvstore_impl(&KvStoreConfig::Memory).await.unwrap();
        assert_eq!(store.kind(), KvStoreType::Memory);

        let temp_dir = TempDir::new().unwrap();
        let store = kvstore_impl(&KvStoreConfig::sqlite(temp_dir.path().join("kv.db")))
            .await
            .unwrap();
        assert_eq!(store.kind(), KvStoreType::Sqlite);

        let redis = KvStoreConfig::Redis {
            host: "localhost".into(),
            port: 6379,
            namespace: None,
        };
        assert!(matches!(
            kvstore_impl(&redis).await,
            Err(StorageError::BackendUnavailable(_))
        ));
    }
}
