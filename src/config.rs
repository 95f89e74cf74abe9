//! Runtime configuration
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {
//!   "persistence_store": {"type": "sqlite", "db_path": ".shadow/agents_store.db"},
//!   "logging": {"level": "info", "json": false, "log_dir": "logs"}
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{AgentsError, AgentsResult};
use crate::kvstore::KvStoreConfig;

/// Default location of the durable store
pub const DEFAULT_DB_PATH: &str = ".shadow/agents_store.db";

fn default_persistence_store() -> KvStoreConfig {
    KvStoreConfig::sqlite(DEFAULT_DB_PATH)
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "shadow-agents.log".to_string()
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info", "shadow_agents=debug"); `RUST_LOG` wins if set
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of text
    #[serde(default)]
    pub json: bool,

    /// Write to a daily-rolling file in this directory instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// File name prefix for rolled files
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Colored output (stderr only)
    #[serde(default = "default_true")]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            log_dir: None,
            file_prefix: default_file_prefix(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Set the filter directive
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enable or disable JSON output
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Log to daily-rolling files in `dir`
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Configuration for [`AgentsRuntime`](crate::runtime::AgentsRuntime)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Durable store for agents and persisted sessions
    #[serde(default = "default_persistence_store")]
    pub persistence_store: KvStoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            persistence_store: default_persistence_store(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the durable store
    pub fn with_persistence_store(mut self, store: KvStoreConfig) -> Self {
        self.persistence_store = store;
        self
    }

    /// Set the logging configuration
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Parse a configuration from JSON text
    pub fn from_json(json: &str) -> AgentsResult<Self> {
        serde_json::from_str(json).map_err(|e| AgentsError::InvalidConfig(e.to_string()))
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> AgentsResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| AgentsError::InvalidConfig(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("[RuntimeConfig] Loaded {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvstore::KvStoreType;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.persistence_store, KvStoreConfig::sqlite(DEFAULT_DB_PATH));
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"persistence_store": {"type": "memory"}, "logging": {"level": "debug", "json": true}}"#,
        )
        .unwrap();

        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.persistence_store.kind(), KvStoreType::Memory);
        assert_eq!(config.logging, LoggingConfig::default().with_level("debug").with_json(true));
    }

    #[test]
    fn test_unknown_backend_is_invalid_config() {
        let err = RuntimeConfig::from_json(r#"{"persistence_store": {"type": "cassandra"}}"#)
            .unwrap_err();
        assert!(matches!(err, AgentsError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = RuntimeConfig::load(temp_dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, AgentsError::Io(_)));
    }
}
