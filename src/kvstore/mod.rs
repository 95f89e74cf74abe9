//! Key-value storage for agents, sessions and turns
//!
//! This module provides:
//! - `KvStore` trait - The storage contract every backend satisfies
//! - `StoreCapabilities` - What a backend can answer cheaply
//! - `InMemoryKvStore` - Volatile backend
//! - `SqliteKvStore` - Durable single-file backend
//! - `KvStoreConfig` / `kvstore_impl` - Backend selection from configuration

mod api;
mod config;
mod error;
mod memory;
mod sqlite;

pub use api::{prefix_end, KvStore, StoreCapabilities};
pub use config::{kvstore_impl, KvStoreConfig, KvStoreType};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryKvStore;
pub use sqlite::SqliteKvStore;
