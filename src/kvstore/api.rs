//! The key-value store contract
//!
//! Every backend implements [`KvStore`]. Keys and values are opaque strings;
//! the agent registry and session store build a hierarchical namespace on top
//! (see [`crate::keys`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::config::KvStoreType;
use super::error::StorageResult;

/// What a backend can answer cheaply
///
/// Higher layers branch on these flags instead of on the concrete backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// Enumerating every key in the store is cheap (in-process structures)
    pub cheap_enumeration: bool,

    /// `list_keys(Some(prefix))` is answered natively rather than by a full scan
    pub native_prefix_scan: bool,
}

impl StoreCapabilities {
    /// Capabilities of a backend that only supports point lookups efficiently
    pub fn point_lookup_only() -> Self {
        Self {
            cheap_enumeration: false,
            native_prefix_scan: false,
        }
    }
}

/// Storage abstraction used by every component above it
///
/// No atomicity is promised across calls. `compare_and_set` is the only
/// operation that is atomic with respect to a single key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the value stored under `key`, if any and not expired
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Upsert `value` under `key`, optionally expiring at `expiration`
    async fn set(
        &self,
        key: &str,
        value: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;

    /// Delete `key`. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Values for keys in `[start_key, end_key)`, in key order
    async fn range(&self, start_key: &str, end_key: &str) -> StorageResult<Vec<String>>;

    /// All keys, or only those beginning with `prefix`
    async fn list_keys(&self, prefix: Option<&str>) -> StorageResult<Vec<String>>;

    /// Write `value` only if the current value equals `expected`
    ///
    /// `expected == None` means the key must be absent. Returns whether the
    /// write happened.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> StorageResult<bool>;

    /// Query capabilities of this backend
    fn capabilities(&self) -> StoreCapabilities;

    /// Backend kind, for logging
    fn kind(&self) -> KvStoreType;
}

/// Exclusive upper bound for a prefix scan expressed as a range
///
/// `"session:a:s:"` becomes `"session:a:s;"`, so `range(prefix, prefix_end(prefix))`
/// covers exactly the keys starting with `prefix`.
pub fn prefix_end(prefix: &str) -> String {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let mut next = last as u32 + 1;
        // skip the surrogate gap
        if (0xD800..=0xDFFF).contains(&next) {
            next = 0xE000;
        }
        if let Some(c) = char::from_u32(next) {
            chars.push(c);
            return chars.into_iter().collect();
        }
    }
    // Every char was char::MAX; nothing sorts after the prefix family.
    format!("{}{}", prefix, char::MAX)
}

/// Whether an entry with this expiration is still live at `now`
pub(crate) fn is_live(expiration: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expiration.map_or(true, |at| at > now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_prefix_end() {
        assert_eq!(prefix_end("session:a:s:"), "session:a:s;");
        assert_eq!(prefix_end("agent"), "agenu");
        assert!("session:a:s:turn" < prefix_end("session:a:s:").as_str());
        assert!("session:a:sx" > prefix_end("session:a:s:").as_str());
    }

    #[test]
    fn test_is_live() {
        let now = Utc::now();
        assert!(is_live(None, now));
        assert!(is_live(Some(now + Duration::seconds(5)), now));
        assert!(!is_live(Some(now - Duration::seconds(5)), now));
    }
}
