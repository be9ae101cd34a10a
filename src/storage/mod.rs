//! Key-value persistence for version logs and cached reflection prompts.
//!
//! Every durable piece of workshop state is a JSON document stored under a
//! string key. Keys are namespaced by prefix (`versions:`, `reflection:`) so
//! callers can enumerate or purge one namespace with [`Storage::list_by_prefix`].

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageResult;

/// Storage trait for key-value operations.
///
/// Implementations must be safe to share between tasks; the workshop holds
/// them behind `Arc<dyn Storage>`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the raw value stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Insert or replace the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// All `(key, value)` pairs whose key starts with `prefix`, ordered by key.
    async fn list_by_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, String)>>;
}

/// Read and decode a JSON document.
pub async fn get_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> StorageResult<Option<T>> {
    match storage.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON document.
pub async fn set_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw).await
}
