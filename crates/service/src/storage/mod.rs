pub mod memory;
pub mod redis_kv;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::ServiceError;

/// Key-value store abstraction over hash-shaped records.
///
/// Key = prefixed record key, Field = record attribute, Value = string.
/// Writes are per-field so that a multi-field save is a sequence of
/// independent single-field commands, matching the store's native
/// per-command atomicity.
#[async_trait]
pub trait KeyValue: Send + Sync + 'static {
    /// Write a single hash field under `key`, creating the hash if absent.
    async fn store(&self, key: &str, field: &str, value: &str) -> Result<(), ServiceError>;

    /// Load all fields of the hash at `key`; an absent key yields an empty map.
    async fn load(&self, key: &str) -> Result<HashMap<String, String>, ServiceError>;

    /// Delete the whole key. Succeeds whether or not the key existed.
    async fn remove(&self, key: &str) -> Result<(), ServiceError>;

    /// List keys matching a glob-style pattern (e.g. `record:*`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError>;
}
