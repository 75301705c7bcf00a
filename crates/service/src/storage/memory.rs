use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValue;
use crate::errors::ServiceError;

/// In-memory implementation of [`KeyValue`].
///
/// Stand-in for the redis backend in tests and local development where a
/// running store is not available. Pattern matching only supports the
/// `prefix*` form the record service actually uses.
#[derive(Clone, Default)]
pub struct MemoryKv {
    inner: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValue for MemoryKv {
    async fn store(&self, key: &str, field: &str, value: &str) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        map.entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<HashMap<String, String>, ServiceError> {
        let map = self.inner.read().await;
        Ok(map.get(key).cloned().unwrap_or_default())
    }

    async fn remove(&self, key: &str) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        map.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let map = self.inner.read().await;
        Ok(map.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}
