use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use super::KeyValue;
use crate::errors::ServiceError;

/// Redis-backed implementation of [`KeyValue`].
///
/// Holds a `ConnectionManager`, which multiplexes one connection and
/// reconnects on command failure; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    /// Connect once at process start; fails fast if the store is unreachable.
    pub async fn connect(url: &str) -> Result<Self, ServiceError> {
        let client = redis::Client::open(url).map_err(store_err)?;
        let conn = ConnectionManager::new(client).await.map_err(store_err)?;
        debug!(%url, "connected to redis");
        Ok(Self { conn })
    }
}

fn store_err(e: redis::RedisError) -> ServiceError {
    ServiceError::Store(e.to_string())
}

#[async_trait]
impl KeyValue for RedisKv {
    async fn store(&self, key: &str, field: &str, value: &str) -> Result<(), ServiceError> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(key, field, value).await.map_err(store_err)
    }

    async fn load(&self, key: &str) -> Result<HashMap<String, String>, ServiceError> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(store_err)
    }

    async fn remove(&self, key: &str) -> Result<(), ServiceError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(store_err)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        // SCAN instead of KEYS so enumeration does not block the store.
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .query_async(&mut conn)
                .await
                .map_err(store_err)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}
