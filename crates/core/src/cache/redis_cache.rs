use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, info};

use super::{CacheError, KvCache};

/// Redis-backed cache shared between processes.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        info!("Connecting to Redis cache");

        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Backend(format!("failed to create Redis client: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Backend(format!("failed to connect to Redis: {e}")))?;

        info!("Connected to Redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        debug!(key, "cache GET");
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis GET failed: {e}")))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        debug!(key, ?ttl, "cache SET");
        let mut conn = self.conn.clone();
        match ttl {
            // SETEX rejects 0
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(|e| CacheError::Backend(format!("Redis SETEX failed: {e}"))),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e| CacheError::Backend(format!("Redis SET failed: {e}"))),
        }
    }

    async fn unlink(&self, key: &str) -> Result<(), CacheError> {
        debug!(key, "cache UNLINK");
        let mut conn = self.conn.clone();
        conn.unlink::<_, ()>(key)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis UNLINK failed: {e}")))
    }
}
