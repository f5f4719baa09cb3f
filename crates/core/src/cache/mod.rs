//! Key-value cache used for memoized titles and the feed snapshot.

mod memory;
mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key-value store with optional expiry.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value`, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn unlink(&self, key: &str) -> Result<(), CacheError>;
}

/// Key under which a loaded title is memoized.
pub fn title_key(title_id: &str) -> String {
    format!("title:{title_id}")
}

/// Read and deserialize a JSON value.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn KvCache,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Serialize and store a JSON value.
pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn KvCache,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), CacheError> {
    let json = serde_json::to_string(value)?;
    cache.set(key, &json, ttl).await
}
