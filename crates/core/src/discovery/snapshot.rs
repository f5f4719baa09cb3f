use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::{get_json, set_json, CacheError, KvCache};
use crate::feed::Feed;

/// Cache key holding the last processed feed (JSON).
pub const SNAPSHOT_FEED_KEY: &str = "discovery:last_feed";
/// Cache key holding the time of the last processed feed (RFC 3339).
pub const SNAPSHOT_TIME_KEY: &str = "discovery:last_feed_time";

/// The last processed feed and when it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub feed: Feed,
    /// Sent as If-Modified-Since on the next fetch.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Reads and replaces the feed snapshot in the key-value cache.
#[derive(Clone)]
pub struct SnapshotStore {
    cache: Arc<dyn KvCache>,
}

impl SnapshotStore {
    pub fn new(cache: Arc<dyn KvCache>) -> Self {
        Self { cache }
    }

    pub async fn load(&self) -> Result<Option<FeedSnapshot>, CacheError> {
        let Some(feed) = get_json::<Feed>(self.cache.as_ref(), SNAPSHOT_FEED_KEY).await? else {
            return Ok(None);
        };

        let fetched_at = self
            .cache
            .get(SNAPSHOT_TIME_KEY)
            .await?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Some(FeedSnapshot { feed, fetched_at }))
    }

    /// Replace the snapshot (no merge).
    pub async fn save(&self, feed: &Feed, fetched_at: DateTime<Utc>) -> Result<(), CacheError> {
        set_json(self.cache.as_ref(), SNAPSHOT_FEED_KEY, feed, None).await?;
        self.cache
            .set(SNAPSHOT_TIME_KEY, &fetched_at.to_rfc3339(), None)
            .await
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.cache.unlink(SNAPSHOT_FEED_KEY).await?;
        self.cache.unlink(SNAPSHOT_TIME_KEY).await
    }
}
