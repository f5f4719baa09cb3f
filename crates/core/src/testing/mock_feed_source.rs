//! Mock feed source for testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::feed::{Feed, FeedError, FeedFetch, FeedSource};

/// A scripted response.
#[derive(Debug, Clone)]
pub enum MockFeedResponse {
    Feed(Feed),
    NotModified,
    /// Non-success HTTP status.
    Status(u16),
}

/// Mock implementation of the FeedSource trait.
///
/// Responses are served in the order they were pushed; once the script is
/// exhausted every fetch answers "not modified". Every call records its
/// `if_modified_since` argument.
#[derive(Debug, Clone, Default)]
pub struct MockFeedSource {
    responses: Arc<RwLock<VecDeque<MockFeedResponse>>>,
    requests: Arc<RwLock<Vec<Option<DateTime<Utc>>>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_feed(&self, feed: Feed) {
        self.responses
            .write()
            .await
            .push_back(MockFeedResponse::Feed(feed));
    }

    pub async fn push_not_modified(&self) {
        self.responses
            .write()
            .await
            .push_back(MockFeedResponse::NotModified);
    }

    pub async fn push_error(&self, status: u16) {
        self.responses
            .write()
            .await
            .push_back(MockFeedResponse::Status(status));
    }

    /// Make every fetch take `delay` before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// `if_modified_since` of every fetch so far.
    pub async fn requests(&self) -> Vec<Option<DateTime<Utc>>> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch(
        &self,
        if_modified_since: Option<DateTime<Utc>>,
    ) -> Result<FeedFetch, FeedError> {
        self.requests.write().await.push(if_modified_since);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.write().await.pop_front() {
            Some(MockFeedResponse::Feed(feed)) => Ok(FeedFetch::Fetched(feed)),
            Some(MockFeedResponse::Status(status)) => Err(FeedError::Status(status)),
            Some(MockFeedResponse::NotModified) | None => Ok(FeedFetch::NotModified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_scripted_responses() {
        let source = MockFeedSource::new();
        source.push_feed(fixtures::feed(&[("a", "X #1")])).await;
        source.push_error(500).await;

        assert!(matches!(
            source.fetch(None).await,
            Ok(FeedFetch::Fetched(_))
        ));
        assert!(matches!(
            source.fetch(Some(Utc::now())).await,
            Err(FeedError::Status(500))
        ));
        assert_eq!(source.fetch(None).await.unwrap(), FeedFetch::NotModified);

        let requests = source.requests().await;
        assert_eq!(requests.len(), 3);
        assert!(requests[1].is_some());
    }
}
