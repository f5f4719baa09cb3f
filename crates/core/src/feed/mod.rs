//! Release feed source.
//!
//! Fetches the syndication feed that announces new episode releases. The
//! fetch is conditional: given the time of the last successful fetch, the
//! source may answer "not modified" instead of a feed.

mod rss;
mod types;

pub use rss::{parse_rss, HttpFeedSource};
pub use types::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur when fetching or parsing the feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed responded with status {0}")]
    Status(u16),

    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// Result of a conditional feed fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFetch {
    NotModified,
    Fetched(Feed),
}

/// Trait for feed sources.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the feed, unless it has not changed since `if_modified_since`.
    async fn fetch(&self, if_modified_since: Option<DateTime<Utc>>)
        -> Result<FeedFetch, FeedError>;
}
