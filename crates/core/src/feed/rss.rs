//! RSS 2.0 feed over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{Feed, FeedError, FeedFetch, FeedItem, FeedSource};

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "lastBuildDate", default)]
    last_build_date: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    guid: Option<RssGuid>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RssGuid {
    #[serde(rename = "$text", default)]
    value: String,
}

fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Parse an RSS 2.0 document.
///
/// Items without a guid fall back to their link; items with neither are skipped.
pub fn parse_rss(xml: &str) -> Result<Feed, FeedError> {
    let document: RssDocument =
        quick_xml::de::from_str(xml).map_err(|e| FeedError::Parse(e.to_string()))?;
    let channel = document.channel;

    let items = channel
        .items
        .into_iter()
        .filter_map(|item| {
            let link = item.link.map(|l| l.trim().to_string()).unwrap_or_default();
            let guid = item
                .guid
                .map(|g| g.value.trim().to_string())
                .filter(|g| !g.is_empty())
                .or_else(|| (!link.is_empty()).then(|| link.clone()))?;

            Some(FeedItem {
                guid,
                link,
                title: item.title.map(|t| t.trim().to_string()).unwrap_or_default(),
                pub_date: parse_date(item.pub_date.as_deref()),
            })
        })
        .collect();

    Ok(Feed {
        items,
        last_build_date: parse_date(channel.last_build_date.as_deref()),
    })
}

/// Format a timestamp as an HTTP-date (RFC 7231 IMF-fixdate).
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Feed source that performs a conditional GET against an RSS URL.
pub struct HttpFeedSource {
    client: Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(
        &self,
        if_modified_since: Option<DateTime<Utc>>,
    ) -> Result<FeedFetch, FeedError> {
        let mut request = self.client.get(&self.url);
        if let Some(since) = if_modified_since {
            request = request.header(header::IF_MODIFIED_SINCE, http_date(since));
        }

        debug!("Fetching feed {} (if-modified-since: {:?})", self.url, if_modified_since);

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return Ok(FeedFetch::NotModified);
        }
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let feed = parse_rss(&body)?;
        debug!("Feed has {} items", feed.items.len());

        Ok(FeedFetch::Fetched(feed))
    }
}
