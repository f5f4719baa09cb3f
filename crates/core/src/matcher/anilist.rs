//! AniList GraphQL client.
//!
//! AniList answers an unknown search with HTTP 404 and `"Media": null`;
//! both are treated as "no match". The public API allows roughly 90
//! requests per minute.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{CatalogMatcher, MatcherError};
use crate::config::CatalogSearchConfig;

const MEDIA_SEARCH_QUERY: &str = r#"
query ($search: String) {
  Media(search: $search, type: ANIME) {
    id
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<MediaData>,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: i64,
}

/// AniList-backed catalog matcher.
pub struct AniListMatcher {
    client: Client,
    url: String,
}

impl AniListMatcher {
    pub fn new(config: &CatalogSearchConfig) -> Result<Self, MatcherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.into()))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl CatalogMatcher for AniListMatcher {
    async fn resolve(&self, title: &str) -> Result<Option<i64>, MatcherError> {
        debug!("AniList media search: '{}'", title);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "query": MEDIA_SEARCH_QUERY,
                "variables": { "search": title },
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MatcherError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MatcherError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| MatcherError::Parse(format!("Failed to parse media search: {}", e)))?;

        Ok(body.data.and_then(|d| d.media).map(|m| m.id))
    }
}
