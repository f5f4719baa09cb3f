//! Testing utilities and mock implementations.
//!
//! Mocks for the external collaborators of discovery (the release feed and
//! the external catalog), so pipelines can be exercised without network
//! access.
//!
//! # Example
//!
//! ```rust,ignore
//! use animerate_core::testing::{fixtures, MockCatalogMatcher, MockFeedSource};
//!
//! let feed = MockFeedSource::new();
//! let matcher = MockCatalogMatcher::new();
//!
//! feed.push_feed(fixtures::feed(&[("guid-1", "Frieren #1")])).await;
//! matcher.add_match("Frieren", 154587).await;
//! ```

mod mock_catalog_matcher;
mod mock_feed_source;

pub use mock_catalog_matcher::MockCatalogMatcher;
pub use mock_feed_source::{MockFeedResponse, MockFeedSource};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::catalog::{NewTitle, Season};
    use crate::feed::{Feed, FeedItem};

    /// A feed item with a link derived from its guid.
    pub fn feed_item(guid: &str, title: &str) -> FeedItem {
        FeedItem {
            guid: guid.to_string(),
            link: format!("https://releases.example.org/view/{guid}"),
            title: title.to_string(),
            pub_date: Some(Utc::now()),
        }
    }

    /// A feed built now from `(guid, headline)` pairs.
    pub fn feed(items: &[(&str, &str)]) -> Feed {
        Feed {
            items: items
                .iter()
                .map(|(guid, title)| feed_item(guid, title))
                .collect(),
            last_build_date: Some(Utc::now()),
        }
    }

    /// A title with alternate names and a season.
    pub fn new_title(canonical_id: i64, title: &str, extra_titles: &[&str]) -> NewTitle {
        NewTitle::new(canonical_id, title)
            .with_extra_titles(extra_titles.iter().copied())
            .with_season(2023, Season::Fall)
    }
}
