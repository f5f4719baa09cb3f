//! Resolution of release headlines to external catalog ids.

mod anilist;

pub use anilist::AniListMatcher;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when querying the external catalog.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimited,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl MatcherError {
    /// Whether the catalog itself is unusable, as opposed to refusing one lookup.
    ///
    /// Transport and decoding failures end the discovery cycle; rate limits
    /// and API errors only drop the item being looked up.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MatcherError::Http(_) | MatcherError::Parse(_))
    }
}

/// Resolves a series name to the id used by the external catalog.
#[async_trait]
pub trait CatalogMatcher: Send + Sync {
    /// `Ok(None)` when the catalog has no match for `title`.
    async fn resolve(&self, title: &str) -> Result<Option<i64>, MatcherError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusals_are_not_fatal() {
        assert!(!MatcherError::RateLimited.is_fatal());
        assert!(!MatcherError::Api {
            status: 400,
            message: "bad search".to_string()
        }
        .is_fatal());
        assert!(MatcherError::Parse("eof".to_string()).is_fatal());
    }
}
