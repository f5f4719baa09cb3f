//! Mock catalog matcher for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::matcher::{CatalogMatcher, MatcherError};

/// Mock implementation of the CatalogMatcher trait.
///
/// Resolves titles from a fixed table and records every lookup. Titles can
/// be marked as rate limited (`fail_on`) or as returning an unreadable
/// response (`break_on`).
#[derive(Debug, Clone, Default)]
pub struct MockCatalogMatcher {
    matches: Arc<RwLock<HashMap<String, i64>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    broken: Arc<RwLock<HashSet<String>>>,
    queries: Arc<RwLock<Vec<String>>>,
}

impl MockCatalogMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_match(&self, title: &str, canonical_id: i64) {
        self.matches
            .write()
            .await
            .insert(title.to_string(), canonical_id);
    }

    /// Make lookups of `title` fail with a rate limit error.
    pub async fn fail_on(&self, title: &str) {
        self.failing.write().await.insert(title.to_string());
    }

    /// Make lookups of `title` fail with a malformed response.
    pub async fn break_on(&self, title: &str) {
        self.broken.write().await.insert(title.to_string());
    }

    pub async fn queries(&self) -> Vec<String> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl CatalogMatcher for MockCatalogMatcher {
    async fn resolve(&self, title: &str) -> Result<Option<i64>, MatcherError> {
        self.queries.write().await.push(title.to_string());

        if self.failing.read().await.contains(title) {
            return Err(MatcherError::RateLimited);
        }
        if self.broken.read().await.contains(title) {
            return Err(MatcherError::Parse("unexpected end of input".to_string()));
        }

        Ok(self.matches.read().await.get(title).copied())
    }
}
