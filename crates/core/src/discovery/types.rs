//! Types for feed discovery.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheError;
use crate::catalog::CatalogError;
use crate::feed::FeedError;
use crate::matcher::MatcherError;

/// Errors that abort a discovery cycle.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("catalog lookup failed: {0}")]
    Matcher(#[from] MatcherError),

    #[error("title store error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("snapshot cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("discovery cycle timed out after {0:?}")]
    TimedOut(Duration),
}

/// What a completed cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Items in the fetched feed.
    pub fetched: usize,
    /// Items absent from the previous snapshot.
    pub new_items: usize,
    /// New items whose headline did not parse.
    pub unparsed: usize,
    /// Parsed items the external catalog did not know.
    pub unmatched: usize,
    /// Resolved items with no local title.
    pub untracked: usize,
    pub inserted: usize,
    /// Appends for labels the title already had.
    pub duplicates: usize,
    pub failed: usize,
    /// "Title #episode" for every inserted episode.
    pub inserted_episodes: Vec<String>,
    /// The cycle started without a snapshot.
    pub bootstrapped: bool,
}

/// Result of one cycle attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Another cycle held the run guard.
    Skipped,
    NotModified,
    Completed(CycleReport),
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Skipped => "skipped",
            CycleOutcome::NotModified => "not_modified",
            CycleOutcome::Completed(_) => "completed",
        }
    }
}

/// Discovery state for the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryStatus {
    /// The background loop is active.
    pub scheduled: bool,
    pub cycle_in_progress: bool,
    pub interval_minutes: u64,
}
