//! Title catalog - tracked series, their episodes, ratings and followers.
//!
//! Uniqueness rules (one episode per label per title, one rating per user
//! per episode, one follow per user per title) are enforced by the store in
//! single atomic statements, so concurrent writers can never produce
//! duplicates.

mod sqlite;
mod types;

pub use sqlite::SqliteTitleStore;
pub use types::*;

use chrono::{DateTime, Utc};

use crate::search::FuzzyQuery;

/// Trait for title storage.
pub trait TitleStore: Send + Sync {
    /// Provision a new title. Fails with `Duplicate` if the canonical id is taken.
    fn insert(&self, title: NewTitle) -> Result<Title, CatalogError>;

    /// Load a title with its episodes, ratings and followers.
    fn get(&self, id: &str) -> Result<Title, CatalogError>;

    /// Find the local title bound to an external catalog id.
    fn find_by_canonical_id(&self, canonical_id: i64) -> Result<Option<Title>, CatalogError>;

    /// Append episodes as independent operations.
    ///
    /// Returns one outcome per input, in input order. A failing append never
    /// prevents the others from being applied.
    fn append_episodes(&self, appends: &[EpisodeAppend]) -> Vec<AppendOutcome>;

    /// Create or overwrite the rating of `user` for an episode.
    ///
    /// An existing rating keeps its original date and only has its score replaced.
    fn upsert_rating(
        &self,
        title_id: &str,
        episode: &str,
        user: &str,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<RatingWrite, CatalogError>;

    /// Add `user` to the followers. Returns false if they already follow.
    fn add_follower(&self, title_id: &str, user: &str) -> Result<bool, CatalogError>;

    /// Remove `user` from the followers. Returns false if they were not following.
    fn remove_follower(&self, title_id: &str, user: &str) -> Result<bool, CatalogError>;

    /// Fuzzy search over primary and alternate titles.
    fn search(&self, query: &FuzzyQuery) -> Result<Vec<SearchHit>, CatalogError>;
}
