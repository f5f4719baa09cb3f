use serde::Serialize;

use crate::catalog::{Rating, Season};

/// How much of a title a view carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDetail {
    /// Single-title fetch: includes each episode's raw ratings.
    Full,
    /// Search results: statistics only.
    Compact,
}

/// Aggregated statistics of one episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeView {
    pub episode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Vec<Rating>>,
    pub count_score: usize,
    pub sum_score: f64,
    /// 0 when the episode has no ratings.
    pub avg_score: f64,
    /// The requesting user's rating, if any.
    pub user_score: Option<Rating>,
}

/// Title-level score summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub count_score: usize,
    /// Weighted by votes per episode; 0 when nothing was rated.
    pub avg_score: f64,
    /// Mean of the requesting user's scores; 0 when they rated nothing.
    pub user_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowSummary {
    pub followers_count: usize,
    pub user_following: bool,
}

/// A title as returned by fetch and search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleView {
    pub id: String,
    pub canonical_id: i64,
    pub title: String,
    pub extra_titles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,
    pub episodes: Vec<EpisodeView>,
    pub score: ScoreSummary,
    pub follow: FollowSummary,
    /// Display title chosen from the search highlights (search results only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_title: Option<String>,
}
