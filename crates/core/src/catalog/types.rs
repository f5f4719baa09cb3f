//! Types for the title catalog.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::Highlight;

/// Lowest accepted rating score.
pub const MIN_SCORE: f64 = 1.0;
/// Highest accepted rating score.
pub const MAX_SCORE: f64 = 10.0;

/// Broadcast season of a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "WINTER",
            Season::Spring => "SPRING",
            Season::Summer => "SUMMER",
            Season::Fall => "FALL",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WINTER" => Ok(Season::Winter),
            "SPRING" => Ok(Season::Spring),
            "SUMMER" => Ok(Season::Summer),
            "FALL" => Ok(Season::Fall),
            other => Err(CatalogError::Internal(format!("unknown season: {other}"))),
        }
    }
}

/// A user's score for one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user: String,
    pub score: f64,
    /// When the user first rated the episode. Re-votes keep this timestamp.
    pub date: DateTime<Utc>,
}

/// A released episode and its ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Free-form label, e.g. "12" or "12-13".
    pub episode: String,
    pub ratings: Vec<Rating>,
}

/// A tracked series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub id: String,
    /// Id of the title in the external catalog (unique).
    pub canonical_id: i64,
    pub title: String,
    pub extra_titles: Vec<String>,
    pub year: Option<i32>,
    pub season: Option<Season>,
    /// Episodes in insertion order.
    pub episodes: Vec<Episode>,
    pub followers: Vec<String>,
}

impl Title {
    pub fn episode(&self, label: &str) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.episode == label)
    }

    pub fn is_followed_by(&self, user: &str) -> bool {
        self.followers.iter().any(|f| f == user)
    }
}

/// Data for provisioning a title.
#[derive(Debug, Clone)]
pub struct NewTitle {
    pub canonical_id: i64,
    pub title: String,
    pub extra_titles: Vec<String>,
    pub year: Option<i32>,
    pub season: Option<Season>,
}

impl NewTitle {
    pub fn new(canonical_id: i64, title: impl Into<String>) -> Self {
        Self {
            canonical_id,
            title: title.into(),
            extra_titles: Vec::new(),
            year: None,
            season: None,
        }
    }

    pub fn with_extra_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_titles = titles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_season(mut self, year: i32, season: Season) -> Self {
        self.year = Some(year);
        self.season = Some(season);
        self
    }
}

/// One episode to append to a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeAppend {
    pub title_id: String,
    pub episode: String,
}

/// Result of a single append inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted,
    /// The title already has an episode with this label.
    AlreadyPresent,
    TitleMissing,
    Failed(String),
}

/// Whether a vote created a rating or replaced an existing score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingWrite {
    Inserted,
    Updated,
}

/// A search result: the matched title and why it matched.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: Title,
    pub relevance: f64,
    /// Matched fields, best first.
    pub highlights: Vec<Highlight>,
}

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(String),

    #[error("title not found: {0}")]
    NotFound(String),

    #[error("episode {episode} not found for title {title_id}")]
    EpisodeNotFound { title_id: String, episode: String },

    #[error("title with canonical id {0} already exists")]
    Duplicate(i64),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Database(e.to_string())
    }
}
