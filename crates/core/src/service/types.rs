//! Types for title operations.

use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;

/// Result of a vote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteReceipt {
    pub user: String,
    pub score: f64,
}

/// Result of a follow or unfollow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowReceipt {
    pub title_id: String,
    /// Display title of the followed series.
    pub title: String,
    pub user: String,
    pub following: bool,
}

/// Error categories, independent of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown title or episode.
    NotFound,
    /// Follow when already following.
    AlreadyDone,
    /// Unfollow when not following.
    NotDone,
    /// Malformed input.
    Validation,
    /// Unexpected store or cache failure.
    Internal,
}

/// Errors from title operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("title not found: {title_id}")]
    TitleNotFound { title_id: String },

    #[error("episode {episode} not found for title {title_id}")]
    EpisodeNotFound { title_id: String, episode: String },

    #[error("user {user} already follows title {title_id}")]
    AlreadyFollowing { title_id: String, user: String },

    #[error("user {user} does not follow title {title_id}")]
    NotFollowing { title_id: String, user: String },

    #[error("score {0} is outside the accepted range")]
    InvalidScore(f64),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::TitleNotFound { .. } | ServiceError::EpisodeNotFound { .. } => {
                ErrorKind::NotFound
            }
            ServiceError::AlreadyFollowing { .. } => ErrorKind::AlreadyDone,
            ServiceError::NotFollowing { .. } => ErrorKind::NotDone,
            ServiceError::InvalidScore(_) => ErrorKind::Validation,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::TitleNotFound { .. } => "NO_TITLE",
            ServiceError::EpisodeNotFound { .. } => "NO_EPISODE",
            ServiceError::AlreadyFollowing { .. } => "ALREADY_FOLLOWING",
            ServiceError::NotFollowing { .. } => "NOT_FOLLOWING",
            ServiceError::InvalidScore(_) => "INVALID_SCORE",
            ServiceError::Internal(_) => "INTERNAL",
        }
    }

    /// Ids involved in the failure, for clients to render a precise message.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServiceError::TitleNotFound { title_id } => {
                Some(serde_json::json!({ "titleId": title_id }))
            }
            ServiceError::EpisodeNotFound { title_id, episode } => {
                Some(serde_json::json!({ "titleId": title_id, "episode": episode }))
            }
            ServiceError::AlreadyFollowing { title_id, user }
            | ServiceError::NotFollowing { title_id, user } => {
                Some(serde_json::json!({ "titleId": title_id, "user": user }))
            }
            ServiceError::InvalidScore(score) => Some(serde_json::json!({ "score": score })),
            ServiceError::Internal(_) => None,
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(title_id) => ServiceError::TitleNotFound { title_id },
            CatalogError::EpisodeNotFound { title_id, episode } => {
                ServiceError::EpisodeNotFound { title_id, episode }
            }
            other => ServiceError::Internal(other.to_string()),
        }
    }
}
