//! Title API handlers: fetch, search, vote and follow.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use animerate_core::{FollowReceipt, TitleView, VoteReceipt};

use super::error::{
    api_error, optional_user, require_query, require_score, require_user, service_error, ApiError,
};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for title reads
#[derive(Debug, Deserialize)]
pub struct ViewParams {
    /// Requesting user; enables per-user scores and follow state
    pub user: Option<String>,
}

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub user: Option<String>,
}

/// Request body for voting
#[derive(Debug, Deserialize)]
pub struct VoteBody {
    pub user: Option<String>,
    /// Kept loose so a non-numeric score gets a validation error, not a rejection
    pub score: Option<serde_json::Value>,
}

/// Request body for follow and unfollow
#[derive(Debug, Deserialize)]
pub struct FollowBody {
    pub user: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Search titles by primary or alternate name
pub async fn search_titles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<TitleView>>, ApiError> {
    let query = require_query(params.query.as_deref())?;
    let user = optional_user(params.user.as_deref())?;

    let results = state
        .titles()
        .search(query, user)
        .await
        .map_err(service_error)?;
    Ok(Json(results))
}

/// Get a title with its episodes and scores
pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ViewParams>,
) -> Result<Json<TitleView>, ApiError> {
    let user = optional_user(params.user.as_deref())?;

    let view = state
        .titles()
        .get_title(&id, user)
        .await
        .map_err(service_error)?;
    Ok(Json(view))
}

/// Get a single top-level field of a title view (e.g. `score`, `episodes`).
///
/// Unknown fields return the whole view.
pub async fn get_title_field(
    State(state): State<Arc<AppState>>,
    Path((id, field)): Path<(String, String)>,
    Query(params): Query<ViewParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = optional_user(params.user.as_deref())?;

    let view = state
        .titles()
        .get_title(&id, user)
        .await
        .map_err(service_error)?;

    let mut value = serde_json::to_value(&view).map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            format!("Failed to serialize title: {}", e),
        )
    })?;

    if let Some(v) = value.get_mut(&field) {
        return Ok(Json(v.take()));
    }
    Ok(Json(value))
}

/// Vote on an episode (repeated votes replace the earlier score)
pub async fn vote_episode(
    State(state): State<Arc<AppState>>,
    Path((id, episode)): Path<(String, String)>,
    Json(body): Json<VoteBody>,
) -> Result<(StatusCode, Json<VoteReceipt>), ApiError> {
    let user = require_user(body.user.as_deref())?;
    let score = require_score(body.score.as_ref())?;

    let receipt = state
        .titles()
        .vote_episode(&id, &episode, user, score)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Follow a title
pub async fn follow_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<FollowBody>,
) -> Result<Json<FollowReceipt>, ApiError> {
    set_following(&state, &id, body, true).await
}

/// Unfollow a title
pub async fn unfollow_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<FollowBody>,
) -> Result<Json<FollowReceipt>, ApiError> {
    set_following(&state, &id, body, false).await
}

async fn set_following(
    state: &AppState,
    id: &str,
    body: FollowBody,
    follow: bool,
) -> Result<Json<FollowReceipt>, ApiError> {
    let user = require_user(body.user.as_deref())?;

    let receipt = state
        .titles()
        .follow(id, user, follow)
        .await
        .map_err(service_error)?;
    Ok(Json(receipt))
}
