use crate::catalog::{Episode, Title};

use super::{EpisodeView, FollowSummary, ScoreSummary, TitleView, ViewDetail};

/// Statistics of one episode from the point of view of `user`.
pub fn summarize_episode(episode: &Episode, user: Option<&str>, detail: ViewDetail) -> EpisodeView {
    let count_score = episode.ratings.len();
    let sum_score: f64 = episode.ratings.iter().map(|r| r.score).sum();
    let avg_score = if count_score == 0 {
        0.0
    } else {
        sum_score / count_score as f64
    };

    let user_score = user.and_then(|u| episode.ratings.iter().find(|r| r.user == u).cloned());

    EpisodeView {
        episode: episode.episode.clone(),
        ratings: match detail {
            ViewDetail::Full => Some(episode.ratings.clone()),
            ViewDetail::Compact => None,
        },
        count_score,
        sum_score,
        avg_score,
        user_score,
    }
}

/// Title-level summary derived from episode views.
pub fn summarize_score(episodes: &[EpisodeView]) -> ScoreSummary {
    let count_score: usize = episodes.iter().map(|e| e.count_score).sum();
    let total: f64 = episodes.iter().map(|e| e.sum_score).sum();
    let avg_score = if count_score == 0 {
        0.0
    } else {
        total / count_score as f64
    };

    let user_scores: Vec<f64> = episodes
        .iter()
        .filter_map(|e| e.user_score.as_ref().map(|r| r.score))
        .collect();
    let user_score = if user_scores.is_empty() {
        0.0
    } else {
        user_scores.iter().sum::<f64>() / user_scores.len() as f64
    };

    ScoreSummary {
        count_score,
        avg_score,
        user_score,
    }
}

/// Build the client view of `title` for `user` (if any).
pub fn aggregate_title(title: &Title, user: Option<&str>, detail: ViewDetail) -> TitleView {
    let episodes: Vec<EpisodeView> = title
        .episodes
        .iter()
        .map(|e| summarize_episode(e, user, detail))
        .collect();
    let score = summarize_score(&episodes);

    TitleView {
        id: title.id.clone(),
        canonical_id: title.canonical_id,
        title: title.title.clone(),
        extra_titles: title.extra_titles.clone(),
        year: title.year,
        season: title.season,
        episodes,
        score,
        follow: FollowSummary {
            followers_count: title.followers.len(),
            user_following: user.is_some_and(|u| title.is_followed_by(u)),
        },
        best_title: None,
    }
}
