//! Title fetch, vote, follow and search.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::locks::TitleLocks;
use super::types::{FollowReceipt, ServiceError, VoteReceipt};
use crate::cache::{get_json, set_json, title_key, KvCache};
use crate::catalog::{RatingWrite, Title, TitleStore, MAX_SCORE, MIN_SCORE};
use crate::metrics;
use crate::scoring::{aggregate_title, TitleView, ViewDetail};
use crate::search::{select_best_title, FuzzyQuery, DEFAULT_SEARCH_LIMIT};

/// Client-facing title operations over a store and a cache.
pub struct TitleService {
    store: Arc<dyn TitleStore>,
    cache: Arc<dyn KvCache>,
    title_ttl: Duration,
    locks: Arc<TitleLocks>,
}

impl TitleService {
    pub fn new(store: Arc<dyn TitleStore>, cache: Arc<dyn KvCache>, title_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            title_ttl,
            locks: Arc::new(TitleLocks::new()),
        }
    }

    /// Per-title locks guarding memoized entries. Other writers of titles
    /// (discovery) must hold them around their write and invalidation.
    pub fn title_locks(&self) -> Arc<TitleLocks> {
        Arc::clone(&self.locks)
    }

    /// Fetch one title with full episode detail.
    pub async fn get_title(
        &self,
        title_id: &str,
        user: Option<&str>,
    ) -> Result<TitleView, ServiceError> {
        let title = self.load(title_id).await?;
        Ok(aggregate_title(&title, user, ViewDetail::Full))
    }

    /// Record `user`'s score for an episode, replacing any earlier vote.
    pub async fn vote_episode(
        &self,
        title_id: &str,
        episode: &str,
        user: &str,
        score: f64,
    ) -> Result<VoteReceipt, ServiceError> {
        if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ServiceError::InvalidScore(score));
        }

        let _guard = self.locks.lock(title_id).await;
        let write = self
            .store
            .upsert_rating(title_id, episode, user, score, Utc::now())?;
        self.invalidate(title_id).await;

        let kind = match write {
            RatingWrite::Inserted => "new",
            RatingWrite::Updated => "changed",
        };
        metrics::VOTES_TOTAL.with_label_values(&[kind]).inc();
        info!(
            title_id = %title_id,
            episode = %episode,
            user = %user,
            score,
            kind,
            "Recorded vote"
        );

        Ok(VoteReceipt {
            user: user.to_string(),
            score,
        })
    }

    /// Follow (`follow = true`) or unfollow a title.
    pub async fn follow(
        &self,
        title_id: &str,
        user: &str,
        follow: bool,
    ) -> Result<FollowReceipt, ServiceError> {
        let _guard = self.locks.lock(title_id).await;
        let display = match self.cached(&title_key(title_id)).await {
            Some(title) => title.title,
            None => self.store.get(title_id)?.title,
        };

        if follow {
            if !self.store.add_follower(title_id, user)? {
                return Err(ServiceError::AlreadyFollowing {
                    title_id: title_id.to_string(),
                    user: user.to_string(),
                });
            }
        } else if !self.store.remove_follower(title_id, user)? {
            return Err(ServiceError::NotFollowing {
                title_id: title_id.to_string(),
                user: user.to_string(),
            });
        }
        self.invalidate(title_id).await;

        let action = if follow { "follow" } else { "unfollow" };
        metrics::FOLLOW_CHANGES.with_label_values(&[action]).inc();
        info!(title_id = %title_id, user = %user, action, "Follow state changed");

        Ok(FollowReceipt {
            title_id: title_id.to_string(),
            title: display,
            user: user.to_string(),
            following: follow,
        })
    }

    /// Fuzzy search over titles and their alternate names.
    ///
    /// Returns at most five compact views, best match first, each carrying
    /// the display title picked from its best matching field.
    pub async fn search(
        &self,
        query: &str,
        user: Option<&str>,
    ) -> Result<Vec<TitleView>, ServiceError> {
        let query = FuzzyQuery::new(query).with_limit(DEFAULT_SEARCH_LIMIT);
        let hits = self.store.search(&query)?;
        debug!(query = %query.text, hits = hits.len(), "Search completed");

        Ok(hits
            .into_iter()
            .map(|hit| {
                let mut view = aggregate_title(&hit.title, user, ViewDetail::Compact);
                view.best_title = Some(select_best_title(
                    &hit.title.title,
                    &hit.title.extra_titles,
                    &hit.highlights,
                ));
                view
            })
            .collect())
    }

    /// Load a title, from the cache when memoized.
    ///
    /// A miss is served under the title's lock so a write that lands in the
    /// meantime cannot be shadowed by a stale entry.
    async fn load(&self, title_id: &str) -> Result<Title, ServiceError> {
        let key = title_key(title_id);

        if let Some(title) = self.cached(&key).await {
            return Ok(title);
        }

        let _guard = self.locks.lock(title_id).await;
        if let Some(title) = self.cached(&key).await {
            return Ok(title);
        }

        let title = self.store.get(title_id)?;
        if let Err(e) = set_json(self.cache.as_ref(), &key, &title, Some(self.title_ttl)).await {
            warn!("Failed to memoize title {}: {}", title_id, e);
        }
        Ok(title)
    }

    /// Cache failures degrade to a store read.
    async fn cached(&self, key: &str) -> Option<Title> {
        match get_json::<Title>(self.cache.as_ref(), key).await {
            Ok(title) => title,
            Err(e) => {
                warn!("Cache read for {} failed: {}", key, e);
                None
            }
        }
    }

    async fn invalidate(&self, title_id: &str) {
        if let Err(e) = self.cache.unlink(&title_key(title_id)).await {
            error!("Failed to invalidate cached title {}: {}", title_id, e);
        }
    }
}
