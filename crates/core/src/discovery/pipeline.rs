//! One discovery cycle: fetch, diff, match, persist, replace snapshot.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::config::DiscoveryConfig;
use super::guard::RunGuard;
use super::headline::{parse_headline, ParsedHeadline};
use super::snapshot::SnapshotStore;
use super::types::{CycleOutcome, CycleReport, DiscoveryError};
use crate::cache::{title_key, CacheError, KvCache};
use crate::catalog::{AppendOutcome, EpisodeAppend, TitleStore};
use crate::feed::{FeedFetch, FeedItem, FeedSource};
use crate::matcher::{CatalogMatcher, MatcherError};
use crate::metrics;
use crate::service::TitleLocks;

/// An append waiting to be persisted, with its display name for logs.
struct PendingAppend {
    append: EpisodeAppend,
    display: String,
}

/// Drives discovery cycles. Cheap to share behind an `Arc`.
pub struct DiscoveryPipeline {
    feed: Arc<dyn FeedSource>,
    matcher: Arc<dyn CatalogMatcher>,
    store: Arc<dyn TitleStore>,
    cache: Arc<dyn KvCache>,
    snapshots: SnapshotStore,
    guard: RunGuard,
    locks: Arc<TitleLocks>,
    match_concurrency: usize,
    cycle_timeout: Duration,
}

impl DiscoveryPipeline {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        matcher: Arc<dyn CatalogMatcher>,
        store: Arc<dyn TitleStore>,
        cache: Arc<dyn KvCache>,
        config: &DiscoveryConfig,
    ) -> Self {
        Self {
            feed,
            matcher,
            store,
            snapshots: SnapshotStore::new(Arc::clone(&cache)),
            cache,
            guard: RunGuard::new(),
            locks: Arc::new(TitleLocks::new()),
            match_concurrency: config.match_concurrency.max(1),
            cycle_timeout: config.interval(),
        }
    }

    /// Share the per-title locks of the service that memoizes titles, so an
    /// append and its invalidation cannot interleave with a cache fill.
    pub fn with_title_locks(mut self, locks: Arc<TitleLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Whether a cycle currently holds the run guard.
    pub fn is_running(&self) -> bool {
        self.guard.is_busy()
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Forget the snapshot so the next cycle bootstraps a new baseline.
    pub async fn reset_snapshot(&self) -> Result<(), CacheError> {
        self.snapshots.clear().await
    }

    /// Run one guarded cycle, bounded by the cycle timeout.
    ///
    /// Returns `Skipped` without doing anything if another cycle is running.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, DiscoveryError> {
        let Some(_permit) = self.guard.try_acquire() else {
            info!("Discovery cycle already in progress, skipping");
            metrics::DISCOVERY_CYCLES.with_label_values(&["skipped"]).inc();
            return Ok(CycleOutcome::Skipped);
        };

        let started = Instant::now();
        let result = match tokio::time::timeout(self.cycle_timeout, self.execute()).await {
            Ok(result) => result,
            Err(_) => Err(DiscoveryError::TimedOut(self.cycle_timeout)),
        };

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(DiscoveryError::TimedOut(_)) => "timed_out",
            Err(_) => "failed",
        };
        metrics::DISCOVERY_CYCLES.with_label_values(&[label]).inc();
        metrics::DISCOVERY_CYCLE_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    /// Scheduler entry point. Failures are logged here and never propagate.
    pub async fn tick(&self) -> Option<CycleOutcome> {
        match self.run_cycle().await {
            Ok(outcome) => {
                if let CycleOutcome::Completed(report) = &outcome {
                    log_report(report);
                }
                Some(outcome)
            }
            Err(e) => {
                error!("Discovery cycle failed: {}", e);
                None
            }
        }
    }

    async fn execute(&self) -> Result<CycleOutcome, DiscoveryError> {
        let snapshot = self.snapshots.load().await?;
        let since = snapshot.as_ref().and_then(|s| s.fetched_at);

        let fetch_started = Instant::now();
        let fetched = self.feed.fetch(since).await;
        record_external("feed", fetch_started, fetched.is_ok());

        let feed = match fetched? {
            FeedFetch::NotModified => {
                debug!("Feed not modified since {:?}", since);
                return Ok(CycleOutcome::NotModified);
            }
            FeedFetch::Fetched(feed) => feed,
        };
        let fetched_at = feed.last_build_date.unwrap_or_else(Utc::now);

        let mut report = CycleReport {
            fetched: feed.items.len(),
            ..Default::default()
        };

        let baseline = match snapshot {
            Some(snapshot) => snapshot.feed,
            None => {
                info!(
                    "No feed snapshot, using current feed ({} items) as baseline",
                    feed.items.len()
                );
                self.snapshots.save(&feed, fetched_at).await?;
                report.bootstrapped = true;
                feed.clone()
            }
        };

        let new_items = feed.items_not_in(&baseline);
        report.new_items = new_items.len();

        if !new_items.is_empty() {
            let pending = self.match_items(&new_items, &mut report).await?;
            self.persist(pending, &mut report).await;
        }

        self.snapshots.save(&feed, fetched_at).await?;

        Ok(CycleOutcome::Completed(report))
    }

    /// Parse and resolve new items into appends against local titles.
    ///
    /// An unreachable catalog or a store failure aborts the cycle (before the
    /// snapshot moves on). Unparsable, unknown, refused or untracked items are
    /// dropped.
    async fn match_items(
        &self,
        items: &[FeedItem],
        report: &mut CycleReport,
    ) -> Result<Vec<PendingAppend>, DiscoveryError> {
        let parsed: Vec<ParsedHeadline> = items
            .iter()
            .filter_map(|item| {
                let parsed = parse_headline(&item.title);
                if parsed.is_none() {
                    debug!(guid = %item.guid, "Unrecognized headline '{}'", item.title);
                }
                parsed
            })
            .collect();
        report.unparsed = items.len() - parsed.len();

        let titles: Vec<String> = parsed.iter().map(|h| h.title.clone()).collect();
        let lookups_started = Instant::now();
        let lookups: Vec<Result<Option<i64>, MatcherError>> = stream::iter(titles)
            .map(|title| {
                let matcher = Arc::clone(&self.matcher);
                async move { matcher.resolve(&title).await }
            })
            .buffered(self.match_concurrency)
            .collect()
            .await;
        record_external(
            "catalog",
            lookups_started,
            lookups.iter().all(|lookup| lookup.is_ok()),
        );

        let mut pending = Vec::new();
        for (headline, lookup) in parsed.into_iter().zip(lookups) {
            let canonical_id = match lookup {
                Ok(Some(canonical_id)) => canonical_id,
                Ok(None) => {
                    debug!("No catalog entry for '{}'", headline.title);
                    report.unmatched += 1;
                    continue;
                }
                Err(e) if !e.is_fatal() => {
                    warn!("Catalog lookup for '{}' refused: {}", headline.title, e);
                    report.failed += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let Some(title) = self.store.find_by_canonical_id(canonical_id)? else {
                debug!(
                    "Catalog id {} ('{}') is not tracked",
                    canonical_id, headline.title
                );
                report.untracked += 1;
                continue;
            };

            pending.push(PendingAppend {
                display: format!("{} #{}", title.title, headline.episode),
                append: EpisodeAppend {
                    title_id: title.id,
                    episode: headline.episode,
                },
            });
        }

        Ok(pending)
    }

    /// Apply all appends as one batch of independent operations.
    ///
    /// Every affected title stays locked until its cache entry is gone.
    async fn persist(&self, pending: Vec<PendingAppend>, report: &mut CycleReport) {
        if pending.is_empty() {
            return;
        }

        let title_ids: BTreeSet<&str> = pending
            .iter()
            .map(|p| p.append.title_id.as_str())
            .collect();
        let mut guards = Vec::with_capacity(title_ids.len());
        for title_id in title_ids {
            guards.push(self.locks.lock(title_id).await);
        }

        let appends: Vec<EpisodeAppend> = pending.iter().map(|p| p.append.clone()).collect();
        let outcomes = self.store.append_episodes(&appends);

        let mut touched = HashSet::new();
        for (item, outcome) in pending.into_iter().zip(outcomes) {
            match outcome {
                AppendOutcome::Inserted => {
                    report.inserted += 1;
                    touched.insert(item.append.title_id);
                    report.inserted_episodes.push(item.display);
                }
                AppendOutcome::AlreadyPresent => {
                    debug!("{} already recorded", item.display);
                    report.duplicates += 1;
                }
                AppendOutcome::TitleMissing => {
                    warn!("Title for {} disappeared before append", item.display);
                    report.failed += 1;
                }
                AppendOutcome::Failed(e) => {
                    warn!("Failed to append {}: {}", item.display, e);
                    report.failed += 1;
                }
            }
        }

        for title_id in touched {
            if let Err(e) = self.cache.unlink(&title_key(&title_id)).await {
                error!("Failed to invalidate cached title {}: {}", title_id, e);
            }
        }
        drop(guards);
    }
}

fn record_external(service: &str, started: Instant, ok: bool) {
    metrics::EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service])
        .observe(started.elapsed().as_secs_f64());
    metrics::EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, if ok { "success" } else { "error" }])
        .inc();
}

fn log_report(report: &CycleReport) {
    for (outcome, count) in [
        ("inserted", report.inserted),
        ("duplicate", report.duplicates),
        ("unparsed", report.unparsed),
        ("unmatched", report.unmatched),
        ("untracked", report.untracked),
        ("failed", report.failed),
    ] {
        metrics::DISCOVERY_ITEMS
            .with_label_values(&[outcome])
            .inc_by(count as u64);
    }
    metrics::EPISODES_DISCOVERED.inc_by(report.inserted as u64);

    if report.inserted > 0 {
        info!(
            "Discovered {} episode(s): {}",
            report.inserted,
            report.inserted_episodes.join(", ")
        );
    } else {
        debug!(
            "Discovery cycle done: {} new item(s), nothing inserted",
            report.new_items
        );
    }
}
