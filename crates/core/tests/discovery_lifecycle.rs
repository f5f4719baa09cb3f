//! Discovery lifecycle integration tests.
//!
//! These tests drive the discovery pipeline against an on-disk catalog with
//! a mock feed and a mock external catalog:
//! - Baseline, diff and snapshot replacement across cycles
//! - Dropped items (unparsable, unknown, untracked) and duplicate labels
//! - Conditional fetches and overlapping cycles
//! - Visibility of discovered episodes through the title service, including
//!   appends that land while a title is being memoized

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_test::assert_ok;

use animerate_core::{
    cache::{KvCache, MemoryCache},
    catalog::{
        AppendOutcome, CatalogError, EpisodeAppend, NewTitle, RatingWrite, SearchHit,
        SqliteTitleStore, Title, TitleStore,
    },
    discovery::{CycleOutcome, CycleReport, DiscoveryConfig, DiscoveryPipeline},
    search::FuzzyQuery,
    service::TitleService,
    testing::{fixtures, MockCatalogMatcher, MockFeedSource},
};

const FRIEREN: i64 = 154587;
const DUNGEON_MESHI: i64 = 153518;

/// Test helper wiring a pipeline and a title service over one store.
struct TestHarness {
    pipeline: Arc<DiscoveryPipeline>,
    service: TitleService,
    feed: MockFeedSource,
    matcher: MockCatalogMatcher,
    store: Arc<SqliteTitleStore>,
    frieren_id: String,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteTitleStore::new(&temp_dir.path().join("catalog.db"))
                .expect("Failed to create title store"),
        );
        let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());

        let frieren = store
            .insert(fixtures::new_title(FRIEREN, "Sousou no Frieren", &["Frieren"]))
            .expect("Failed to insert title");

        let feed = MockFeedSource::new();
        let matcher = MockCatalogMatcher::new();
        matcher.add_match("Sousou no Frieren", FRIEREN).await;
        matcher.add_match("Dungeon Meshi", DUNGEON_MESHI).await;

        let config = DiscoveryConfig {
            enabled: true,
            feed_url: "https://releases.example.org/rss".to_string(),
            ..Default::default()
        };
        let service = TitleService::new(
            Arc::clone(&store) as Arc<dyn TitleStore>,
            Arc::clone(&cache),
            Duration::from_secs(3600),
        );
        let pipeline = DiscoveryPipeline::new(
            Arc::new(feed.clone()),
            Arc::new(matcher.clone()),
            Arc::clone(&store) as Arc<dyn TitleStore>,
            cache,
            &config,
        )
        .with_title_locks(service.title_locks());

        Self {
            pipeline: Arc::new(pipeline),
            service,
            feed,
            matcher,
            store,
            frieren_id: frieren.id,
            _temp_dir: temp_dir,
        }
    }

    /// Run a cycle over `items` and return its report.
    async fn cycle(&self, items: &[(&str, &str)]) -> CycleReport {
        self.feed.push_feed(fixtures::feed(items)).await;
        match assert_ok!(self.pipeline.run_cycle().await) {
            CycleOutcome::Completed(report) => report,
            other => panic!("expected a completed cycle, got {:?}", other),
        }
    }

    async fn snapshot_guids(&self) -> Vec<String> {
        let snapshot = assert_ok!(self.pipeline.snapshots().load().await)
            .expect("snapshot should exist");
        snapshot.feed.items.into_iter().map(|i| i.guid).collect()
    }

    fn frieren_episodes(&self) -> Vec<String> {
        self.store
            .get(&self.frieren_id)
            .expect("title should exist")
            .episodes
            .into_iter()
            .map(|e| e.episode)
            .collect()
    }
}

#[tokio::test]
async fn test_new_release_flows_into_catalog() {
    let h = TestHarness::new().await;

    let report = h
        .cycle(&[("a", "Sousou no Frieren #1"), ("b", "Dungeon Meshi #1")])
        .await;
    assert!(report.bootstrapped);
    assert_eq!(report.new_items, 0);
    assert!(h.frieren_episodes().is_empty());

    // Cached before discovery, so discovery must invalidate it.
    let before = assert_ok!(h.service.get_title(&h.frieren_id, None).await);
    assert!(before.episodes.is_empty());

    let report = h
        .cycle(&[
            ("a", "Sousou no Frieren #1"),
            ("b", "Dungeon Meshi #1"),
            ("c", "Sousou no Frieren #2"),
        ])
        .await;
    assert_eq!(report.fetched, 3);
    assert_eq!(report.new_items, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.inserted_episodes, vec!["Sousou no Frieren #2"]);

    assert_eq!(h.frieren_episodes(), vec!["2"]);
    assert_eq!(h.snapshot_guids().await, vec!["a", "b", "c"]);

    let after = assert_ok!(h.service.get_title(&h.frieren_id, None).await);
    assert_eq!(after.episodes.len(), 1);
    assert_eq!(after.episodes[0].episode, "2");
}

#[tokio::test]
async fn test_unparsable_item_persists_nothing_but_advances_snapshot() {
    let h = TestHarness::new().await;
    h.cycle(&[("a", "Sousou no Frieren #1"), ("b", "Dungeon Meshi #1")])
        .await;

    let report = h
        .cycle(&[
            ("a", "Sousou no Frieren #1"),
            ("b", "Dungeon Meshi #1"),
            ("c", "Sousou no Frieren - Episode 2 [1080p]"),
        ])
        .await;

    assert_eq!(report.new_items, 1);
    assert_eq!(report.unparsed, 1);
    assert_eq!(report.inserted, 0);
    assert!(h.matcher.queries().await.is_empty());
    assert!(h.frieren_episodes().is_empty());
    assert_eq!(h.snapshot_guids().await, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_not_modified_does_no_work() {
    let h = TestHarness::new().await;
    h.cycle(&[("a", "Sousou no Frieren #1")]).await;
    let before = assert_ok!(h.pipeline.snapshots().load().await).unwrap();

    h.feed.push_not_modified().await;
    let outcome = assert_ok!(h.pipeline.run_cycle().await);
    assert_eq!(outcome, CycleOutcome::NotModified);

    let requests = h.feed.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], None);
    assert_eq!(requests[1], before.fetched_at);

    let after = assert_ok!(h.pipeline.snapshots().load().await).unwrap();
    assert_eq!(after.feed, before.feed);
    assert_eq!(after.fetched_at, before.fetched_at);
    assert!(h.matcher.queries().await.is_empty());
}

#[tokio::test]
async fn test_dropped_items_and_duplicate_labels() {
    let h = TestHarness::new().await;
    h.cycle(&[("a", "Sousou no Frieren #1")]).await;

    let report = h
        .cycle(&[
            ("a", "Sousou no Frieren #1"),
            ("b", "Sousou no Frieren #2"),
            // Same label under a second guid (re-release)
            ("c", "Sousou no Frieren #2"),
            // Known externally, not tracked locally
            ("d", "Dungeon Meshi #1"),
            // Unknown to the external catalog
            ("e", "Some Unknown Show #1"),
        ])
        .await;

    assert_eq!(report.new_items, 4);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.untracked, 1);
    assert_eq!(report.unmatched, 1);
    assert_eq!(h.frieren_episodes(), vec!["2"]);
}

#[tokio::test]
async fn test_unmatched_items_are_not_retried() {
    let h = TestHarness::new().await;
    h.cycle(&[]).await;

    let report = h.cycle(&[("x", "Brand New Show #1")]).await;
    assert_eq!(report.unmatched, 1);

    // The show becomes known later, but its item is already in the snapshot.
    h.matcher.add_match("Brand New Show", FRIEREN).await;
    let report = h
        .cycle(&[("x", "Brand New Show #1"), ("y", "Sousou no Frieren #5")])
        .await;

    assert_eq!(report.new_items, 1);
    assert_eq!(
        h.matcher.queries().await,
        vec!["Brand New Show", "Sousou no Frieren"]
    );
    assert_eq!(h.frieren_episodes(), vec!["5"]);
}

#[tokio::test]
async fn test_unreadable_catalog_retries_next_cycle() {
    let h = TestHarness::new().await;
    h.cycle(&[("a", "Sousou no Frieren #1")]).await;

    h.matcher.break_on("Sousou no Frieren").await;
    h.feed
        .push_feed(fixtures::feed(&[
            ("a", "Sousou no Frieren #1"),
            ("b", "Sousou no Frieren #2"),
        ]))
        .await;
    assert!(h.pipeline.run_cycle().await.is_err());
    assert_eq!(h.snapshot_guids().await, vec!["a"]);

    // A failed cycle is logged and swallowed by the scheduler entry point.
    h.feed
        .push_feed(fixtures::feed(&[
            ("a", "Sousou no Frieren #1"),
            ("b", "Sousou no Frieren #2"),
        ]))
        .await;
    assert!(h.pipeline.tick().await.is_none());
    assert!(h.frieren_episodes().is_empty());
}

#[tokio::test]
async fn test_rate_limited_lookup_drops_only_its_item() {
    let h = TestHarness::new().await;
    h.cycle(&[("a", "Sousou no Frieren #1")]).await;

    h.matcher.fail_on("Busy Show").await;
    let report = h
        .cycle(&[
            ("a", "Sousou no Frieren #1"),
            ("b", "Busy Show #1"),
            ("c", "Sousou no Frieren #2"),
        ])
        .await;

    assert_eq!(report.new_items, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(h.frieren_episodes(), vec!["2"]);
    assert_eq!(h.snapshot_guids().await, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_overlapping_cycle_is_skipped() {
    let h = TestHarness::new().await;
    h.feed.set_delay(Duration::from_millis(200)).await;
    h.feed
        .push_feed(fixtures::feed(&[("a", "Sousou no Frieren #1")]))
        .await;

    let first = {
        let pipeline = Arc::clone(&h.pipeline);
        tokio::spawn(async move { pipeline.run_cycle().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.pipeline.is_running());

    let second = assert_ok!(h.pipeline.run_cycle().await);
    assert_eq!(second, CycleOutcome::Skipped);

    let first = first.await.expect("cycle task panicked");
    assert!(matches!(first, Ok(CycleOutcome::Completed(_))));
    assert!(!h.pipeline.is_running());

    // Only the first cycle reached the feed.
    assert_eq!(h.feed.requests().await.len(), 1);
}

/// Store whose reads stall after loading, widening the window between a
/// title read and its memoization.
struct StallingStore {
    inner: Arc<SqliteTitleStore>,
    read_done: Arc<Notify>,
    stall: Duration,
}

impl TitleStore for StallingStore {
    fn insert(&self, title: NewTitle) -> Result<Title, CatalogError> {
        self.inner.insert(title)
    }

    fn get(&self, id: &str) -> Result<Title, CatalogError> {
        let title = self.inner.get(id)?;
        self.read_done.notify_one();
        std::thread::sleep(self.stall);
        Ok(title)
    }

    fn find_by_canonical_id(&self, canonical_id: i64) -> Result<Option<Title>, CatalogError> {
        self.inner.find_by_canonical_id(canonical_id)
    }

    fn append_episodes(&self, appends: &[EpisodeAppend]) -> Vec<AppendOutcome> {
        self.inner.append_episodes(appends)
    }

    fn upsert_rating(
        &self,
        title_id: &str,
        episode: &str,
        user: &str,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<RatingWrite, CatalogError> {
        self.inner.upsert_rating(title_id, episode, user, score, at)
    }

    fn add_follower(&self, title_id: &str, user: &str) -> Result<bool, CatalogError> {
        self.inner.add_follower(title_id, user)
    }

    fn remove_follower(&self, title_id: &str, user: &str) -> Result<bool, CatalogError> {
        self.inner.remove_follower(title_id, user)
    }

    fn search(&self, query: &FuzzyQuery) -> Result<Vec<SearchHit>, CatalogError> {
        self.inner.search(query)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_discovery_during_cache_fill_is_not_hidden() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inner = Arc::new(
        SqliteTitleStore::new(&temp_dir.path().join("catalog.db"))
            .expect("Failed to create title store"),
    );
    let frieren = assert_ok!(inner.insert(fixtures::new_title(
        FRIEREN,
        "Sousou no Frieren",
        &[]
    )));
    let read_done = Arc::new(Notify::new());
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());

    let service = Arc::new(TitleService::new(
        Arc::new(StallingStore {
            inner: Arc::clone(&inner),
            read_done: Arc::clone(&read_done),
            stall: Duration::from_millis(200),
        }),
        Arc::clone(&cache),
        Duration::from_secs(3600),
    ));

    let feed = MockFeedSource::new();
    let matcher = MockCatalogMatcher::new();
    matcher.add_match("Sousou no Frieren", FRIEREN).await;
    let pipeline = DiscoveryPipeline::new(
        Arc::new(feed.clone()),
        Arc::new(matcher),
        Arc::clone(&inner) as Arc<dyn TitleStore>,
        cache,
        &DiscoveryConfig::default(),
    )
    .with_title_locks(service.title_locks());

    feed.push_feed(fixtures::feed(&[("a", "Sousou no Frieren #1")]))
        .await;
    assert_ok!(pipeline.run_cycle().await);

    // A cache fill reads the title before the new episode exists...
    let fill = {
        let service = Arc::clone(&service);
        let title_id = frieren.id.clone();
        tokio::spawn(async move { service.get_title(&title_id, None).await })
    };
    read_done.notified().await;

    // ...and discovery appends while that fill is still in flight.
    feed.push_feed(fixtures::feed(&[
        ("a", "Sousou no Frieren #1"),
        ("b", "Sousou no Frieren #2"),
    ]))
    .await;
    assert_ok!(pipeline.run_cycle().await);

    let stale = assert_ok!(fill.await.expect("fill task panicked"));
    assert!(stale.episodes.is_empty());

    let view = assert_ok!(service.get_title(&frieren.id, None).await);
    let labels: Vec<&str> = view.episodes.iter().map(|e| e.episode.as_str()).collect();
    assert_eq!(labels, vec!["2"]);
}
