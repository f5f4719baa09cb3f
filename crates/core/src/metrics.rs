//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Discovery (cycles, feed items, inserted episodes)
//! - Ratings and follows
//! - External services (feed, catalog lookups)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Discovery Metrics
// =============================================================================

/// Discovery cycles by result.
pub static DISCOVERY_CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("animerate_discovery_cycles_total", "Total discovery cycles"),
        &["result"], // "completed", "not_modified", "skipped", "failed", "timed_out"
    )
    .unwrap()
});

/// Discovery cycle duration in seconds.
pub static DISCOVERY_CYCLE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "animerate_discovery_cycle_duration_seconds",
            "Duration of a discovery cycle",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        &["result"],
    )
    .unwrap()
});

/// New feed items by what happened to them.
pub static DISCOVERY_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "animerate_discovery_items_total",
            "New feed items seen by discovery",
        ),
        // "inserted", "duplicate", "unparsed", "unmatched", "untracked", "failed"
        &["outcome"],
    )
    .unwrap()
});

/// Episodes added to the catalog by discovery.
pub static EPISODES_DISCOVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "animerate_episodes_discovered_total",
        "Total episodes added by discovery",
    )
    .unwrap()
});

// =============================================================================
// Rating Metrics
// =============================================================================

/// Votes by kind.
pub static VOTES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("animerate_votes_total", "Total episode votes"),
        &["kind"], // "new", "changed"
    )
    .unwrap()
});

/// Follow state changes.
pub static FOLLOW_CHANGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("animerate_follow_changes_total", "Total follow changes"),
        &["action"], // "follow", "unfollow"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "animerate_external_service_duration_seconds",
            "Duration of external service requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service"], // "feed", "catalog"
    )
    .unwrap()
});

/// External service requests by result.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "animerate_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "result"], // result: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Discovery
        Box::new(DISCOVERY_CYCLES.clone()),
        Box::new(DISCOVERY_CYCLE_DURATION.clone()),
        Box::new(DISCOVERY_ITEMS.clone()),
        Box::new(EPISODES_DISCOVERED.clone()),
        // Ratings
        Box::new(VOTES_TOTAL.clone()),
        Box::new(FOLLOW_CHANGES.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
