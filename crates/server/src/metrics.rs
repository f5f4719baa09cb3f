//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the animerate server:
//! - HTTP request metrics (latency, counts, errors)
//! - Discovery scheduler state (collected dynamically)
//! - Core discovery, rating and external service metrics

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "animerate_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("animerate_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "animerate_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "animerate_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Discovery Scheduler Metrics
// =============================================================================

/// Whether the background discovery loop is active (1 = active).
pub static DISCOVERY_SCHEDULED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "animerate_discovery_scheduled",
        "Whether the discovery loop is running (1 = running)",
    )
    .unwrap()
});

/// Whether a discovery cycle is running right now (1 = running).
pub static DISCOVERY_CYCLE_IN_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "animerate_discovery_cycle_in_progress",
        "Whether a discovery cycle is in progress (1 = yes)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Discovery scheduler
    registry
        .register(Box::new(DISCOVERY_SCHEDULED.clone()))
        .unwrap();
    registry
        .register(Box::new(DISCOVERY_CYCLE_IN_PROGRESS.clone()))
        .unwrap();

    // Core metrics (discovery, ratings, external services)
    for metric in animerate_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Update gauges from the current application state before encoding.
pub fn collect_dynamic_metrics(state: &AppState) {
    if let Some(scheduler) = state.discovery() {
        let status = scheduler.status();
        DISCOVERY_SCHEDULED.set(i64::from(status.scheduled));
        DISCOVERY_CYCLE_IN_PROGRESS.set(i64::from(status.cycle_in_progress));
    }
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static EPISODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/episodes/[^/]+").unwrap());
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = EPISODE_RE.replace_all(&result, "/episodes/{episode}");
    let result = NUMERIC_RE.replace_all(&result, "/{id}$1");
    result.to_string()
}
