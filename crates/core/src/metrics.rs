//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Source adapters (requests, latency)
//! - Discovery (searches, disambiguation, release deadline)
//! - Caches and release freshness

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Source adapters
// =============================================================================

/// Source requests total by source, operation and result.
pub static SOURCE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("indiefind_source_requests_total", "Total source requests"),
        &["source", "operation", "result"], // result: "success", "error"
    )
    .unwrap()
});

/// Source request duration in seconds.
pub static SOURCE_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "indiefind_source_request_duration_seconds",
            "Duration of source requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0]),
        &["source", "operation"],
    )
    .unwrap()
});

/// Adapter outcomes per search by source and status.
pub static SOURCE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "indiefind_source_outcomes_total",
            "Settled adapter outcomes per search",
        ),
        &["source", "status"], // status: "ok", "failed", "panicked"
    )
    .unwrap()
});

// =============================================================================
// Discovery
// =============================================================================

/// Searches total by result.
pub static SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("indiefind_searches_total", "Total discovery searches"),
        &["result"], // "found", "empty", "failed"
    )
    .unwrap()
});

/// Search duration in seconds.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("indiefind_search_duration_seconds", "Duration of searches")
            .buckets(vec![0.25, 0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 12.0]),
        &[],
    )
    .unwrap()
});

/// Groups split by disambiguation.
pub static DISAMBIGUATION_SPLITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "indiefind_disambiguation_splits_total",
        "Total identity groups split by release evidence",
    )
    .unwrap()
});

/// Release fetches abandoned at the soft deadline.
pub static RELEASE_FETCHES_ABANDONED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "indiefind_release_fetches_abandoned_total",
        "Release fetches still pending when the deadline passed",
    )
    .unwrap()
});

// =============================================================================
// Caches and freshness
// =============================================================================

/// Cache refreshes by cache and result.
pub static CACHE_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("indiefind_cache_refreshes_total", "Total cache refreshes"),
        &["cache", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Release checks by result.
pub static RELEASE_CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("indiefind_release_checks_total", "Total release freshness checks"),
        &["result"], // "new", "known", "none"
    )
    .unwrap()
});

/// New releases detected by platform.
pub static NEW_RELEASES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("indiefind_new_releases_total", "Total new releases detected"),
        &["platform"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sources
        Box::new(SOURCE_REQUESTS.clone()),
        Box::new(SOURCE_REQUEST_DURATION.clone()),
        Box::new(SOURCE_OUTCOMES.clone()),
        // Discovery
        Box::new(SEARCHES.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(DISAMBIGUATION_SPLITS.clone()),
        Box::new(RELEASE_FETCHES_ABANDONED.clone()),
        // Caches and freshness
        Box::new(CACHE_REFRESHES.clone()),
        Box::new(RELEASE_CHECKS.clone()),
        Box::new(NEW_RELEASES.clone()),
    ]
}
