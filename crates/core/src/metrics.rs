//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Result cache (page and count lookups)
//! - Query execution per surface
//! - Search index requests
//! - Bulk deletes and exports

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Result Cache Metrics
// =============================================================================

/// Cache lookups by kind and result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nzbdex_cache_lookups_total", "Total result cache lookups"),
        &["kind", "result"], // kind: "page", "count"; result: "hit", "miss"
    )
    .unwrap()
});

// =============================================================================
// Query Metrics
// =============================================================================

/// Query duration in seconds, cache hits included.
pub static QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "nzbdex_query_duration_seconds",
            "Duration of release queries",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["surface"],
    )
    .unwrap()
});

// =============================================================================
// Search Index Metrics
// =============================================================================

/// Search index requests by result.
pub static SEARCH_INDEX_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nzbdex_search_index_requests_total",
            "Total search index requests",
        ),
        &["result"], // "ok", "error", "timeout"
    )
    .unwrap()
});

// =============================================================================
// Bulk Metrics
// =============================================================================

/// Release deletions by result.
pub static RELEASES_DELETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nzbdex_releases_deleted_total", "Total release deletions"),
        &["result"], // "deleted", "partial", "missing"
    )
    .unwrap()
});

/// Entries written to export archives.
pub static EXPORT_ENTRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "nzbdex_export_entries_total",
        "Total NZB entries written to export archives",
    )
    .unwrap()
});

/// Get all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Cache
        Box::new(CACHE_LOOKUPS.clone()),
        // Queries
        Box::new(QUERY_DURATION.clone()),
        // Search index
        Box::new(SEARCH_INDEX_REQUESTS.clone()),
        // Bulk
        Box::new(RELEASES_DELETED.clone()),
        Box::new(EXPORT_ENTRIES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        CACHE_LOOKUPS.with_label_values(&["page", "hit"]).inc();
        assert!(!registry.gather().is_empty());
    }
}
