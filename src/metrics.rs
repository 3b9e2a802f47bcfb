// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for cache maintenance.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the host
//! picks the exporter.
//!
//! # Metric Naming Convention
//! - `treecache_maintenance_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `policy`: active eviction policy label
//! - `reason`: commit trigger (`threshold`, `close`)

use std::time::Duration;

use metrics::{counter, histogram};

use crate::batching::delta_batcher::CommitReason;

/// Record one removed node.
pub fn record_eviction(policy: &str) {
    counter!(
        "treecache_maintenance_evictions_total",
        "policy" => policy.to_string()
    )
    .increment(1);
}

/// Record one commit of a removal batch.
pub fn record_commit(reason: CommitReason) {
    counter!(
        "treecache_maintenance_commits_total",
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record an overload warning from a long-running traversal.
pub fn record_overload_warning(policy: &str) {
    counter!(
        "treecache_maintenance_overload_warnings_total",
        "policy" => policy.to_string()
    )
    .increment(1);
}

/// Record a completed maintenance run.
pub fn record_run(policy: &str, evictions: u64, elapsed: Duration) {
    counter!(
        "treecache_maintenance_runs_total",
        "policy" => policy.to_string()
    )
    .increment(1);
    histogram!(
        "treecache_maintenance_run_seconds",
        "policy" => policy.to_string()
    )
    .record(elapsed.as_secs_f64());
    histogram!(
        "treecache_maintenance_run_evictions",
        "policy" => policy.to_string()
    )
    .record(evictions as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These verify the API compiles and doesn't panic without a recorder
    // installed; assertion-level coverage belongs to the host's exporter.

    #[test]
    fn test_record_eviction() {
        record_eviction("invalidate-all");
        record_eviction("by-cache-config");
    }

    #[test]
    fn test_record_commit() {
        record_commit(CommitReason::Threshold);
        record_commit(CommitReason::Close);
    }

    #[test]
    fn test_record_overload_warning() {
        record_overload_warning("invalidate-expired");
    }

    #[test]
    fn test_record_run() {
        record_run("invalidate-all", 40, Duration::from_millis(12));
        record_run("by-cache-config", 0, Duration::ZERO);
    }
}
