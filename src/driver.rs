//! Maintenance job driver.
//!
//! The driver owns the run discipline around a traversal session: open it,
//! walk the tree, and close it on every exit path so pending removal
//! batches are never stranded, including after a traversal aborted by a
//! key-reconstruction or commit failure, where everything already staged
//! or committed is preserved. Re-running a failed job on a fresh session
//! is safe: nodes removed by the earlier attempt are simply absent.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::MaintenanceConfig;
use crate::node::NodeId;
use crate::policy::EvictionPolicy;
use crate::store::traits::NodeStore;
use crate::traversal::{MaintenanceError, TraversalSession};

/// Outcome of one completed maintenance run.
#[derive(Debug, Clone)]
pub struct MaintenanceReport {
    /// Nodes removed, entries and pruned buckets alike.
    pub evictions: u64,
    /// Nodes visited.
    pub visits: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// A reusable maintenance job: one policy, one configuration, any number
/// of runs over any store.
pub struct MaintenanceJob<P> {
    policy: P,
    config: MaintenanceConfig,
}

impl<P> MaintenanceJob<P> {
    pub fn new(policy: P, config: MaintenanceConfig) -> Self {
        Self { policy, config }
    }

    #[must_use]
    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    /// Run the job over the tree rooted at `root`.
    ///
    /// `close()` is invoked whether or not the walk succeeds. On failure
    /// the walk error is surfaced and committed partial progress remains
    /// durable.
    pub fn run<S>(&self, store: &mut S, root: NodeId) -> Result<MaintenanceReport, MaintenanceError>
    where
        S: NodeStore,
        for<'p> &'p P: EvictionPolicy<S>,
    {
        let mut session = TraversalSession::new(store, &self.policy, &self.config);
        let policy = session.policy_name();
        info!(
            policy,
            max_depth = self.config.max_depth,
            commit_threshold = self.config.commit_threshold,
            "starting cache maintenance run"
        );

        let walk = session.visit(root);
        let flush = session.close();

        let report = MaintenanceReport {
            evictions: session.eviction_count(),
            visits: session.visit_count(),
            elapsed: session.elapsed(),
        };

        if let Err(e) = walk {
            warn!(
                policy,
                evictions = report.evictions,
                error = %e,
                "cache maintenance run aborted; committed progress is preserved"
            );
            return Err(e);
        }
        flush?;

        crate::metrics::record_run(policy, report.evictions, report.elapsed);
        info!(
            policy,
            evictions = report.evictions,
            visits = report.visits,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "cache maintenance run complete"
        );
        Ok(report)
    }
}
