//! Depth-bounded tree traversal with batched commits.
//!
//! A [`TraversalSession`] walks the cache tree depth-first from the root,
//! bounded by the configured maximum depth. Arrival at a node counts a
//! visit and runs the overload check; departure (post-order) asks the
//! active policy for a keep-or-remove decision. Post-order matters:
//! children are decided (and possibly removed) before their parent
//! bucket is judged empty, which is what lets pruning cascade up a chain
//! of emptied buckets within a single traversal.
//!
//! Removals are committed in batches through the session's
//! [`DeltaBatcher`]; `close()` flushes whatever is still pending and must
//! run on every exit path, including after a failed walk, so committed
//! partial progress is never stranded.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::batching::delta_batcher::{CommitReason, DeltaBatcher};
use crate::config::MaintenanceConfig;
use crate::key::KeyCodecError;
use crate::node::NodeId;
use crate::policy::{Decision, EvictionPolicy};
use crate::store::traits::{NodeStore, StoreError};

/// Wall-clock budget after which a still-running traversal starts warning.
const OVERLOAD_WARN_THRESHOLD: Duration = Duration::from_millis(2000);
/// The overload check runs on every N-th visited node.
const OVERLOAD_CHECK_INTERVAL: u64 = 10;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    /// An entry node's key could not be reconstructed. Fatal for the
    /// traversal; batches committed before the failure stay committed.
    #[error("cache key reconstruction failed: {0}")]
    KeyReconstruction(#[from] KeyCodecError),
    /// The node store failed, most importantly on commit. Fatal.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One maintenance run over a cache tree.
///
/// The session exclusively borrows the store's transaction handle for its
/// lifetime and is the only mutator of the delta and eviction counters.
/// Drive it with [`visit`](Self::visit) then [`close`](Self::close); the
/// [`MaintenanceJob`](crate::driver::MaintenanceJob) driver does both and
/// guarantees the close.
pub struct TraversalSession<'s, S, P>
where
    S: NodeStore,
    P: EvictionPolicy<S>,
{
    store: &'s mut S,
    policy: P,
    max_depth: u32,
    batcher: DeltaBatcher,
    visits: u64,
    started_at: Instant,
}

impl<'s, S, P> TraversalSession<'s, S, P>
where
    S: NodeStore,
    P: EvictionPolicy<S>,
{
    pub fn new(store: &'s mut S, policy: P, config: &MaintenanceConfig) -> Self {
        Self {
            store,
            policy,
            max_depth: config.max_depth,
            batcher: DeltaBatcher::new(config.commit_threshold),
            visits: 0,
            started_at: Instant::now(),
        }
    }

    /// Walk the tree rooted at `root`.
    pub fn visit(&mut self, root: NodeId) -> Result<(), MaintenanceError> {
        self.walk(root, 0)
    }

    fn walk(&mut self, node: NodeId, level: u32) -> Result<(), MaintenanceError> {
        self.entering();
        if level < self.max_depth {
            for child in self.store.children(node)? {
                self.walk(child, level + 1)?;
            }
        }
        self.leaving(node, level)
    }

    fn entering(&mut self) {
        self.visits += 1;
        if self.visits % OVERLOAD_CHECK_INTERVAL == 0 {
            let elapsed = self.started_at.elapsed();
            if elapsed > OVERLOAD_WARN_THRESHOLD {
                warn!(
                    policy = self.policy.name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    visits = self.visits,
                    "cache maintenance traversal is taking unusually long"
                );
                crate::metrics::record_overload_warning(self.policy.name());
            }
        }
    }

    fn leaving(&mut self, node: NodeId, level: u32) -> Result<(), MaintenanceError> {
        match self.policy.decide(&*self.store, node, level)? {
            Decision::Keep => Ok(()),
            Decision::Remove => {
                self.store.remove(node)?;
                debug!(node = %node, level, policy = self.policy.name(), "removed node");
                crate::metrics::record_eviction(self.policy.name());
                self.persist()
            }
        }
    }

    /// Commit check for one removal. The check precedes the increment:
    /// with threshold `T`, commits land every `T + 1` removals.
    fn persist(&mut self) -> Result<(), MaintenanceError> {
        if self.batcher.commit_due() {
            let pending = self.batcher.pending();
            self.store.commit()?;
            self.batcher.mark_committed();
            debug!(
                pending,
                reason = CommitReason::Threshold.as_str(),
                "committed removal batch"
            );
            crate::metrics::record_commit(CommitReason::Threshold);
        }
        self.batcher.record_removal();
        Ok(())
    }

    /// Flush any pending removals. Required once per session, on every
    /// exit path; calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), MaintenanceError> {
        if self.batcher.has_pending() {
            let pending = self.batcher.pending();
            self.store.commit()?;
            self.batcher.mark_committed();
            debug!(
                pending,
                reason = CommitReason::Close.as_str(),
                "committed removal batch"
            );
            crate::metrics::record_commit(CommitReason::Close);
        }
        Ok(())
    }

    /// Total nodes removed so far in this session. Monotone.
    #[must_use]
    pub fn eviction_count(&self) -> u64 {
        self.batcher.evictions()
    }

    /// Total nodes visited so far.
    #[must_use]
    pub fn visit_count(&self) -> u64 {
        self.visits
    }

    /// Wall-clock time since the session was opened.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Label of the active policy.
    #[must_use]
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }
}
