//! Eviction policies for cache tree maintenance.
//!
//! A policy is the single pluggable decision point of a traversal: for every
//! node the engine departs in post-order, the policy answers keep-or-remove.
//! Children are always decided before their parent, so a bucket emptied by
//! this traversal is already empty when its own decision is made.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Policy Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  by_config.rs  - evict entries governed by a cache config    │
//! │  └─ ByCacheConfig: reconstruct key, ask config.knows()       │
//! │  all.rs        - evict every entry, cascade bucket pruning   │
//! │  └─ InvalidateAll: full wipe below the root                  │
//! │  expired.rs    - evict entries past their expiry instant     │
//! │  └─ InvalidateExpired: stored expiry or per-entry override   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All variants prune empty non-root buckets on the way out. New policies
//! only need to implement [`EvictionPolicy`]; the engine is agnostic to
//! policy identity.

pub mod all;
pub mod by_config;
pub mod expired;

use crate::node::NodeId;
use crate::store::traits::NodeStore;
use crate::traversal::MaintenanceError;

/// Outcome of a policy decision for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Remove,
}

/// Keep-or-remove strategy invoked on post-order departure from each node.
pub trait EvictionPolicy<S: NodeStore + ?Sized> {
    /// Short label used in overload warnings, logs and metrics.
    fn name(&self) -> &'static str;

    /// Decide the fate of `node` at traversal depth `level`.
    fn decide(&self, store: &S, node: NodeId, level: u32)
        -> Result<Decision, MaintenanceError>;
}

impl<S, P> EvictionPolicy<S> for &P
where
    S: NodeStore + ?Sized,
    P: EvictionPolicy<S> + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decide(
        &self,
        store: &S,
        node: NodeId,
        level: u32,
    ) -> Result<Decision, MaintenanceError> {
        (**self).decide(store, node, level)
    }
}
