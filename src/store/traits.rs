use thiserror::Error;

use crate::node::{NodeId, NodeProperties};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("node {0} not found")]
    NotFound(NodeId),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("commit failed: {0}")]
    Commit(String),
}

/// Transaction-scoped view of a persisted cache tree.
///
/// One value of this trait is the transaction handle for one maintenance
/// run: reads observe the session's own pending removals, `remove` stages a
/// removal, and `commit` makes everything staged durable. The handle is
/// exclusively owned by a single traversal session for its lifetime; any
/// cross-session isolation is the backing store's concern.
pub trait NodeStore {
    /// Node name. The traversal root carries a reserved name.
    fn name(&self, node: NodeId) -> Result<String, StoreError>;

    /// Remaining children of `node`, in stored order, excluding removals
    /// staged in this session.
    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, StoreError>;

    /// Node properties.
    fn properties(&self, node: NodeId) -> Result<NodeProperties, StoreError>;

    /// Stage removal of `node` (and any subtree still under it). The
    /// removal becomes visible to this session immediately and durable at
    /// the next `commit`.
    fn remove(&mut self, node: NodeId) -> Result<(), StoreError>;

    /// Persist all staged removals. Staged removals are flushed strictly in
    /// the order they were made.
    fn commit(&mut self) -> Result<(), StoreError>;
}
