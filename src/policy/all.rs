//! Unconditional invalidation.

use crate::node::{is_empty_bucket_node, is_entry_node, NodeId};
use crate::store::traits::NodeStore;
use crate::traversal::MaintenanceError;

use super::{Decision, EvictionPolicy};

/// Removes every entry node, and every bucket left empty by those removals.
///
/// Because decisions run in post-order, bucket pruning cascades upward in
/// the same traversal: a bucket emptied here is removed on its own
/// departure, which can in turn empty (and doom) its parent. Only the
/// root bucket survives a full wipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidateAll;

impl<S: NodeStore + ?Sized> EvictionPolicy<S> for InvalidateAll {
    fn name(&self) -> &'static str {
        "invalidate-all"
    }

    fn decide(
        &self,
        store: &S,
        node: NodeId,
        _level: u32,
    ) -> Result<Decision, MaintenanceError> {
        if is_entry_node(store, node)? || is_empty_bucket_node(store, node)? {
            Ok(Decision::Remove)
        } else {
            Ok(Decision::Keep)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeProperties;
    use crate::store::memory::MemoryTree;
    use serde_json::json;

    fn entry_props(uri: &str) -> NodeProperties {
        NodeProperties::entry("uri", json!({ "uri": uri }), vec![])
    }

    #[test]
    fn test_entries_and_empty_buckets_are_removed() {
        let tree = MemoryTree::new();
        let bucket = tree.add_bucket(tree.root(), "250").unwrap();
        let entry = tree.add_entry(bucket, "entry-0", entry_props("/a")).unwrap();
        let empty = tree.add_bucket(tree.root(), "493").unwrap();

        let session = tree.session();
        let policy = InvalidateAll;
        assert_eq!(
            policy.decide(&session, entry, 2).unwrap(),
            Decision::Remove
        );
        assert_eq!(policy.decide(&session, empty, 1).unwrap(), Decision::Remove);
        // A bucket still holding its entry is kept on this visit.
        assert_eq!(policy.decide(&session, bucket, 1).unwrap(), Decision::Keep);
    }

    #[test]
    fn test_root_is_never_removed() {
        let tree = MemoryTree::new();
        let session = tree.session();
        assert_eq!(
            InvalidateAll.decide(&session, tree.root(), 0).unwrap(),
            Decision::Keep
        );
    }
}
