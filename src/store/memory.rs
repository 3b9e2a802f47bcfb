//! In-memory node store.
//!
//! [`MemoryTree`] is the shared tree: a concurrent node arena that any
//! number of sessions may read. [`MemorySession`] is one transaction
//! handle over it: removals are staged locally, visible only to the owning
//! session, and applied to the shared tree at `commit`. Commits from
//! concurrent sessions are serialized by a tree-wide lock so each batch is
//! applied whole.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::traits::{NodeStore, StoreError};
use crate::node::{NodeId, NodeProperties, ROOT_NODE_NAME};

struct NodeRecord {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    props: NodeProperties,
}

struct TreeInner {
    nodes: DashMap<NodeId, NodeRecord>,
    root: NodeId,
    next_id: AtomicU64,
    commit_lock: Mutex<()>,
}

/// Shared in-memory cache tree. Cheap to clone; clones refer to the same
/// tree.
#[derive(Clone)]
pub struct MemoryTree {
    inner: Arc<TreeInner>,
}

impl MemoryTree {
    /// Create a tree holding only the reserved root bucket.
    #[must_use]
    pub fn new() -> Self {
        let nodes = DashMap::new();
        let root = NodeId::new(0);
        nodes.insert(
            root,
            NodeRecord {
                name: ROOT_NODE_NAME.to_owned(),
                parent: None,
                children: Vec::new(),
                props: NodeProperties::bucket(),
            },
        );
        Self {
            inner: Arc::new(TreeInner {
                nodes,
                root,
                next_id: AtomicU64::new(1),
                commit_lock: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    /// Add a bucket node under `parent`.
    pub fn add_bucket(&self, parent: NodeId, name: &str) -> Result<NodeId, StoreError> {
        self.add_node(parent, name, NodeProperties::bucket())
    }

    /// Add an entry node under `parent`. The entry marker is always set,
    /// whatever `props` says.
    pub fn add_entry(
        &self,
        parent: NodeId,
        name: &str,
        mut props: NodeProperties,
    ) -> Result<NodeId, StoreError> {
        props.entry_marker = true;
        self.add_node(parent, name, props)
    }

    fn add_node(
        &self,
        parent: NodeId,
        name: &str,
        props: NodeProperties,
    ) -> Result<NodeId, StoreError> {
        {
            let parent_rec = self
                .inner
                .nodes
                .get(&parent)
                .ok_or(StoreError::NotFound(parent))?;
            // Entry nodes are leaves, always.
            if parent_rec.props.entry_marker {
                return Err(StoreError::Backend(format!(
                    "cannot add a child under entry node {parent}"
                )));
            }
        }
        let id = NodeId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.nodes.insert(
            id,
            NodeRecord {
                name: name.to_owned(),
                parent: Some(parent),
                children: Vec::new(),
                props,
            },
        );
        if let Some(mut parent_rec) = self.inner.nodes.get_mut(&parent) {
            parent_rec.children.push(id);
        }
        Ok(id)
    }

    /// Whether `node` is present in the committed tree.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.nodes.contains_key(&node)
    }

    /// Number of committed nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.nodes.len()
    }

    /// Parent lookup. The reference is non-owning; the root has none.
    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, StoreError> {
        Ok(self
            .inner
            .nodes
            .get(&node)
            .ok_or(StoreError::NotFound(node))?
            .parent)
    }

    /// Open a transaction handle over this tree.
    #[must_use]
    pub fn session(&self) -> MemorySession {
        MemorySession {
            tree: self.clone(),
            staged: Vec::new(),
            staged_set: HashSet::new(),
            commits: 0,
        }
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

/// One transaction handle over a [`MemoryTree`].
pub struct MemorySession {
    tree: MemoryTree,
    staged: Vec<NodeId>,
    staged_set: HashSet<NodeId>,
    commits: u64,
}

impl MemorySession {
    /// Commits applied through this session so far.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Removals staged but not yet committed.
    #[must_use]
    pub fn pending_removals(&self) -> usize {
        self.staged.len()
    }

    fn is_staged(&self, node: NodeId) -> bool {
        self.staged_set.contains(&node)
    }

    fn record(
        &self,
        node: NodeId,
    ) -> Result<dashmap::mapref::one::Ref<'_, NodeId, NodeRecord>, StoreError> {
        if self.is_staged(node) {
            return Err(StoreError::NotFound(node));
        }
        self.tree
            .inner
            .nodes
            .get(&node)
            .ok_or(StoreError::NotFound(node))
    }
}

impl NodeStore for MemorySession {
    fn name(&self, node: NodeId) -> Result<String, StoreError> {
        Ok(self.record(node)?.name.clone())
    }

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, StoreError> {
        Ok(self
            .record(node)?
            .children
            .iter()
            .copied()
            .filter(|child| !self.is_staged(*child))
            .collect())
    }

    fn properties(&self, node: NodeId) -> Result<NodeProperties, StoreError> {
        Ok(self.record(node)?.props.clone())
    }

    fn remove(&mut self, node: NodeId) -> Result<(), StoreError> {
        if self.is_staged(node) || !self.tree.inner.nodes.contains_key(&node) {
            return Err(StoreError::NotFound(node));
        }
        // Stage the node with whatever subtree is still under it.
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if !self.staged_set.insert(id) {
                continue;
            }
            if let Some(rec) = self.tree.inner.nodes.get(&id) {
                pending.extend(rec.children.iter().copied());
            }
            self.staged.push(id);
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let removed = self.staged.len();
        let _guard = self.tree.inner.commit_lock.lock();
        for id in self.staged.drain(..) {
            if let Some((_, rec)) = self.tree.inner.nodes.remove(&id) {
                if let Some(parent) = rec.parent {
                    if let Some(mut parent_rec) = self.tree.inner.nodes.get_mut(&parent) {
                        parent_rec.children.retain(|child| *child != id);
                    }
                }
            }
        }
        self.staged_set.clear();
        self.commits += 1;
        debug!(removed, commits = self.commits, "memory store commit applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry_props(uri: &str) -> NodeProperties {
        NodeProperties::entry("uri", json!({ "uri": uri }), b"body".to_vec())
    }

    #[test]
    fn test_new_tree_holds_only_root() {
        let tree = MemoryTree::new();
        assert_eq!(tree.node_count(), 1);
        assert!(tree.contains(tree.root()));
        assert_eq!(tree.parent(tree.root()).unwrap(), None);
    }

    #[test]
    fn test_session_reads_committed_tree() {
        let tree = MemoryTree::new();
        let bucket = tree.add_bucket(tree.root(), "250").unwrap();
        let entry = tree.add_entry(bucket, "entry-0", entry_props("/a")).unwrap();

        let session = tree.session();
        assert_eq!(session.name(tree.root()).unwrap(), ROOT_NODE_NAME);
        assert_eq!(session.children(tree.root()).unwrap(), vec![bucket]);
        assert_eq!(session.children(bucket).unwrap(), vec![entry]);
        assert!(session.properties(entry).unwrap().entry_marker);
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let tree = MemoryTree::new();
        let a = tree.add_bucket(tree.root(), "a").unwrap();
        let b = tree.add_bucket(tree.root(), "b").unwrap();
        let c = tree.add_bucket(tree.root(), "c").unwrap();
        assert_eq!(tree.session().children(tree.root()).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn test_entry_nodes_reject_children() {
        let tree = MemoryTree::new();
        let entry = tree
            .add_entry(tree.root(), "entry-0", entry_props("/a"))
            .unwrap();
        let err = tree.add_bucket(entry, "child").unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn test_staged_removal_visible_to_session_only() {
        let tree = MemoryTree::new();
        let bucket = tree.add_bucket(tree.root(), "250").unwrap();
        let entry = tree.add_entry(bucket, "entry-0", entry_props("/a")).unwrap();

        let mut session = tree.session();
        session.remove(entry).unwrap();

        // The owning session no longer sees the entry.
        assert!(session.children(bucket).unwrap().is_empty());
        assert!(matches!(
            session.properties(entry),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(session.pending_removals(), 1);

        // The shared tree and other sessions still do, until commit.
        assert!(tree.contains(entry));
        assert_eq!(tree.session().children(bucket).unwrap(), vec![entry]);
    }

    #[test]
    fn test_commit_applies_staged_removals() {
        let tree = MemoryTree::new();
        let bucket = tree.add_bucket(tree.root(), "250").unwrap();
        let entry = tree.add_entry(bucket, "entry-0", entry_props("/a")).unwrap();

        let mut session = tree.session();
        session.remove(entry).unwrap();
        session.remove(bucket).unwrap();
        session.commit().unwrap();

        assert_eq!(session.commits(), 1);
        assert_eq!(session.pending_removals(), 0);
        assert!(!tree.contains(entry));
        assert!(!tree.contains(bucket));
        assert_eq!(tree.node_count(), 1);
        assert!(tree.session().children(tree.root()).unwrap().is_empty());
    }

    #[test]
    fn test_remove_stages_remaining_subtree() {
        let tree = MemoryTree::new();
        let bucket = tree.add_bucket(tree.root(), "250").unwrap();
        let inner = tree.add_bucket(bucket, "88").unwrap();
        tree.add_entry(inner, "entry-0", entry_props("/a")).unwrap();

        let mut session = tree.session();
        session.remove(bucket).unwrap();
        assert_eq!(session.pending_removals(), 3);
        session.commit().unwrap();
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_double_remove_is_an_error() {
        let tree = MemoryTree::new();
        let bucket = tree.add_bucket(tree.root(), "250").unwrap();
        let mut session = tree.session();
        session.remove(bucket).unwrap();
        assert!(matches!(
            session.remove(bucket),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_unknown_node_is_an_error() {
        let tree = MemoryTree::new();
        let bucket = tree.add_bucket(tree.root(), "250").unwrap();
        let mut session = tree.session();
        session.remove(bucket).unwrap();
        session.commit().unwrap();
        assert!(matches!(
            session.remove(bucket),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_sessions_over_disjoint_subtrees() {
        let tree = MemoryTree::new();
        let left = tree.add_bucket(tree.root(), "left").unwrap();
        let right = tree.add_bucket(tree.root(), "right").unwrap();
        for i in 0..10 {
            tree.add_entry(left, &format!("l-{i}"), entry_props("/l")).unwrap();
            tree.add_entry(right, &format!("r-{i}"), entry_props("/r"))
                .unwrap();
        }

        let tree_left = tree.clone();
        let tree_right = tree.clone();
        let t1 = std::thread::spawn(move || {
            let mut session = tree_left.session();
            for child in session.children(left).unwrap() {
                session.remove(child).unwrap();
            }
            session.remove(left).unwrap();
            session.commit().unwrap();
        });
        let t2 = std::thread::spawn(move || {
            let mut session = tree_right.session();
            for child in session.children(right).unwrap() {
                session.remove(child).unwrap();
            }
            session.remove(right).unwrap();
            session.commit().unwrap();
        });
        t1.join().unwrap();
        t2.join().unwrap();

        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_default_trait() {
        let tree = MemoryTree::default();
        assert_eq!(tree.node_count(), 1);
    }
}
