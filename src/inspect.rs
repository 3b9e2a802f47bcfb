//! Cache content inspection.
//!
//! A read-only companion to the maintenance traversal: walk the tree,
//! reconstruct every entry's cache key, and hand back the pairs so host
//! tooling can list what the store currently holds. Shares the codec and
//! its failure taxonomy with the eviction path.

use crate::key::{decode_entry_key, CacheKey, KeyTypeResolver};
use crate::node::NodeId;
use crate::store::traits::NodeStore;
use crate::traversal::MaintenanceError;

/// One entry node's payload, as stored.
#[derive(Debug)]
pub struct EntryRecord {
    pub node: NodeId,
    pub response_payload: Option<Vec<u8>>,
    pub expires_at_ms: Option<i64>,
    pub custom_expiry_ms: Option<i64>,
}

/// Collect every entry under `root` (depth-bounded) with its
/// reconstructed key, in visit order.
pub fn collect_entries<S, R>(
    store: &S,
    root: NodeId,
    max_depth: u32,
    resolver: &R,
) -> Result<Vec<(Box<dyn CacheKey>, EntryRecord)>, MaintenanceError>
where
    S: NodeStore + ?Sized,
    R: KeyTypeResolver + ?Sized,
{
    let mut entries = Vec::new();
    walk(store, root, 0, max_depth, resolver, &mut entries)?;
    Ok(entries)
}

fn walk<S, R>(
    store: &S,
    node: NodeId,
    level: u32,
    max_depth: u32,
    resolver: &R,
    entries: &mut Vec<(Box<dyn CacheKey>, EntryRecord)>,
) -> Result<(), MaintenanceError>
where
    S: NodeStore + ?Sized,
    R: KeyTypeResolver + ?Sized,
{
    let props = store.properties(node)?;
    if props.entry_marker {
        let key = decode_entry_key(&props, resolver)?;
        entries.push((
            key,
            EntryRecord {
                node,
                response_payload: props.response_payload,
                expires_at_ms: props.expires_at_ms,
                custom_expiry_ms: props.custom_expiry_ms,
            },
        ));
        return Ok(());
    }
    if level < max_depth {
        for child in store.children(node)? {
            walk(store, child, level + 1, max_depth, resolver, entries)?;
        }
    }
    Ok(())
}
