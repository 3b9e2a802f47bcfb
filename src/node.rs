//! Node model for the bucketed cache tree.
//!
//! The persisted tree has three kinds of nodes, all sharing one record shape
//! and distinguished by a marker property and a reserved name:
//!
//! - **Entry nodes** are leaves carrying a serialized cache key (type tag +
//!   payload), the cached response body, and optional expiry metadata.
//! - **Bucket nodes** group entries by key hash to bound fan-out. A bucket
//!   whose entries have all been removed is a pruning candidate.
//! - The **root node** is the bucket the traversal starts from. It has the
//!   reserved name [`ROOT_NODE_NAME`] and is never pruned, even when empty.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::traits::{NodeStore, StoreError};

/// Reserved name of the traversal root. A bucket with this name is exempt
/// from empty-bucket pruning.
pub const ROOT_NODE_NAME: &str = "cache-root";

/// Opaque identifier of a persisted tree node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Typed properties of a tree node.
///
/// Bucket nodes carry the all-default shape. Entry nodes set `entry_marker`
/// and the key metadata fields; [`crate::key::decode_entry_key`] turns that
/// metadata back into a live cache key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeProperties {
    /// Marks an entry node. A node carrying this marker never has children.
    #[serde(default)]
    pub entry_marker: bool,
    /// Type tag of the serialized cache key, resolved through the key
    /// type registry at reconstruction time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Serialized form of the cache key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_payload: Option<Value>,
    /// Serialized response body for this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_payload: Option<Vec<u8>>,
    /// Expiry instant (epoch millis) stamped when the entry was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<i64>,
    /// Per-entry expiry override (epoch millis). Takes precedence over
    /// `expires_at_ms` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_expiry_ms: Option<i64>,
}

impl NodeProperties {
    /// Properties of a plain bucket node.
    #[must_use]
    pub fn bucket() -> Self {
        Self::default()
    }

    /// Properties of an entry node with its key metadata and response body.
    #[must_use]
    pub fn entry(
        key_type: impl Into<String>,
        key_payload: Value,
        response_payload: Vec<u8>,
    ) -> Self {
        Self {
            entry_marker: true,
            key_type: Some(key_type.into()),
            key_payload: Some(key_payload),
            response_payload: Some(response_payload),
            expires_at_ms: None,
            custom_expiry_ms: None,
        }
    }

    /// Set the stored expiry instant.
    #[must_use]
    pub fn with_expires_at(mut self, epoch_ms: i64) -> Self {
        self.expires_at_ms = Some(epoch_ms);
        self
    }

    /// Set the per-entry expiry override.
    #[must_use]
    pub fn with_custom_expiry(mut self, epoch_ms: i64) -> Self {
        self.custom_expiry_ms = Some(epoch_ms);
        self
    }
}

/// Whether `node` is an entry node (carries the entry marker).
pub fn is_entry_node<S: NodeStore + ?Sized>(
    store: &S,
    node: NodeId,
) -> Result<bool, StoreError> {
    Ok(store.properties(node)?.entry_marker)
}

/// Whether `node` is an empty bucket: no entry marker, no remaining
/// children, and not the designated root.
pub fn is_empty_bucket_node<S: NodeStore + ?Sized>(
    store: &S,
    node: NodeId,
) -> Result<bool, StoreError> {
    Ok(!store.properties(node)?.entry_marker
        && store.children(node)?.is_empty()
        && store.name(node)? != ROOT_NODE_NAME)
}
