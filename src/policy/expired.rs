//! Expiry-based invalidation.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::node::{is_empty_bucket_node, NodeId};
use crate::store::traits::NodeStore;
use crate::traversal::MaintenanceError;

use super::{Decision, EvictionPolicy};

/// Removes entry nodes whose effective expiry lies at or before a cutoff
/// instant, and prunes buckets left empty along the way.
///
/// The effective expiry is the per-entry override when present, otherwise
/// the expiry stamped at store time. Entries with neither are kept.
#[derive(Debug, Clone, Copy)]
pub struct InvalidateExpired {
    cutoff_ms: i64,
}

impl InvalidateExpired {
    /// Expire everything due at or before `cutoff_ms` (epoch millis).
    #[must_use]
    pub fn at(cutoff_ms: i64) -> Self {
        Self { cutoff_ms }
    }

    /// Expire everything due by the current wall clock.
    #[must_use]
    pub fn now() -> Self {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        Self::at(now_ms)
    }

    #[must_use]
    pub fn cutoff_ms(&self) -> i64 {
        self.cutoff_ms
    }
}

impl<S: NodeStore + ?Sized> EvictionPolicy<S> for InvalidateExpired {
    fn name(&self) -> &'static str {
        "invalidate-expired"
    }

    fn decide(
        &self,
        store: &S,
        node: NodeId,
        _level: u32,
    ) -> Result<Decision, MaintenanceError> {
        let props = store.properties(node)?;
        if props.entry_marker {
            let effective = props.custom_expiry_ms.or(props.expires_at_ms);
            match effective {
                Some(expiry_ms) if expiry_ms <= self.cutoff_ms => Ok(Decision::Remove),
                _ => Ok(Decision::Keep),
            }
        } else if is_empty_bucket_node(store, node)? {
            Ok(Decision::Remove)
        } else {
            Ok(Decision::Keep)
        }
    }
}
