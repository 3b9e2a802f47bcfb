//! Invalidation scoped to one cache configuration.

use tracing::error;

use crate::key::{decode_entry_key, CacheKey, KeyTypeResolver};
use crate::node::{is_empty_bucket_node, NodeId};
use crate::store::traits::NodeStore;
use crate::traversal::MaintenanceError;

use super::{Decision, EvictionPolicy};

/// Ownership predicate of a cache configuration: whether a reconstructed
/// key falls under this configuration's invalidation scope.
pub trait CacheConfig {
    fn knows(&self, key: &dyn CacheKey) -> bool;
}

impl<C: CacheConfig + ?Sized> CacheConfig for &C {
    fn knows(&self, key: &dyn CacheKey) -> bool {
        (**self).knows(key)
    }
}

/// Removes entry nodes whose reconstructed key is governed by the supplied
/// cache configuration, and prunes buckets left empty along the way.
///
/// Key reconstruction failures are fatal for the traversal: the error is
/// surfaced to the caller and the walk stops. Batches committed before the
/// failure stay committed.
pub struct ByCacheConfig<C, R> {
    config: C,
    resolver: R,
}

impl<C, R> ByCacheConfig<C, R> {
    pub fn new(config: C, resolver: R) -> Self {
        Self { config, resolver }
    }
}

impl<S, C, R> EvictionPolicy<S> for ByCacheConfig<C, R>
where
    S: NodeStore + ?Sized,
    C: CacheConfig,
    R: KeyTypeResolver,
{
    fn name(&self) -> &'static str {
        "by-cache-config"
    }

    fn decide(
        &self,
        store: &S,
        node: NodeId,
        _level: u32,
    ) -> Result<Decision, MaintenanceError> {
        let props = store.properties(node)?;
        if props.entry_marker {
            let key = decode_entry_key(&props, &self.resolver).map_err(|e| {
                error!(node = %node, error = %e, "failed to reconstruct the cache key of an entry node");
                MaintenanceError::KeyReconstruction(e)
            })?;
            if self.config.knows(key.as_ref()) {
                Ok(Decision::Remove)
            } else {
                Ok(Decision::Keep)
            }
        } else if is_empty_bucket_node(store, node)? {
            Ok(Decision::Remove)
        } else {
            Ok(Decision::Keep)
        }
    }
}
