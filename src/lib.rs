//! # Treecache Maintenance
//!
//! A maintenance engine for hierarchical, persisted cache stores: it walks
//! a bucketed cache tree depth-first, classifies nodes (bucket vs. entry),
//! applies a pluggable eviction policy, and commits removals in bounded
//! transactional batches.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Maintenance Job Driver                     │
//! │  • opens one traversal session per run                      │
//! │  • guarantees close() on every exit path                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Traversal Engine                         │
//! │  • depth-bounded depth-first walk                           │
//! │  • post-order keep-or-remove decisions                      │
//! │  • batched commits via the delta counter                    │
//! │  • overload detection (log-only, never aborts)              │
//! └─────────────────────────────────────────────────────────────┘
//!            │                               │
//!            ▼                               ▼
//! ┌───────────────────────┐   ┌─────────────────────────────────┐
//! │   Eviction Policies   │   │           Node Store            │
//! │  • by cache config    │   │  • persisted bucket tree        │
//! │  • invalidate all     │   │  • session-staged removals      │
//! │  • expired entries    │   │  • transactional commit         │
//! └───────────────────────┘   │  • in-memory reference impl     │
//!                             └─────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use treecache_maintenance::{
//!     InvalidateAll, MaintenanceConfig, MaintenanceJob, MemoryTree, NodeProperties,
//! };
//! use serde_json::json;
//!
//! // A root bucket holding one hash bucket with one cached entry.
//! let tree = MemoryTree::new();
//! let bucket = tree.add_bucket(tree.root(), "1013229486").unwrap();
//! tree.add_entry(
//!     bucket,
//!     "entry-0",
//!     NodeProperties::entry("uri", json!({"uri": "/content/a.html"}), b"<html/>".to_vec()),
//! )
//! .unwrap();
//!
//! // Wipe the cache: the entry goes, then the emptied bucket.
//! let job = MaintenanceJob::new(InvalidateAll, MaintenanceConfig::default());
//! let mut session = tree.session();
//! let report = job.run(&mut session, tree.root()).unwrap();
//!
//! assert_eq!(report.evictions, 2);
//! assert_eq!(tree.node_count(), 1); // only the root remains
//! ```
//!
//! ## Features
//!
//! - **Pluggable policies**: scope invalidation to one cache
//!   configuration, wipe everything, or expire by timestamp; add your own
//!   by implementing [`EvictionPolicy`].
//! - **Batched commits**: removals are persisted every
//!   `commit_threshold + 1` removals plus one final flush at close.
//! - **Cascading bucket pruning**: post-order decisions let a whole chain
//!   of emptied buckets fall in a single traversal.
//! - **Key reconstruction**: entry nodes carry a type tag plus payload;
//!   an injected registry maps tags to key factories.
//! - **Overload detection**: long traversals warn (with policy and
//!   elapsed time) but keep going.
//!
//! ## Modules
//!
//! - [`driver`]: the [`MaintenanceJob`] run discipline
//! - [`traversal`]: the depth-bounded walker and commit bookkeeping
//! - [`policy`]: the [`EvictionPolicy`] trait and shipped variants
//! - [`batching`]: the delta counter behind batched commits
//! - [`store`]: the [`NodeStore`] contract and in-memory implementation
//! - [`node`]: node identifiers, properties, classification
//! - [`key`]: cache key reconstruction
//! - [`inspect`]: read-only cache content listing
//! - [`metrics`]: backend-agnostic counters and histograms

pub mod batching;
pub mod config;
pub mod driver;
pub mod inspect;
pub mod key;
pub mod metrics;
pub mod node;
pub mod policy;
pub mod store;
pub mod traversal;

pub use batching::delta_batcher::{CommitReason, DeltaBatcher};
pub use config::MaintenanceConfig;
pub use driver::{MaintenanceJob, MaintenanceReport};
pub use inspect::{collect_entries, EntryRecord};
pub use key::{
    decode_entry_key, CacheKey, KeyCodecError, KeyFactory, KeyTypeRegistry, KeyTypeResolver,
    UriKey,
};
pub use node::{is_empty_bucket_node, is_entry_node, NodeId, NodeProperties, ROOT_NODE_NAME};
pub use policy::all::InvalidateAll;
pub use policy::by_config::{ByCacheConfig, CacheConfig};
pub use policy::expired::InvalidateExpired;
pub use policy::{Decision, EvictionPolicy};
pub use store::memory::{MemorySession, MemoryTree};
pub use store::traits::{NodeStore, StoreError};
pub use traversal::{MaintenanceError, TraversalSession};
