//! Configuration for maintenance runs.
//!
//! # Example
//!
//! ```
//! use treecache_maintenance::MaintenanceConfig;
//!
//! // Defaults
//! let config = MaintenanceConfig::default();
//! assert_eq!(config.max_depth, 11);
//! assert_eq!(config.commit_threshold, 500);
//!
//! // Tuned for small commit batches
//! let config = MaintenanceConfig {
//!     commit_threshold: 8,
//!     ..Default::default()
//! };
//! assert_eq!(config.max_depth, 11);
//! ```

use serde::Deserialize;

/// Configuration for one maintenance job.
///
/// Both fields have defaults matching a bucketed store of moderate depth;
/// tune `commit_threshold` down when the backing store prefers small
/// transactions.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Maximum traversal depth below the root (default: 11). Nodes deeper
    /// than this are neither visited nor evicted.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Uncommitted-removal threshold driving batched commits (default:
    /// 500). The commit check runs before each removal is counted, so
    /// batches span `commit_threshold + 1` removals.
    #[serde(default = "default_commit_threshold")]
    pub commit_threshold: u64,
}

fn default_max_depth() -> u32 {
    11
}

fn default_commit_threshold() -> u64 {
    500
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            commit_threshold: default_commit_threshold(),
        }
    }
}
