//! Persisted reconciliation state.
//!
//! Two tables live next to each other in the state directory:
//!
//! - [`index::IndexStore`] (`index.bin`): one row per known file with its
//!   ignored/managed flags and directory depth
//! - [`orphans::OrphanStore`] (`orphans.bin`): files found on disk without a
//!   registry entry, kept until they are adopted or explicitly pruned
//!
//! Both are bincode-encoded `BTreeMap`s keyed by canonical URI, loaded fully on
//! open and rewritten atomically on flush.

/// File index table.
pub mod index;
/// Orphan table.
pub mod orphans;

use serde::{Deserialize, Serialize};

pub use index::{IndexGroup, IndexStore};
pub use orphans::OrphanStore;

/// State of one file in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Row id, assigned on first insert and stable across updates
    pub id: u64,
    /// Canonical URI (unique key)
    pub uri: String,
    /// Whether an ignore pattern matches the file
    pub is_ignored: bool,
    /// Whether the registry has an entry for the file
    pub is_managed: bool,
    /// Number of separators in the root-relative path
    pub directory_depth: u32,
    /// File modification time, seconds since the Unix epoch
    pub timestamp: i64,
}

impl IndexRecord {
    /// Builds a record; the row id is assigned by [`IndexStore::upsert`].
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        is_ignored: bool,
        is_managed: bool,
        directory_depth: u32,
        timestamp: i64,
    ) -> Self {
        Self {
            id: 0,
            uri: uri.into(),
            is_ignored,
            is_managed,
            directory_depth,
            timestamp,
        }
    }
}

/// A file found on disk with no registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanRecord {
    /// Canonical URI (unique key)
    pub uri: String,
    /// When the file was last seen unmanaged, seconds since the Unix epoch
    pub timestamp: i64,
}
