//! Interface to the managed-file registry.
//!
//! The registry is an external store recording which files are "managed". The
//! engine only needs two things from it: the full list of managed URIs and the
//! ability to create an entry for an adopted file. [`ManagedRegistry`] is that
//! contract; [`FileRegistry`] and [`MemoryRegistry`] are the two
//! implementations shipped with the crate.

/// Registry persisted as a bincode table in the state directory.
pub mod file;
/// In-memory registry for tests and embedding.
pub mod memory;

use crate::uri::Scheme;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

/// Handle to a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedEntity {
    /// Registry-assigned identifier
    pub id: u64,
    /// URI of the managed file
    pub uri: String,
    /// File name shown to users
    pub filename: String,
    /// Creation timestamp, seconds since the Unix epoch
    pub timestamp: i64,
}

/// Operations the engine needs from the external registry.
pub trait ManagedRegistry {
    /// Every URI currently present in the registry, in any spelling.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried
    fn list_all_managed_uris(&self) -> Result<Vec<String>>;

    /// Creates an entry for a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted
    fn create_managed_entry(
        &mut self,
        uri: &str,
        filename: &str,
        timestamp: i64,
    ) -> Result<ManagedEntity>;

    /// Deletes the entry with `id`, returning it when it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion cannot be persisted
    fn delete_managed_entry(&mut self, id: u64) -> Result<Option<ManagedEntity>>;

    /// Entry for a URI as stored, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried
    fn find_managed_entry(&self, uri: &str) -> Result<Option<ManagedEntity>>;
}

/// Point-in-time snapshot of the managed URIs, canonicalized.
///
/// Loaded once per top-level engine call and discarded afterwards; it is never
/// a live view of the registry.
#[derive(Debug, Clone, Default)]
pub struct ManagedSet {
    /// Canonical URIs present in the registry
    uris: HashSet<String>,
}

impl ManagedSet {
    /// Queries the registry once and canonicalizes every URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry query fails
    pub fn load<R: ManagedRegistry + ?Sized>(registry: &R, scheme: &Scheme) -> Result<Self> {
        let uris: HashSet<String> = registry
            .list_all_managed_uris()
            .context("Failed to load managed files from registry")?
            .iter()
            .map(|uri| scheme.canonicalize(uri))
            .collect();
        debug!(count = uris.len(), "Loaded managed file set");
        Ok(Self { uris })
    }

    /// Returns `true` when the canonical URI is managed.
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.uris.contains(uri)
    }

    /// Marks a canonical URI as managed for the rest of the snapshot's life.
    pub fn insert(&mut self, uri: String) -> bool {
        self.uris.insert(uri)
    }

    /// Number of managed URIs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Returns `true` when nothing is managed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_set_canonicalizes() -> Result<()> {
        let scheme = Scheme::new("public", "/srv");
        let registry = MemoryRegistry::with_uris(["public:///a.txt", "public://b/c.txt"]);

        let set = ManagedSet::load(&registry, &scheme)?;
        assert_eq!(set.len(), 2);
        assert!(set.contains("public://a.txt"));
        assert!(set.contains("public://b/c.txt"));
        assert!(!set.contains("public:///a.txt"));
        Ok(())
    }

    #[test]
    fn test_managed_set_is_a_snapshot() -> Result<()> {
        let scheme = Scheme::new("public", "/srv");
        let mut registry = MemoryRegistry::default();
        let set = ManagedSet::load(&registry, &scheme)?;

        registry.create_managed_entry("public://late.txt", "late.txt", 0)?;
        assert!(!set.contains("public://late.txt"));
        assert!(ManagedSet::load(&registry, &scheme)?.contains("public://late.txt"));
        Ok(())
    }
}
