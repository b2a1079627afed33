use super::{ManagedEntity, ManagedRegistry};
use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashSet};

/// Registry held entirely in memory.
///
/// URIs listed in `failing` make [`ManagedRegistry::create_managed_entry`]
/// fail, which lets tests exercise per-file adoption errors.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    /// Entities keyed by id
    entities: BTreeMap<u64, ManagedEntity>,
    /// Last id handed out
    next_id: u64,
    /// URIs whose creation fails
    failing: HashSet<String>,
}

impl MemoryRegistry {
    /// Registry pre-populated with entries for `uris` (stored verbatim).
    #[must_use]
    pub fn with_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for uri in uris {
            let uri = uri.into();
            let filename = uri.rsplit('/').next().unwrap_or(&uri).to_string();
            registry.insert(uri, filename, 0);
        }
        registry
    }

    /// Makes entry creation fail for `uri`.
    pub fn fail_on(&mut self, uri: impl Into<String>) {
        self.failing.insert(uri.into());
    }

    /// Removes the entry with `id`, returning it.
    pub fn remove(&mut self, id: u64) -> Option<ManagedEntity> {
        self.entities.remove(&id)
    }

    /// Entry for a URI as stored.
    #[must_use]
    pub fn find(&self, uri: &str) -> Option<&ManagedEntity> {
        self.entities.values().find(|e| e.uri == uri)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn insert(&mut self, uri: String, filename: String, timestamp: i64) -> ManagedEntity {
        self.next_id += 1;
        let entity = ManagedEntity {
            id: self.next_id,
            uri,
            filename,
            timestamp,
        };
        self.entities.insert(entity.id, entity.clone());
        entity
    }
}

impl ManagedRegistry for MemoryRegistry {
    fn list_all_managed_uris(&self) -> Result<Vec<String>> {
        Ok(self.entities.values().map(|e| e.uri.clone()).collect())
    }

    fn create_managed_entry(
        &mut self,
        uri: &str,
        filename: &str,
        timestamp: i64,
    ) -> Result<ManagedEntity> {
        if self.failing.contains(uri) {
            bail!("Registry refused entry for {uri}");
        }
        Ok(self.insert(uri.to_string(), filename.to_string(), timestamp))
    }

    fn delete_managed_entry(&mut self, id: u64) -> Result<Option<ManagedEntity>> {
        Ok(self.remove(id))
    }

    fn find_managed_entry(&self, uri: &str) -> Result<Option<ManagedEntity>> {
        Ok(self.find(uri).cloned())
    }
}
