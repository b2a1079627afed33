use super::{ManagedEntity, ManagedRegistry};
use crate::utils::serialization;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryTable {
    /// Next entity id to hand out
    next_id: u64,
    /// Entities keyed by id
    entities: BTreeMap<u64, ManagedEntity>,
}

/// Registry stored in `registry.bin`.
///
/// Every mutation is written through immediately, so a failed write surfaces
/// as a failed entry creation rather than a lost entry.
#[derive(Debug)]
pub struct FileRegistry {
    /// Location of `registry.bin`
    path: PathBuf,
    /// Last successfully written table
    table: RegistryTable,
}

impl FileRegistry {
    /// Opens the registry at `path`, starting empty when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = serialization::read_file(&path)
            .context("Failed to load registry")?
            .unwrap_or_default();
        Ok(Self { path, table })
    }

    /// Location of the registry file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry with `id`.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&ManagedEntity> {
        self.table.entities.get(&id)
    }

    /// Entry for a URI as stored.
    #[must_use]
    pub fn find(&self, uri: &str) -> Option<&ManagedEntity> {
        self.table.entities.values().find(|e| e.uri == uri)
    }

    /// Deletes the entry with `id` and persists the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file cannot be written
    pub fn remove(&mut self, id: u64) -> Result<Option<ManagedEntity>> {
        let removed = self.table.entities.remove(&id);
        if removed.is_some() {
            serialization::write_file_atomic(&self.path, &self.table)
                .context("Failed to save registry")?;
        }
        Ok(removed)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.entities.len()
    }

    /// Returns `true` when the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.entities.is_empty()
    }
}

impl ManagedRegistry for FileRegistry {
    fn list_all_managed_uris(&self) -> Result<Vec<String>> {
        Ok(self.table.entities.values().map(|e| e.uri.clone()).collect())
    }

    fn create_managed_entry(
        &mut self,
        uri: &str,
        filename: &str,
        timestamp: i64,
    ) -> Result<ManagedEntity> {
        let mut table = self.table.clone();
        table.next_id += 1;
        let entity = ManagedEntity {
            id: table.next_id,
            uri: uri.to_string(),
            filename: filename.to_string(),
            timestamp,
        };
        table.entities.insert(entity.id, entity.clone());

        serialization::write_file_atomic(&self.path, &table)
            .with_context(|| format!("Failed to save registry entry for {uri}"))?;
        self.table = table;
        Ok(entity)
    }

    fn delete_managed_entry(&mut self, id: u64) -> Result<Option<ManagedEntity>> {
        self.remove(id)
    }

    fn find_managed_entry(&self, uri: &str) -> Result<Option<ManagedEntity>> {
        Ok(self.find(uri).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entries_persist() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("registry.bin");

        let mut registry = FileRegistry::open(&path)?;
        let entity = registry.create_managed_entry("public://a.txt", "a.txt", 42)?;
        assert_eq!(entity.id, 1);

        let mut reopened = FileRegistry::open(&path)?;
        assert_eq!(reopened.list_all_managed_uris()?, vec!["public://a.txt"]);
        assert_eq!(reopened.get(1).map(|e| e.timestamp), Some(42));

        assert!(reopened.remove(1)?.is_some());
        assert!(FileRegistry::open(&path)?.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_write_leaves_registry_unchanged() -> Result<()> {
        let temp = TempDir::new()?;
        // A regular file where the state directory should be makes every write fail
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "")?;

        let mut registry = FileRegistry::open(blocker.join("registry.bin"))?;
        assert!(registry.create_managed_entry("public://a.txt", "a.txt", 0).is_err());
        assert!(registry.is_empty());
        Ok(())
    }
}
