use super::IndexRecord;
use crate::utils::serialization;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk format version of `index.bin`.
const INDEX_VERSION: u32 = 1;

/// Serialized form of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IndexTable {
    /// Format version
    version: u32,
    /// Next row id to hand out
    next_id: u64,
    /// Rows keyed by canonical URI
    rows: BTreeMap<String, IndexRecord>,
}

impl Default for IndexTable {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

/// Grouping key for [`IndexStore::count_by_ignored_managed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexGroup {
    /// Ignored flag of the group
    pub is_ignored: bool,
    /// Managed flag of the group
    pub is_managed: bool,
}

/// Persisted table mapping canonical URI to file state.
#[derive(Debug)]
pub struct IndexStore {
    /// Location of `index.bin`
    path: PathBuf,
    /// In-memory copy of the table
    table: IndexTable,
    /// Whether the in-memory table differs from disk
    dirty: bool,
}

impl IndexStore {
    /// Opens the index at `path`, starting empty when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table: IndexTable = serialization::read_file(&path)
            .context("Failed to load file index")?
            .unwrap_or_default();

        if table.version != INDEX_VERSION {
            anyhow::bail!(
                "Unsupported index version {} in {} (expected {INDEX_VERSION})",
                table.version,
                path.display()
            );
        }

        Ok(Self {
            path,
            table,
            dirty: false,
        })
    }

    /// Location of the table file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts or replaces the row for `record.uri`.
    ///
    /// An existing row keeps its id; only the flags, depth and timestamp are
    /// overwritten.
    pub fn upsert(&mut self, mut record: IndexRecord) {
        match self.table.rows.get_mut(&record.uri) {
            Some(existing) => {
                record.id = existing.id;
                if *existing != record {
                    *existing = record;
                    self.dirty = true;
                }
            }
            None => {
                record.id = self.table.next_id;
                self.table.next_id += 1;
                self.table.rows.insert(record.uri.clone(), record);
                self.dirty = true;
            }
        }
    }

    /// Row for a canonical URI.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&IndexRecord> {
        self.table.rows.get(uri)
    }

    /// Removes one row, returning whether it existed.
    pub fn delete(&mut self, uri: &str) -> bool {
        let removed = self.table.rows.remove(uri).is_some();
        self.dirty |= removed;
        removed
    }

    /// Removes the rows of files confirmed absent from disk.
    ///
    /// Returns the number of rows removed.
    pub fn delete_missing<I, S>(&mut self, uris: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed = uris
            .into_iter()
            .filter(|uri| self.delete(uri.as_ref()))
            .count();
        if removed > 0 {
            debug!(removed, "Removed index rows for missing files");
        }
        removed
    }

    /// Drops every row and restarts row ids.
    pub fn truncate_all(&mut self) {
        if self.table != IndexTable::default() {
            self.table = IndexTable::default();
            self.dirty = true;
        }
    }

    /// Row counts grouped by (ignored, managed).
    #[must_use]
    pub fn count_by_ignored_managed(&self) -> BTreeMap<IndexGroup, usize> {
        let mut counts = BTreeMap::new();
        for record in self.table.rows.values() {
            *counts
                .entry(IndexGroup {
                    is_ignored: record.is_ignored,
                    is_managed: record.is_managed,
                })
                .or_insert(0) += 1;
        }
        counts
    }

    /// URIs of unmanaged, non-ignored files in row-id order.
    ///
    /// `max_depth` optionally restricts the listing to files at most that many
    /// directories deep.
    #[must_use]
    pub fn list_unmanaged_unignored(&self, limit: usize, max_depth: Option<u32>) -> Vec<String> {
        let mut rows: Vec<&IndexRecord> = self
            .table
            .rows
            .values()
            .filter(|r| !r.is_managed && !r.is_ignored)
            .filter(|r| max_depth.is_none_or(|depth| r.directory_depth <= depth))
            .collect();
        rows.sort_unstable_by_key(|r| r.id);
        rows.into_iter().take(limit).map(|r| r.uri.clone()).collect()
    }

    /// Every indexed URI in key order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.table.rows.keys().map(String::as_str)
    }

    /// Every row in key order.
    pub fn records(&self) -> impl Iterator<Item = &IndexRecord> {
        self.table.rows.values()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.rows.len()
    }

    /// Returns `true` when the index holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.rows.is_empty()
    }

    /// Writes pending changes to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be encoded or written
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        serialization::write_file_atomic(&self.path, &self.table)
            .context("Failed to save file index")?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(uri: &str, ignored: bool, managed: bool) -> IndexRecord {
        IndexRecord::new(uri, ignored, managed, 0, 1_700_000_000)
    }

    #[test]
    fn test_upsert_merges_on_uri() -> Result<()> {
        let temp = TempDir::new()?;
        let mut store = IndexStore::open(temp.path().join("index.bin"))?;

        store.upsert(record("public://a.txt", false, false));
        store.upsert(record("public://b.txt", false, false));
        store.upsert(record("public://a.txt", false, true));

        assert_eq!(store.len(), 2);
        let a = store.get("public://a.txt").unwrap();
        assert!(a.is_managed);
        assert_eq!(a.id, 1, "row id survives updates");
        assert_eq!(store.get("public://b.txt").unwrap().id, 2);
        Ok(())
    }

    #[test]
    fn test_flush_and_reopen() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("index.bin");

        let mut store = IndexStore::open(&path)?;
        store.upsert(IndexRecord::new("public://css/skip.txt", true, false, 1, 5));
        store.flush()?;

        let reopened = IndexStore::open(&path)?;
        let row = reopened.get("public://css/skip.txt").unwrap();
        assert!(row.is_ignored);
        assert_eq!(row.directory_depth, 1);
        assert_eq!(row.timestamp, 5);
        Ok(())
    }

    #[test]
    fn test_unchanged_upsert_does_not_rewrite() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("index.bin");

        let mut store = IndexStore::open(&path)?;
        store.upsert(record("public://a.txt", false, false));
        store.flush()?;
        let before = std::fs::read(&path)?;

        store.upsert(record("public://a.txt", false, false));
        assert!(!store.dirty);
        store.flush()?;
        assert_eq!(std::fs::read(&path)?, before);
        Ok(())
    }

    #[test]
    fn test_delete_missing_and_truncate() -> Result<()> {
        let temp = TempDir::new()?;
        let mut store = IndexStore::open(temp.path().join("index.bin"))?;
        store.upsert(record("public://a.txt", false, false));
        store.upsert(record("public://b.txt", false, false));
        store.upsert(record("public://c.txt", false, false));

        let removed = store.delete_missing(["public://a.txt", "public://zzz.txt"]);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 2);

        store.truncate_all();
        assert!(store.is_empty());
        store.upsert(record("public://d.txt", false, false));
        assert_eq!(store.get("public://d.txt").unwrap().id, 1, "ids restart");
        Ok(())
    }

    #[test]
    fn test_counts_and_listing() -> Result<()> {
        let temp = TempDir::new()?;
        let mut store = IndexStore::open(temp.path().join("index.bin"))?;
        store.upsert(record("public://z.txt", false, false));
        store.upsert(record("public://a.txt", false, false));
        store.upsert(record("public://m.txt", false, true));
        store.upsert(record("public://i.txt", true, false));
        store.upsert(IndexRecord::new("public://deep/x/y.txt", false, false, 2, 0));

        let counts = store.count_by_ignored_managed();
        let unmanaged = IndexGroup {
            is_ignored: false,
            is_managed: false,
        };
        assert_eq!(counts[&unmanaged], 3);
        assert_eq!(counts.values().sum::<usize>(), 5);

        // Row-id order, not key order
        assert_eq!(
            store.list_unmanaged_unignored(2, None),
            vec!["public://z.txt", "public://a.txt"]
        );
        assert_eq!(store.list_unmanaged_unignored(10, Some(1)).len(), 2);
        Ok(())
    }

    #[test]
    fn test_rejects_unknown_version() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("index.bin");
        let table = IndexTable {
            version: 99,
            ..IndexTable::default()
        };
        serialization::write_file_atomic(&path, &table)?;
        assert!(IndexStore::open(&path).is_err());
        Ok(())
    }
}
