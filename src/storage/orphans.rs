use super::OrphanRecord;
use crate::utils::serialization;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// On-disk format version of `orphans.bin`.
const ORPHANS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct OrphanTable {
    /// Format version
    version: u32,
    /// Orphans keyed by canonical URI
    rows: BTreeMap<String, OrphanRecord>,
}

impl Default for OrphanTable {
    fn default() -> Self {
        Self {
            version: ORPHANS_VERSION,
            rows: BTreeMap::new(),
        }
    }
}

/// Persisted list of discovered orphans.
///
/// Rows are only added or refreshed by scans. A scan that does not see a file
/// again leaves its row alone; rows go away on adoption or explicit pruning.
#[derive(Debug)]
pub struct OrphanStore {
    /// Location of `orphans.bin`
    path: PathBuf,
    /// In-memory copy of the table
    table: OrphanTable,
    /// Whether the in-memory table differs from disk
    dirty: bool,
}

impl OrphanStore {
    /// Opens the table at `path`, starting empty when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table: OrphanTable = serialization::read_file(&path)
            .context("Failed to load orphan table")?
            .unwrap_or_default();

        if table.version != ORPHANS_VERSION {
            anyhow::bail!(
                "Unsupported orphan table version {} in {}",
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

    /// Records an orphan, refreshing the timestamp of an existing row.
    pub fn upsert(&mut self, uri: &str, timestamp: i64) {
        match self.table.rows.get_mut(uri) {
            Some(existing) if existing.timestamp == timestamp => {}
            Some(existing) => {
                existing.timestamp = timestamp;
                self.dirty = true;
            }
            None => {
                self.table.rows.insert(
                    uri.to_string(),
                    OrphanRecord {
                        uri: uri.to_string(),
                        timestamp,
                    },
                );
                self.dirty = true;
            }
        }
    }

    /// Removes an orphan, returning whether it was recorded.
    pub fn delete(&mut self, uri: &str) -> bool {
        let removed = self.table.rows.remove(uri).is_some();
        self.dirty |= removed;
        removed
    }

    /// Returns `true` when the URI is recorded as an orphan.
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.table.rows.contains_key(uri)
    }

    /// Row for a URI.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&OrphanRecord> {
        self.table.rows.get(uri)
    }

    /// Up to `limit` orphan URIs, oldest discovery first.
    #[must_use]
    pub fn list_all(&self, limit: usize) -> Vec<String> {
        let mut rows: Vec<&OrphanRecord> = self.table.rows.values().collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.uri.cmp(&b.uri)));
        rows.into_iter().take(limit).map(|r| r.uri.clone()).collect()
    }

    /// Every row in key order.
    pub fn records(&self) -> impl Iterator<Item = &OrphanRecord> {
        self.table.rows.values()
    }

    /// Number of recorded orphans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.rows.len()
    }

    /// Returns `true` when no orphan is recorded.
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
            .context("Failed to save orphan table")?;
        self.dirty = false;
        Ok(())
    }
}
