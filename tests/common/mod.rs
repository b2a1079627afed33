#![allow(dead_code)]

use anyhow::Result;
use orphanage::engine::ReconciliationEngine;
use orphanage::registry::MemoryRegistry;
use orphanage::scanner::IgnoreMatcher;
use orphanage::storage::{IndexStore, OrphanStore};
use orphanage::uri::Scheme;
use orphanage::{INDEX_FILE, ORPHANS_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fixed modification time so index rows are reproducible
pub const FIXED_MTIME: i64 = 1_700_000_000;

/// Test site fixture: a scanned root plus a state directory
pub struct TestSite {
    pub root: TempDir,
    pub state: TempDir,
}

impl TestSite {
    /// Create an empty site
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new()?,
            state: TempDir::new()?,
        })
    }

    /// Create a site holding the given root-relative files
    pub fn with_files(files: &[&str]) -> Result<Self> {
        let site = Self::new()?;
        for file in files {
            site.write(file)?;
        }
        Ok(site)
    }

    /// Root directory path
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Write a file (creating parents) with a pinned modification time
    pub fn write(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, relative)?;
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(FIXED_MTIME, 0))?;
        Ok(path)
    }

    /// Delete a file
    pub fn remove(&self, relative: &str) -> Result<()> {
        fs::remove_file(self.root().join(relative))?;
        Ok(())
    }

    /// The `public` scheme rooted at this site
    pub fn scheme(&self) -> Scheme {
        Scheme::new("public", self.root())
    }

    /// Engine over this site with the given registry and ignore patterns
    pub fn engine(
        &self,
        registry: MemoryRegistry,
        patterns: &str,
    ) -> Result<ReconciliationEngine<MemoryRegistry>> {
        Ok(ReconciliationEngine::new(
            self.scheme(),
            IgnoreMatcher::from_raw(patterns, true),
            registry,
            IndexStore::open(self.index_path())?,
            OrphanStore::open(self.orphans_path())?,
        ))
    }

    /// Location of the persisted index
    pub fn index_path(&self) -> PathBuf {
        self.state.path().join(INDEX_FILE)
    }

    /// Location of the persisted orphan table
    pub fn orphans_path(&self) -> PathBuf {
        self.state.path().join(ORPHANS_FILE)
    }

    /// Raw bytes of the persisted index
    pub fn index_bytes(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.index_path())?)
    }
}
