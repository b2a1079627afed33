//! Reconciliation of the scanned tree against the registry.
//!
//! [`ReconciliationEngine`] ties the walker, the ignore matcher, the registry
//! snapshot and the two state tables together. Every public operation is one
//! top-level call:
//!
//! 1. load a fresh [`ManagedSet`] snapshot from the registry
//! 2. walk the tree (filtered or classified, from the start or a cursor)
//! 3. update the index / orphan tables
//! 4. flush the tables, propagating any persistence error
//!
//! The snapshot is a local of each call and is dropped when the call returns,
//! so membership never leaks from one call into the next.
//!
//! The engine performs no locking. Callers serialize invocations per root
//! (the CLI uses [`crate::lock::ScanLock`]).

/// File adoption.
mod adopt;
/// Time-boxed, resumable scanning.
mod chunk;

use crate::config::Config;
use crate::hooks::{EntityLifecycleHook, HookEffect};
use crate::registry::{ManagedEntity, ManagedRegistry, ManagedSet};
use crate::scanner::{DirectoryWalker, IgnoreMatcher, WalkEntry};
use crate::storage::{IndexGroup, IndexRecord, IndexStore, OrphanStore};
use crate::uri::Scheme;
use crate::utils::{file_mtime, get_current_timestamp};
use crate::{INDEX_FILE, ORPHANS_FILE};
use anyhow::Result;
use std::collections::HashSet;
use tracing::{Level, debug, info, span, warn};

pub use adopt::{AdoptOutcome, AdoptionSummary};
pub use chunk::ChunkResult;

/// Outcome of [`ReconciliationEngine::scan_public_files`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullScanReport {
    /// Files observed and indexed
    pub files: usize,
    /// Rows dropped because their file is gone
    pub removed: usize,
}

/// Outcome of [`ReconciliationEngine::scan_with_lists`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanLists {
    /// Non-ignored files seen
    pub files: usize,
    /// Unmanaged files among them, uncapped
    pub orphans: usize,
    /// First unmanaged files in walk order, capped by the requested limit
    pub to_manage: Vec<String>,
}

/// Counters reported by the record and process scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    /// Non-ignored files seen
    pub files: usize,
    /// Unmanaged files among them
    pub orphans: usize,
    /// Files adopted during the scan
    pub adopted: usize,
}

/// Index totals for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Every indexed file
    pub total: usize,
    /// Files with a registry entry
    pub managed: usize,
    /// Unmanaged files matching an ignore pattern
    pub ignored: usize,
    /// Unmanaged files no pattern matches
    pub unmanaged: usize,
    /// Rows in the orphan table
    pub orphans: usize,
}

/// Orchestrates scans, index maintenance and adoption for one scheme root.
#[derive(Debug)]
pub struct ReconciliationEngine<R: ManagedRegistry> {
    /// Scheme and root being reconciled
    scheme: Scheme,
    /// Compiled ignore patterns
    matcher: IgnoreMatcher,
    /// Skip symbolic links instead of following them
    ignore_symlinks: bool,
    /// Emit per-file debug events
    verbose: bool,
    /// Source of managed-file membership
    registry: R,
    /// Per-file index table
    index: IndexStore,
    /// Orphan table
    orphans: OrphanStore,
}

impl<R: ManagedRegistry> ReconciliationEngine<R> {
    /// Assembles an engine from its collaborators.
    #[must_use]
    pub fn new(
        scheme: Scheme,
        matcher: IgnoreMatcher,
        registry: R,
        index: IndexStore,
        orphans: OrphanStore,
    ) -> Self {
        Self {
            scheme,
            matcher,
            ignore_symlinks: false,
            verbose: false,
            registry,
            index,
            orphans,
        }
    }

    /// Opens the state tables named by `config` and wires them to `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or orphan table cannot be loaded
    pub fn open(config: &Config, registry: R) -> Result<Self> {
        let state_dir = &config.core.state_dir;
        let index = IndexStore::open(state_dir.join(INDEX_FILE))?;
        let orphans = OrphanStore::open(state_dir.join(ORPHANS_FILE))?;
        let matcher = IgnoreMatcher::new(config.scan.patterns(), config.scan.case_sensitive());

        Ok(Self::new(config.scheme(), matcher, registry, index, orphans)
            .with_ignore_symlinks(config.scan.ignore_symlinks)
            .with_verbose_logging(config.scan.verbose_logging))
    }

    /// Skips symbolic links during walks.
    #[must_use]
    pub fn with_ignore_symlinks(mut self, ignore_symlinks: bool) -> Self {
        self.ignore_symlinks = ignore_symlinks;
        self
    }

    /// Enables per-file debug events.
    #[must_use]
    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Scheme being reconciled.
    #[must_use]
    pub const fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The registry collaborator.
    #[must_use]
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable access to the registry collaborator.
    pub const fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// The file index.
    #[must_use]
    pub const fn index(&self) -> &IndexStore {
        &self.index
    }

    /// The orphan table.
    #[must_use]
    pub const fn orphans(&self) -> &OrphanStore {
        &self.orphans
    }

    /// Configured ignore patterns in configuration order.
    #[must_use]
    pub fn get_ignore_patterns(&self) -> &[String] {
        self.matcher.patterns()
    }

    /// The compiled ignore patterns.
    #[must_use]
    pub const fn matcher(&self) -> &IgnoreMatcher {
        &self.matcher
    }

    /// Walks the whole tree and brings the index in line with it.
    ///
    /// Every file is upserted with its current ignored/managed flags; rows of
    /// files that were not seen and no longer exist on disk are removed.
    /// Running it twice on an unchanged tree leaves the index byte-identical.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or the index cannot
    /// be saved
    pub fn scan_public_files(&mut self) -> Result<FullScanReport> {
        let span = span!(Level::DEBUG, "scan_public_files", root = %self.scheme.root().display());
        let _guard = span.enter();

        let walk = self.walker().walk();
        if !walk.is_open() {
            warn!(root = %self.scheme.root().display(), "Scan root unavailable, index left untouched");
            return Ok(FullScanReport::default());
        }

        let managed = self.load_managed()?;
        let mut observed = HashSet::new();
        let mut report = FullScanReport::default();

        for item in walk.classified(&self.matcher) {
            let record = self.index_record(&managed, &item.entry, item.is_ignored());
            if self.verbose {
                debug!(uri = %record.uri, ignored = record.is_ignored, managed = record.is_managed, "Indexed file");
            }
            observed.insert(record.uri.clone());
            self.index.upsert(record);
            report.files += 1;
        }

        let missing: Vec<String> = self
            .index
            .uris()
            .filter(|uri| self.scheme.owns(uri) && !observed.contains(*uri))
            .filter(|uri| self.scheme.real_path(uri).is_none_or(|path| !path.exists()))
            .map(str::to_string)
            .collect();
        report.removed = self.index.delete_missing(&missing);

        self.index.flush()?;
        info!(files = report.files, removed = report.removed, "Full scan complete");
        Ok(report)
    }

    /// Rebuilds the index from scratch.
    ///
    /// Used after configuration changes (such as edited ignore patterns) so no
    /// stale flag survives. Returns the number of files indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or the index cannot
    /// be saved
    pub fn build_index(&mut self) -> Result<usize> {
        let span = span!(Level::DEBUG, "build_index");
        let _guard = span.enter();

        let walk = self.walker().walk();
        if !walk.is_open() {
            warn!(root = %self.scheme.root().display(), "Scan root unavailable, index left untouched");
            return Ok(0);
        }

        let managed = self.load_managed()?;
        self.index.truncate_all();

        let mut count = 0;
        for item in walk.classified(&self.matcher) {
            let record = self.index_record(&managed, &item.entry, item.is_ignored());
            self.index.upsert(record);
            count += 1;
        }

        self.index.flush()?;
        info!(files = count, "Index rebuilt");
        Ok(count)
    }

    /// Records every unmanaged, non-ignored file as an orphan and returns the
    /// first `limit` of them in walk order.
    ///
    /// `files` and `orphans` keep counting past the cap; only the returned
    /// list is bounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or the orphan table
    /// cannot be saved
    pub fn scan_with_lists(&mut self, limit: usize) -> Result<ScanLists> {
        let span = span!(Level::DEBUG, "scan_with_lists", limit);
        let _guard = span.enter();

        let managed = self.load_managed()?;
        let now = get_current_timestamp();
        let mut lists = ScanLists::default();

        for entry in self.walker().walk().filtered(&self.matcher) {
            lists.files += 1;
            let uri = self.scheme.uri_for(&entry.relative);
            if managed.contains(&uri) {
                continue;
            }

            if self.verbose {
                debug!(uri = %uri, "Found orphan");
            }
            lists.orphans += 1;
            self.orphans.upsert(&uri, now);
            if lists.to_manage.len() < limit {
                lists.to_manage.push(uri);
            }
        }

        self.orphans.flush()?;
        info!(files = lists.files, orphans = lists.orphans, "Orphan scan complete");
        Ok(lists)
    }

    /// Same scan as [`Self::scan_with_lists`], reporting counts only.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or the orphan table
    /// cannot be saved
    pub fn record_orphans(&mut self, limit: usize) -> Result<ScanCounts> {
        let lists = self.scan_with_lists(limit)?;
        Ok(ScanCounts {
            files: lists.files,
            orphans: lists.orphans,
            adopted: 0,
        })
    }

    /// Records orphans and, with `adopt`, adopts up to `limit` of them as
    /// they are found.
    ///
    /// A failed adoption is logged and counted out; the scan carries on.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or a table cannot be
    /// saved
    pub fn scan_and_process(&mut self, adopt: bool, limit: usize) -> Result<ScanCounts> {
        let span = span!(Level::DEBUG, "scan_and_process", adopt, limit);
        let _guard = span.enter();

        let mut managed = self.load_managed()?;
        let matcher = self.matcher.clone();
        let now = get_current_timestamp();
        let mut counts = ScanCounts::default();

        for entry in self.walker().walk().filtered(&matcher) {
            counts.files += 1;
            let uri = self.scheme.uri_for(&entry.relative);
            if managed.contains(&uri) {
                continue;
            }

            counts.orphans += 1;
            self.orphans.upsert(&uri, now);
            if adopt
                && counts.adopted < limit
                && self.adopt_canonical(&mut managed, &uri).is_adopted()
            {
                counts.adopted += 1;
            }
        }

        self.flush()?;
        info!(
            files = counts.files,
            orphans = counts.orphans,
            adopted = counts.adopted,
            "Scan processed"
        );
        Ok(counts)
    }

    /// Drops orphan rows whose file is gone or has since become managed.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or the orphan table
    /// cannot be saved
    pub fn prune_stale_orphans(&mut self) -> Result<usize> {
        let managed = self.load_managed()?;
        let stale: Vec<String> = self
            .orphans
            .records()
            .map(|r| r.uri.as_str())
            .filter(|uri| {
                managed.contains(uri)
                    || self.scheme.real_path(uri).is_none_or(|path| !path.is_file())
            })
            .map(str::to_string)
            .collect();

        for uri in &stale {
            self.orphans.delete(uri);
        }
        self.orphans.flush()?;
        info!(removed = stale.len(), "Pruned stale orphans");
        Ok(stale.len())
    }

    /// Index and orphan totals.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            orphans: self.orphans.len(),
            ..IndexStats::default()
        };
        for (group, count) in self.index.count_by_ignored_managed() {
            stats.total += count;
            match group {
                IndexGroup {
                    is_managed: true, ..
                } => stats.managed += count,
                IndexGroup {
                    is_ignored: true, ..
                } => stats.ignored += count,
                IndexGroup { .. } => stats.unmanaged += count,
            }
        }
        stats
    }

    /// Applies a registry insert notification to the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be saved
    pub fn on_entity_insert(&mut self, entity: &ManagedEntity) -> Result<HookEffect> {
        let effect = EntityLifecycleHook::new(&self.scheme, &self.matcher)
            .on_entity_insert(&mut self.index, entity);
        self.index.flush()?;
        Ok(effect)
    }

    /// Applies a registry delete notification to the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be saved
    pub fn on_entity_delete(&mut self, entity: &ManagedEntity) -> Result<HookEffect> {
        let effect = EntityLifecycleHook::new(&self.scheme, &self.matcher)
            .on_entity_delete(&mut self.index, entity);
        self.index.flush()?;
        Ok(effect)
    }

    /// Fresh registry snapshot for one top-level call.
    fn load_managed(&self) -> Result<ManagedSet> {
        ManagedSet::load(&self.registry, &self.scheme)
    }

    fn walker(&self) -> DirectoryWalker {
        DirectoryWalker::new(self.scheme.root(), self.ignore_symlinks)
    }

    fn index_record(
        &self,
        managed: &ManagedSet,
        entry: &WalkEntry,
        is_ignored: bool,
    ) -> IndexRecord {
        let uri = self.scheme.uri_for(&entry.relative);
        let is_managed = managed.contains(&uri);
        let timestamp = file_mtime(&entry.path).unwrap_or_else(get_current_timestamp);
        IndexRecord::new(uri, is_ignored, is_managed, entry.depth(), timestamp)
    }

    fn flush(&mut self) -> Result<()> {
        self.index.flush()?;
        self.orphans.flush()
    }
}
