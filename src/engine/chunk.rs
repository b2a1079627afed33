use super::ReconciliationEngine;
use crate::registry::ManagedRegistry;
use crate::scanner::ResumeCursor;
use crate::utils::get_current_timestamp;
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{Level, debug, info, span};

/// One slice of a resumable scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkResult {
    /// Unmanaged files found in this slice, in walk order
    pub to_manage: Vec<String>,
    /// Token to pass to the next call; empty once the walk is complete
    pub resume: String,
    /// Non-ignored files visited in this slice
    pub files: usize,
}

impl ChunkResult {
    /// Returns `true` when the walk finished in this slice.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.resume.is_empty()
    }
}

impl<R: ManagedRegistry> ReconciliationEngine<R> {
    /// Scans from `cursor` until `batch_size` unmanaged files are collected or
    /// `time_limit` has elapsed.
    ///
    /// The deadline is checked after every visited file, ignored ones included,
    /// so one slow file can overrun it but a large ignored subtree cannot.
    /// Feeding each returned `resume` back in until it comes back empty yields
    /// exactly the files of one unchunked filtered scan, in the same order.
    /// A `batch_size` of zero is treated as one.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried or the orphan table
    /// cannot be saved
    pub fn scan_chunk(
        &mut self,
        cursor: &str,
        batch_size: usize,
        time_limit: Option<Duration>,
    ) -> Result<ChunkResult> {
        let span = span!(Level::DEBUG, "scan_chunk", cursor, batch_size);
        let _guard = span.enter();

        let started = Instant::now();
        let batch_size = batch_size.max(1);
        let cursor = ResumeCursor::parse(cursor);
        let managed = self.load_managed()?;
        let now = get_current_timestamp();
        let mut result = ChunkResult::default();

        for item in self.walker().resume(&cursor).classified(&self.matcher) {
            let ignored = item.is_ignored();
            let entry = item.entry;
            if !ignored {
                result.files += 1;
                let uri = self.scheme.uri_for(&entry.relative);
                if !managed.contains(&uri) {
                    if self.verbose {
                        debug!(uri = %uri, "Found orphan");
                    }
                    self.orphans.upsert(&uri, now);
                    result.to_manage.push(uri);
                }
            }

            let batch_full = result.to_manage.len() >= batch_size;
            let out_of_time = time_limit.is_some_and(|limit| started.elapsed() >= limit);
            if batch_full || out_of_time {
                result.resume = ResumeCursor::after(&entry.relative).token();
                break;
            }
        }

        self.orphans.flush()?;
        info!(
            found = result.to_manage.len(),
            complete = result.is_complete(),
            "Chunk scanned"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use crate::scanner::IgnoreMatcher;
    use crate::storage::{IndexStore, OrphanStore};
    use crate::uri::Scheme;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> Result<(TempDir, TempDir)> {
        let root = TempDir::new()?;
        let state = TempDir::new()?;
        fs::create_dir_all(root.path().join("docs/img"))?;
        for name in ["a.txt", "b.txt", "docs/readme.md", "docs/img/logo.png", "docs/z.txt"] {
            fs::write(root.path().join(name), name)?;
        }
        Ok((root, state))
    }

    fn engine(root: &TempDir, state: &TempDir, registry: MemoryRegistry) -> Result<ReconciliationEngine<MemoryRegistry>> {
        Ok(ReconciliationEngine::new(
            Scheme::new("public", root.path()),
            IgnoreMatcher::default(),
            registry,
            IndexStore::open(state.path().join("index.bin"))?,
            OrphanStore::open(state.path().join("orphans.bin"))?,
        ))
    }

    #[test]
    fn test_chunks_cover_full_scan() -> Result<()> {
        let (root, state) = site()?;
        let mut engine = engine(&root, &state, MemoryRegistry::with_uris(["public://b.txt"]))?;
        let expected = engine.scan_with_lists(usize::MAX)?.to_manage;

        let mut collected = Vec::new();
        let mut cursor = String::new();
        loop {
            let chunk = engine.scan_chunk(&cursor, 2, None)?;
            assert!(chunk.to_manage.len() <= 2);
            collected.extend(chunk.to_manage);
            if chunk.resume.is_empty() {
                break;
            }
            cursor = chunk.resume;
        }

        assert_eq!(collected, expected);
        Ok(())
    }

    #[test]
    fn test_zero_time_limit_still_progresses() -> Result<()> {
        let (root, state) = site()?;
        let mut engine = engine(&root, &state, MemoryRegistry::default())?;

        let chunk = engine.scan_chunk("", 100, Some(Duration::ZERO))?;
        assert_eq!(chunk.files, 1);
        assert_eq!(chunk.to_manage, vec!["public://docs/img/logo.png"]);
        assert!(!chunk.is_complete());
        Ok(())
    }

    #[test]
    fn test_deadline_applies_to_ignored_files() -> Result<()> {
        let (root, state) = site()?;
        let mut engine = ReconciliationEngine::new(
            Scheme::new("public", root.path()),
            IgnoreMatcher::from_raw("docs/*", true),
            MemoryRegistry::default(),
            IndexStore::open(state.path().join("index.bin"))?,
            OrphanStore::open(state.path().join("orphans.bin"))?,
        );

        let chunk = engine.scan_chunk("", 100, Some(Duration::ZERO))?;
        assert_eq!(chunk.files, 0);
        assert!(chunk.to_manage.is_empty());
        assert_eq!(chunk.resume, "docs/img/logo.png");

        let mut collected = Vec::new();
        let mut cursor = chunk.resume;
        while !cursor.is_empty() {
            let chunk = engine.scan_chunk(&cursor, 100, Some(Duration::ZERO))?;
            collected.extend(chunk.to_manage);
            cursor = chunk.resume;
        }
        assert_eq!(collected, vec!["public://a.txt", "public://b.txt"]);
        Ok(())
    }

    #[test]
    fn test_zero_batch_size_is_one() -> Result<()> {
        let (root, state) = site()?;
        let mut engine = engine(&root, &state, MemoryRegistry::default())?;

        let chunk = engine.scan_chunk("", 0, None)?;
        assert_eq!(chunk.to_manage.len(), 1);
        assert!(engine.orphans().contains("public://docs/img/logo.png"));
        Ok(())
    }
}
