//! Lazy, resumable directory traversal.
//!
//! [`DirectoryWalker`] yields the regular files below a root as forward-slash
//! relative paths, one at a time. Nothing is collected up front: callers stop
//! pulling whenever a limit is reached.
//!
//! Traversal rules:
//! - pre-order; inside a directory, subdirectories first, then files, each
//!   group sorted by name
//! - entries whose name starts with `.` are skipped together with their subtree
//! - with `ignore_symlinks`, symbolic links are skipped entirely
//! - otherwise a symlinked directory is followed only when its target lies
//!   outside the walk root and is not an ancestor of it; any other target is
//!   either a cycle or a directory the walk reaches through its real path

use super::cursor::{EntryRank, ResumeCursor};
use super::ignore::IgnoreMatcher;
use crate::uri::directory_depth;
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// A regular file found by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walk root, `/`-separated
    pub relative: String,
    /// Absolute (root-joined) path on disk
    pub path: PathBuf,
}

impl WalkEntry {
    /// Number of directory separators in the relative path.
    #[must_use]
    pub fn depth(&self) -> u32 {
        directory_depth(&self.relative)
    }

    /// Final path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }
}

/// A walk entry paired with the ignore pattern it matched, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntry {
    /// The file itself
    pub entry: WalkEntry,
    /// First ignore pattern matching the file
    pub matched_pattern: Option<String>,
}

impl ClassifiedEntry {
    /// Returns `true` when an ignore pattern matched.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.matched_pattern.is_some()
    }
}

/// Walks one root directory.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    /// Directory to enumerate
    root: PathBuf,
    /// Skip symbolic links instead of following them
    ignore_symlinks: bool,
}

impl DirectoryWalker {
    /// Creates a walker over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, ignore_symlinks: bool) -> Self {
        Self {
            root: root.into(),
            ignore_symlinks,
        }
    }

    /// Root being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a fresh walk from the top of the tree.
    #[must_use]
    pub fn walk(&self) -> Walk {
        self.resume(&ResumeCursor::start())
    }

    /// Continues a walk after `cursor`.
    ///
    /// The result is exactly the tail of an uninterrupted walk following the
    /// cursor path. Subtrees sorting entirely before the cursor are pruned
    /// without being read.
    #[must_use]
    pub fn resume(&self, cursor: &ResumeCursor) -> Walk {
        let root_real = match std::fs::canonicalize(&self.root) {
            Ok(path) if path.is_dir() => path,
            Ok(path) => {
                debug!(root = %path.display(), "Scan root is not a directory");
                return Walk::empty(self.root.clone());
            }
            Err(e) => {
                debug!(root = %self.root.display(), error = %e, "Scan root is unavailable");
                return Walk::empty(self.root.clone());
            }
        };

        let root = self.root.clone();
        let cursor = cursor.clone();
        let ignore_symlinks = self.ignore_symlinks;

        let inner = WalkDir::new(&self.root)
            .follow_links(!ignore_symlinks)
            .sort_by(walk_order)
            .into_iter()
            .filter_entry(move |entry| {
                keep_entry(entry, &root, &root_real, &cursor, ignore_symlinks)
            });

        Walk {
            root: self.root.clone(),
            inner: Some(Box::new(inner)),
        }
    }
}

/// Orders siblings: directories first, then by file name.
fn walk_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Rank of an entry among its siblings, resolving symlinks the way the walk
/// will follow them.
fn rank(entry: &DirEntry) -> EntryRank {
    let file_type = entry.file_type();
    if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
        EntryRank::Directory
    } else {
        EntryRank::File
    }
}

/// Decides whether an entry is yielded (files) or descended into (directories).
fn keep_entry(
    entry: &DirEntry,
    root: &Path,
    root_real: &Path,
    cursor: &ResumeCursor,
    ignore_symlinks: bool,
) -> bool {
    if entry.depth() == 0 {
        return true;
    }

    if entry.file_name().as_encoded_bytes().first() == Some(&b'.') {
        return false;
    }

    if entry.path_is_symlink() {
        if ignore_symlinks {
            return false;
        }
        if entry.file_type().is_dir() && resolves_into_walk(entry.path(), root_real) {
            debug!(path = %entry.path().display(), "Skipping symlinked directory that loops back into the walk");
            return false;
        }
    }

    if cursor.is_start() {
        return true;
    }

    let Ok(relative) = entry.path().strip_prefix(root) else {
        return false;
    };
    let components: Vec<&OsStr> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();

    if entry.file_type().is_dir() {
        cursor.is_ancestor(&components) || cursor.compare(&components, true) == Ordering::Greater
    } else {
        cursor.compare(&components, false) == Ordering::Greater
    }
}

/// Returns `true` when a symlink target is the walk root, lies inside it, or
/// contains it. Unresolvable targets count as looping.
fn resolves_into_walk(link: &Path, root_real: &Path) -> bool {
    std::fs::canonicalize(link)
        .map_or(true, |target| target.starts_with(root_real) || root_real.starts_with(&target))
}

/// Lazy sequence of files produced by [`DirectoryWalker`].
pub struct Walk {
    /// Root the relative paths are computed against
    root: PathBuf,
    /// Underlying traversal; `None` when the root could not be opened
    inner: Option<Box<dyn Iterator<Item = walkdir::Result<DirEntry>>>>,
}

impl std::fmt::Debug for Walk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walk")
            .field("root", &self.root)
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl Walk {
    /// A walk that yields nothing.
    fn empty(root: PathBuf) -> Self {
        Self { root, inner: None }
    }

    /// Returns `false` when the root could not be opened and the walk is
    /// empty for that reason rather than because the tree has no files.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Yields only files no ignore pattern matches.
    pub fn filtered(self, matcher: &IgnoreMatcher) -> impl Iterator<Item = WalkEntry> + '_ {
        self.filter(move |entry| !matcher.is_ignored(&entry.relative))
    }

    /// Yields every file together with the ignore pattern it matched.
    pub fn classified(self, matcher: &IgnoreMatcher) -> impl Iterator<Item = ClassifiedEntry> + '_ {
        self.map(move |entry| ClassifiedEntry {
            matched_pattern: matcher.matched_pattern(&entry.relative).map(str::to_string),
            entry,
        })
    }
}

impl Iterator for Walk {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.inner.as_mut()?;
        loop {
            let entry = match inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    // Unreadable directories and symlink loops are skipped
                    debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(relative) = relative_path(&self.root, entry.path()) {
                return Some(WalkEntry {
                    relative,
                    path: entry.into_path(),
                });
            }
        }
    }
}

/// Forward-slash relative path, or `None` for paths outside the root or with
/// non UTF-8 names.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let Some(name) = name.to_str() else {
                    debug!(path = %path.display(), "Skipping file with non UTF-8 name");
                    return None;
                };
                parts.push(name);
            }
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}
