//! Resume tokens for chunked scans.
//!
//! A cursor names the last file a chunk visited, as a root-relative path with
//! forward slashes. Resuming yields exactly the files that follow it in walk
//! order, which lets the walker prune whole subtrees that sort before the
//! cursor instead of re-enumerating them.
//!
//! Walk order is pre-order with, inside one directory, subdirectories first
//! and then files, each group sorted by name.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fmt;

/// Position of a path component inside its parent directory listing.
///
/// Directories sort before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum EntryRank {
    /// Directory (or a symlink followed to one)
    Directory,
    /// Anything that is not descended into
    File,
}

/// Opaque marker of the last visited file in a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeCursor {
    /// Components of the last visited relative path; empty means "start of tree"
    components: Vec<String>,
}

impl ResumeCursor {
    /// Cursor pointing at the start of the tree.
    #[must_use]
    pub fn start() -> Self {
        Self::default()
    }

    /// Parses a token. Empty tokens (and tokens made only of separators) mean
    /// "start of tree".
    #[must_use]
    pub fn parse(token: &str) -> Self {
        Self {
            components: token
                .split('/')
                .filter(|c| !c.is_empty() && *c != ".")
                .map(str::to_string)
                .collect(),
        }
    }

    /// Cursor positioned after the given relative file path.
    #[must_use]
    pub fn after(relative: &str) -> Self {
        Self::parse(relative)
    }

    /// Returns `true` when the cursor points at the start of the tree.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.components.is_empty()
    }

    /// Serializes the cursor back into a token.
    #[must_use]
    pub fn token(&self) -> String {
        self.components.join("/")
    }

    /// Compares a walk entry against the cursor in walk order.
    ///
    /// `entry` holds the relative components of a directory or file and
    /// `entry_is_dir` says whether its last component is a directory. Every
    /// cursor component but the last is a directory. An entry that is a
    /// proper ancestor of the cursor compares `Less`.
    pub(crate) fn compare<S: AsRef<OsStr>>(&self, entry: &[S], entry_is_dir: bool) -> Ordering {
        let cursor_len = self.components.len();
        for (i, (left, right)) in entry.iter().zip(&self.components).enumerate() {
            let left_rank = if i + 1 == entry.len() && !entry_is_dir {
                EntryRank::File
            } else {
                EntryRank::Directory
            };
            let right_rank = if i + 1 == cursor_len {
                EntryRank::File
            } else {
                EntryRank::Directory
            };
            let ordering = left_rank
                .cmp(&right_rank)
                .then_with(|| left.as_ref().cmp(OsStr::new(right)));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        entry.len().cmp(&cursor_len)
    }

    /// Returns `true` when a directory lies on the path to the cursor.
    pub(crate) fn is_ancestor<S: AsRef<OsStr>>(&self, dir: &[S]) -> bool {
        dir.len() < self.components.len()
            && dir
                .iter()
                .zip(&self.components)
                .all(|(d, c)| d.as_ref() == OsStr::new(c))
    }
}

impl fmt::Display for ResumeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}
