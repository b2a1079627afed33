//! Filesystem scanning: traversal, resume cursors and ignore patterns.

/// Resume tokens for chunked scans.
pub mod cursor;

/// Ignore-pattern parsing and glob evaluation.
pub mod ignore;

/// Lazy pre-order directory traversal.
pub mod walker;

pub use cursor::ResumeCursor;
pub use ignore::{IgnoreMatcher, parse_pattern_list, parse_patterns, validate_patterns};
pub use walker::{ClassifiedEntry, DirectoryWalker, Walk, WalkEntry};
