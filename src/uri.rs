//! Canonical scheme-qualified file identifiers.
//!
//! Every store keys its rows by a canonical URI such as `public://a/b.txt`.
//! Two spellings of the same file (`public:///a/b.txt`, `public://a/b.txt`)
//! must collapse to one key, so every URI entering the engine goes through
//! [`canonicalize`] first.

use std::path::{Path, PathBuf};

/// Marker separating a scheme name from the path part of a URI.
pub const SCHEME_SEPARATOR: &str = "://";

/// Collapses redundant separators immediately following the `scheme://` prefix.
///
/// Input that does not start with `scheme://` is returned unchanged. The
/// function never fails: malformed input is passed through as-is apart from
/// the leading-separator trim.
#[must_use]
pub fn canonicalize(uri: &str, scheme: &str) -> String {
    let prefix = format!("{scheme}{SCHEME_SEPARATOR}");
    match uri.strip_prefix(&prefix) {
        Some(rest) => format!("{prefix}{}", rest.trim_start_matches('/')),
        None => uri.to_string(),
    }
}

/// Counts directory separators in a root-relative path.
#[must_use]
pub fn directory_depth(relative: &str) -> u32 {
    u32::try_from(relative.matches('/').count()).unwrap_or(u32::MAX)
}

/// A URI scheme mapped onto a directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheme {
    /// Scheme name without the `://` marker, e.g. `public`
    name: String,
    /// Directory the scheme resolves to
    root: PathBuf,
}

impl Scheme {
    /// Creates a scheme rooted at `root`.
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Scheme name (without `://`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the scheme resolves to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `name://` prefix shared by every URI of this scheme.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}{SCHEME_SEPARATOR}", self.name)
    }

    /// Canonicalizes a URI against this scheme.
    #[must_use]
    pub fn canonicalize(&self, uri: &str) -> String {
        canonicalize(uri, &self.name)
    }

    /// Builds the canonical URI for a root-relative, forward-slash path.
    #[must_use]
    pub fn uri_for(&self, relative: &str) -> String {
        format!("{}{}", self.prefix(), relative.trim_start_matches('/'))
    }

    /// Returns `true` when the URI belongs to this scheme.
    #[must_use]
    pub fn owns(&self, uri: &str) -> bool {
        uri.starts_with(&self.prefix())
    }

    /// Root-relative path for a URI of this scheme, or `None` for foreign URIs.
    #[must_use]
    pub fn relative_path(&self, uri: &str) -> Option<String> {
        let canonical = self.canonicalize(uri);
        canonical
            .strip_prefix(&self.prefix())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }

    /// Resolves a URI of this scheme to its location on disk.
    ///
    /// Returns `None` for foreign URIs or paths attempting to climb out of the
    /// root with `..`.
    #[must_use]
    pub fn real_path(&self, uri: &str) -> Option<PathBuf> {
        let relative = self.relative_path(uri)?;
        if relative.split('/').any(|segment| segment == "..") {
            return None;
        }
        Some(
            relative
                .split('/')
                .filter(|segment| !segment.is_empty())
                .fold(self.root.clone(), |path, segment| path.join(segment)),
        )
    }
}
