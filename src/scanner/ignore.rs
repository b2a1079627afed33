//! Ignore-pattern parsing and evaluation.
//!
//! Patterns come from a single configuration value split on newlines and
//! commas. They are glob expressions evaluated against the path relative to
//! the scanned root with shell `fnmatch` semantics: `*` and `?` may span
//! directory separators, so `css/*` covers everything below `css/`.
//!
//! Patterns without a `/` are additionally tried against the bare file name,
//! so `Thumbs.db` ignores that file in any directory.

use anyhow::{Result, bail};
use glob::{MatchOptions, Pattern};
use tracing::warn;

/// Whether pattern matching is case sensitive on this platform by default.
#[must_use]
pub const fn platform_case_sensitive() -> bool {
    !cfg!(any(windows, target_os = "macos"))
}

/// Splits a raw configuration value into trimmed, non-empty patterns.
///
/// Order is preserved; it decides which pattern is reported when several match.
#[must_use]
pub fn parse_patterns(raw: &str) -> Vec<String> {
    raw.split(['\n', ','])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Same as [`parse_patterns`] for a value that was already split into a list.
///
/// Each item is split again, so a list entry holding `"*.tmp, *.bak"` yields
/// two patterns.
#[must_use]
pub fn parse_pattern_list<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| parse_patterns(item.as_ref()))
        .collect()
}

/// Parses and compiles every pattern, failing on the first invalid one.
///
/// Used by configuration writers so a bad pattern is rejected before it is
/// ever persisted.
///
/// # Errors
///
/// Returns an error naming the offending pattern and the glob parse failure.
pub fn validate_patterns(raw: &str) -> Result<Vec<String>> {
    let patterns = parse_patterns(raw);
    for pattern in &patterns {
        if let Err(e) = Pattern::new(pattern) {
            bail!("Invalid ignore pattern '{pattern}': {e}");
        }
    }
    Ok(patterns)
}

/// Compiled set of ignore patterns.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    /// Source patterns in configuration order
    patterns: Vec<String>,
    /// Compiled form per pattern; `None` when the pattern failed to compile
    compiled: Vec<Option<Pattern>>,
    /// Options applied to every match
    options: MatchOptions,
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::new(Vec::new(), platform_case_sensitive())
    }
}

impl IgnoreMatcher {
    /// Compiles `patterns`.
    ///
    /// A pattern that fails to compile is kept in the list but never matches.
    #[must_use]
    pub fn new(patterns: Vec<String>, case_sensitive: bool) -> Self {
        let compiled = patterns
            .iter()
            .map(|p| match Pattern::new(p) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "Ignore pattern does not compile, it will never match");
                    None
                }
            })
            .collect();

        Self {
            patterns,
            compiled,
            options: MatchOptions {
                case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        }
    }

    /// Parses a raw configuration value and compiles the result.
    #[must_use]
    pub fn from_raw(raw: &str, case_sensitive: bool) -> Self {
        Self::new(parse_patterns(raw), case_sensitive)
    }

    /// Patterns in configuration order.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Each pattern paired with whether it compiled.
    pub fn pattern_status(&self) -> impl Iterator<Item = (&str, bool)> {
        self.patterns
            .iter()
            .zip(&self.compiled)
            .map(|(p, c)| (p.as_str(), c.is_some()))
    }

    /// Returns `true` when no pattern is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First pattern matching a root-relative path, in configuration order.
    ///
    /// The full relative path is tried first; patterns without a `/` are then
    /// tried against the final path component.
    #[must_use]
    pub fn matched_pattern(&self, relative: &str) -> Option<&str> {
        let relative = relative.trim_start_matches('/');
        let file_name = relative.rsplit('/').next().unwrap_or(relative);

        self.patterns
            .iter()
            .zip(&self.compiled)
            .find(|(source, compiled)| {
                compiled.as_ref().is_some_and(|pattern| {
                    pattern.matches_with(relative, self.options)
                        || (!source.contains('/')
                            && file_name != relative
                            && pattern.matches_with(file_name, self.options))
                })
            })
            .map(|(source, _)| source.as_str())
    }

    /// Returns `true` when any pattern matches the root-relative path.
    #[must_use]
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.matched_pattern(relative).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_patterns_splits_and_trims() {
        let parsed = parse_patterns("css/*\n *.tmp , ,\n\nprivate/**\r\n");
        assert_eq!(parsed, vec!["css/*", "*.tmp", "private/**"]);
    }

    #[test]
    fn test_parse_pattern_list_resplits_items() {
        let parsed = parse_pattern_list(&["*.tmp, *.bak", " ", "css/*"]);
        assert_eq!(parsed, vec!["*.tmp", "*.bak", "css/*"]);
    }

    #[rstest]
    #[case("css/*", "css/skip.txt", true)]
    #[case("css/*", "css/deep/skip.txt", true)]
    #[case("css/*", "example.txt", false)]
    #[case("css/*", "assets/css/a.txt", false)]
    #[case("*.tmp", "a/b/c.tmp", true)]
    #[case("?.txt", "a.txt", true)]
    #[case("?.txt", "ab.txt", false)]
    #[case("Thumbs.db", "photos/2024/Thumbs.db", true)]
    #[case("docs/Thumbs.db", "photos/Thumbs.db", false)]
    #[case("[ab].txt", "b.txt", true)]
    #[case("private/**", "private/x/y.txt", true)]
    fn test_matches(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
        let matcher = IgnoreMatcher::new(vec![pattern.to_string()], true);
        assert_eq!(matcher.is_ignored(path), expected, "{pattern} vs {path}");
    }

    #[test]
    fn test_first_matching_pattern_is_reported() {
        let matcher = IgnoreMatcher::from_raw("*.txt\ncss/*", true);
        assert_eq!(matcher.matched_pattern("css/a.txt"), Some("*.txt"));
        assert_eq!(matcher.matched_pattern("css/a.png"), Some("css/*"));
        assert_eq!(matcher.matched_pattern("a.png"), None);
    }

    #[test]
    fn test_case_sensitivity_option() {
        let sensitive = IgnoreMatcher::from_raw("*.TXT", true);
        let insensitive = IgnoreMatcher::from_raw("*.TXT", false);
        assert!(!sensitive.is_ignored("a.txt"));
        assert!(insensitive.is_ignored("a.txt"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let matcher = IgnoreMatcher::from_raw("***\n*.log", true);
        assert_eq!(matcher.patterns().len(), 2);
        assert!(!matcher.is_ignored("***"));
        assert!(matcher.is_ignored("debug.log"));

        let status: Vec<_> = matcher.pattern_status().collect();
        assert_eq!(status, vec![("***", false), ("*.log", true)]);
    }

    #[test]
    fn test_validate_patterns() {
        assert!(validate_patterns("css/*, *.tmp").is_ok());
        let err = validate_patterns("css/*\n***").unwrap_err();
        assert!(err.to_string().contains("***"));
    }

    #[test]
    fn test_empty_matcher_ignores_nothing() {
        let matcher = IgnoreMatcher::default();
        assert!(matcher.is_empty());
        assert!(!matcher.is_ignored("anything.txt"));
    }
}
