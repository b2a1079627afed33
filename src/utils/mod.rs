//! Utility functions and helpers.
//!
//! - Path manipulation (tilde expansion)
//! - Timestamp utilities
//! - Binary serialization of the state tables ([`serialization`])

/// Binary serialization utilities
pub mod serialization;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Expands a path starting with `~` to the user's home directory.
///
/// # Errors
///
/// Returns an error if the path is empty.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        anyhow::bail!("Path cannot be empty");
    }
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return Ok(home.join(&path[2..]));
    }
    Ok(PathBuf::from(path))
}

/// Returns the current timestamp as seconds since the Unix epoch.
#[must_use]
pub fn get_current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Modification time of a file as seconds since the Unix epoch.
///
/// Returns `None` when the file cannot be stat'ed or the time is not
/// representable.
#[must_use]
pub fn file_mtime(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_secs()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() -> Result<()> {
        assert!(expand_tilde("").is_err());
        assert_eq!(expand_tilde("/srv/files")?, PathBuf::from("/srv/files"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/files")?, home.join("files"));
        }
        Ok(())
    }

    #[test]
    fn test_file_mtime() -> Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "a")?;
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_600_000_000, 0))?;

        assert_eq!(file_mtime(&path), Some(1_600_000_000));
        assert_eq!(file_mtime(&temp.path().join("missing")), None);
        Ok(())
    }

    #[test]
    fn test_current_timestamp_is_recent() {
        assert!(get_current_timestamp() > 1_600_000_000);
    }
}
