//! Advisory locking so only one reconciliation runs against a state directory
//!
//! The engine itself performs no locking; callers take a [`ScanLock`] around every
//! command that mutates the index, orphan table or registry. Locks are
//! automatically released when dropped.

use anyhow::{Context, Result, bail};
use fs4::fs_std::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Name of the lock file inside the locks directory
const LOCK_NAME: &str = "reconcile.lock";

/// Holds an exclusive lock on a state directory
///
/// The lock is automatically released when this struct is dropped.
#[derive(Debug)]
pub struct ScanLock {
    /// Lock file handle
    lock_file: File,
    /// Path to the lock file (for error messages)
    lock_path: PathBuf,
}

impl ScanLock {
    /// Acquire the reconciliation lock for `state_dir`
    ///
    /// `operation` is recorded in the lock file to help diagnose a held lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create locks directory
    /// - Another reconciliation holds the lock past the timeout
    pub fn acquire(state_dir: &Path, operation: &str) -> Result<Self> {
        let locks_dir = state_dir.join("locks");
        fs::create_dir_all(&locks_dir).context("Failed to create locks directory")?;

        // Clean up stale locks before attempting to acquire
        Self::cleanup_stale_locks(&locks_dir)?;

        let lock_path = locks_dir.join(LOCK_NAME);
        let lock_file = Self::try_acquire_lock(&lock_path, operation)?;
        debug!(operation, lock = %lock_path.display(), "Acquired scan lock");

        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    /// Try to acquire the lock file
    fn try_acquire_lock(lock_path: &Path, operation: &str) -> Result<File> {
        // Use shorter timeouts in test mode for faster test execution
        let lock_timeout = if cfg!(test) {
            Duration::from_millis(100)
        } else {
            Duration::from_secs(30)
        };
        let retry_interval = if cfg!(test) {
            Duration::from_millis(10)
        } else {
            Duration::from_millis(100)
        };

        let start = Instant::now();

        loop {
            let file = File::options()
                .create(true)
                .truncate(false)
                .write(true)
                .open(lock_path)
                .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

            match file.try_lock_exclusive() {
                Ok(true) => {
                    // Write operation info to lock file for debugging
                    use std::io::Write;
                    let _ = file.set_len(0);
                    let mut file_ref = &file;
                    let _ = writeln!(
                        file_ref,
                        "operation={}\npid={}\ntime={}",
                        operation,
                        std::process::id(),
                        humantime::format_rfc3339(SystemTime::now())
                    );
                    return Ok(file);
                }
                Ok(false) | Err(_) if start.elapsed() < lock_timeout => {
                    std::thread::sleep(retry_interval);
                }
                Ok(false) | Err(_) => {
                    bail!(
                        "Another reconciliation is already running. \
                         Please wait for it to complete or remove stale lock at: {}",
                        lock_path.display()
                    );
                }
            }
        }
    }

    /// Clean up stale lock files (older than 5 minutes)
    ///
    /// This handles cases where a process crashed without releasing its lock.
    fn cleanup_stale_locks(locks_dir: &Path) -> Result<()> {
        const STALE_THRESHOLD: Duration = Duration::from_secs(300); // 5 minutes

        let entries = fs::read_dir(locks_dir).context("Failed to read locks directory")?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "lock") {
                continue;
            }

            if let Ok(metadata) = entry.metadata()
                && let Ok(modified) = metadata.modified()
                && let Ok(elapsed) = modified.elapsed()
                && elapsed > STALE_THRESHOLD
                && let Err(e) = fs::remove_file(&path)
            {
                warn!(lock = %path.display(), error = %e, "Failed to remove stale lock");
            }
        }

        Ok(())
    }

    /// Path of the held lock file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    /// Release the lock explicitly (normally handled by Drop)
    ///
    /// # Errors
    ///
    /// Returns an error if the unlock operation fails
    pub fn release(self) -> Result<()> {
        FileExt::unlock(&self.lock_file)?;
        Ok(())
    }
}

impl Drop for ScanLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);

        if let Err(e) = fs::remove_file(&self.lock_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(lock = %self.lock_path.display(), error = %e, "Failed to remove lock file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() -> Result<()> {
        let temp = TempDir::new()?;
        let lock = ScanLock::acquire(temp.path(), "scan")?;
        let path = lock.path().to_path_buf();
        assert!(path.exists());

        lock.release()?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_concurrent_locks_fail() -> Result<()> {
        let temp = TempDir::new()?;
        let _lock1 = ScanLock::acquire(temp.path(), "scan")?;

        // Second lock should fail quickly in test mode
        let start = Instant::now();
        let result = ScanLock::acquire(temp.path(), "adopt");
        let elapsed = start.elapsed();

        assert!(result.is_err(), "Second lock acquisition should fail");
        assert!(
            elapsed < Duration::from_millis(500),
            "Lock should fail quickly in test mode (took {elapsed:?})"
        );
        Ok(())
    }

    #[test]
    fn test_lock_is_reusable_after_drop() -> Result<()> {
        let temp = TempDir::new()?;
        drop(ScanLock::acquire(temp.path(), "scan")?);
        assert!(ScanLock::acquire(temp.path(), "scan").is_ok());
        Ok(())
    }

    #[test]
    fn test_separate_state_dirs_do_not_conflict() -> Result<()> {
        let first = TempDir::new()?;
        let second = TempDir::new()?;
        let _lock1 = ScanLock::acquire(first.path(), "scan")?;
        assert!(ScanLock::acquire(second.path(), "scan").is_ok());
        Ok(())
    }
}
