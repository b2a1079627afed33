use anyhow::Result;
use std::path::Path;

use crate::lock::ScanLock;
use crate::uri::SCHEME_SEPARATOR;
use crate::{MAX_ITEMS_PER_RUN, OrphanageContext};

/// Trait providing common operations for command modules
pub trait CommandContext {
    /// Takes the reconciliation lock for the state directory
    ///
    /// # Errors
    ///
    /// Returns an error if another reconciliation holds the lock
    fn acquire_lock(&self, operation: &str) -> Result<ScanLock>;

    /// Turns a command-line argument into a canonical URI
    ///
    /// Accepts URIs, root-relative paths and absolute paths under the root.
    fn resolve_uri(&self, arg: &str) -> String;

    /// Effective per-run limit: the request or the configured default,
    /// never above [`MAX_ITEMS_PER_RUN`]
    fn clamp_limit(&self, requested: Option<usize>) -> usize;
}

impl CommandContext for OrphanageContext {
    fn acquire_lock(&self, operation: &str) -> Result<ScanLock> {
        self.ensure_state_dir()?;
        ScanLock::acquire(self.state_dir(), operation)
    }

    fn resolve_uri(&self, arg: &str) -> String {
        let scheme = self.config.scheme();
        if arg.contains(SCHEME_SEPARATOR) {
            return scheme.canonicalize(arg);
        }

        let relative = Path::new(arg)
            .strip_prefix(scheme.root())
            .ok()
            .and_then(Path::to_str)
            .unwrap_or(arg);
        scheme.uri_for(relative.trim_start_matches('/'))
    }

    fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.scan.items_per_run)
            .min(MAX_ITEMS_PER_RUN)
    }
}
