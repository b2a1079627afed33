#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Counters over walked files cannot overflow
#![allow(clippy::indexing_slicing)] // Bounds checked by logic

//! # Orphanage - Orphan File Reconciliation
//!
//! Orphanage walks a directory tree exposed under a URI scheme (such as
//! `public://`) and reconciles it against a registry of managed files. Files
//! with no registry entry are "orphans"; they can be recorded, listed in
//! resumable chunks, and adopted into the registry.
//!
//! ## Features
//!
//! - **Lazy Traversal**: Deterministic pre-order walk that stops as soon as the
//!   caller stops consuming
//! - **Resumable Scans**: Time-boxed chunks with a resume token that never skips
//!   or repeats a file
//! - **Ignore Patterns**: Glob patterns evaluated against root-relative paths
//! - **Binary Index**: Per-file managed/ignored state persisted with bincode
//! - **Safe Adoption**: Membership is re-checked right before each registry write,
//!   and a failed file never aborts a batch
//!
//! ## Architecture
//!
//! - [`uri`]: URI canonicalization and scheme/path mapping
//! - [`scanner`]: Directory walking, resume cursors and ignore matching
//! - [`registry`]: The managed-file registry contract and implementations
//! - [`storage`]: Index and orphan tables
//! - [`engine`]: Scan, index and adoption operations
//! - [`hooks`]: Index maintenance on registry create/delete
//! - [`commands`]: CLI command implementations
//! - [`config`]: Configuration parsing and validation
//!
//! ## Example Usage
//!
//! ```no_run
//! use orphanage::OrphanageContext;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = OrphanageContext::new()?;
//! let mut engine = ctx.open_engine()?;
//!
//! let lists = engine.scan_with_lists(20)?;
//! println!("{} of {} files are orphans", lists.orphans, lists.files);
//!
//! let summary = engine.adopt_files(&lists.to_manage)?;
//! println!("adopted {}", summary.adopted);
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Configuration parsing, validation, and management.
pub mod config;

/// Scan, index and adoption operations.
pub mod engine;

/// Index maintenance driven by registry notifications.
pub mod hooks;

/// Advisory locking so only one reconciliation runs per state directory.
pub mod lock;

/// Output formatting and logging setup.
pub mod output;

/// Managed-file registry contract and implementations.
pub mod registry;

/// Directory walking, resume cursors and ignore matching.
pub mod scanner;

/// Index and orphan tables.
pub mod storage;

/// URI canonicalization.
pub mod uri;

/// Utility functions and helpers.
pub mod utils;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Current version of the orphanage binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard ceiling on files listed or adopted by one invocation.
pub const MAX_ITEMS_PER_RUN: usize = 500;

/// Default configuration file path relative to home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/orphanage/config";

/// Name of the binary index file.
pub const INDEX_FILE: &str = "index.bin";

/// Name of the binary orphan table.
pub const ORPHANS_FILE: &str = "orphans.bin";

/// Name of the file-backed registry.
pub const REGISTRY_FILE: &str = "registry.bin";

/// Engine backed by the registry in the state directory.
pub type FileEngine = engine::ReconciliationEngine<registry::FileRegistry>;

/// Central context for all Orphanage operations.
///
/// Holds the configuration path and the loaded configuration. The state
/// directory comes from the configuration unless `ORPHANAGE_STATE_DIR`
/// overrides it.
///
/// # Examples
///
/// ```no_run
/// use orphanage::OrphanageContext;
///
/// # fn main() -> anyhow::Result<()> {
/// // Context with default paths
/// let ctx = OrphanageContext::new()?;
///
/// // Context with an explicit config file (for testing)
/// let ctx = OrphanageContext::new_explicit("/tmp/orphanage/config".into())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OrphanageContext {
    /// Path to the configuration file.
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,

    /// Emit per-file debug events regardless of `scan.verbose_logging`.
    pub verbose: bool,
}

impl OrphanageContext {
    /// Creates a context by loading the configuration from the default path.
    ///
    /// `ORPHANAGE_CONFIG_PATH` replaces the default path and
    /// `ORPHANAGE_STATE_DIR` replaces the configured state directory.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or if the configuration
    /// file cannot be read or created.
    pub fn new() -> Result<Self> {
        // Check environment variable for config path first
        let config_path = if let Ok(path) = std::env::var("ORPHANAGE_CONFIG_PATH") {
            PathBuf::from(path)
        } else {
            let home = dirs::home_dir().context("Could not find home directory")?;
            home.join(DEFAULT_CONFIG_PATH)
        };

        let mut context = Self::new_explicit(config_path)?;

        // Allow environment variable to override the state directory
        if let Ok(path) = std::env::var("ORPHANAGE_STATE_DIR") {
            context.config.core.state_dir = PathBuf::from(path);
        }

        Ok(context)
    }

    /// Creates a context from an explicit configuration file, creating a
    /// default one when missing.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or created.
    pub fn new_explicit(config_path: PathBuf) -> Result<Self> {
        let config = config::Config::load(&config_path)?;
        Ok(Self {
            config_path,
            config,
            verbose: false,
        })
    }

    /// Directory holding the state tables.
    #[must_use]
    pub fn state_dir(&self) -> &std::path::Path {
        &self.config.core.state_dir
    }

    /// Ensures that the state directory exists.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_state_dir(&self) -> Result<()> {
        std::fs::create_dir_all(self.state_dir()).with_context(|| {
            format!(
                "Failed to create state directory: {}",
                self.state_dir().display()
            )
        })
    }

    /// Opens an engine over the configured root, backed by the file registry.
    ///
    /// # Errors
    /// Returns an error if the state directory cannot be created or a table
    /// cannot be loaded.
    pub fn open_engine(&self) -> Result<FileEngine> {
        self.ensure_state_dir()?;
        let registry = registry::FileRegistry::open(self.state_dir().join(REGISTRY_FILE))?;
        let verbose = self.verbose || self.config.scan.verbose_logging;
        Ok(engine::ReconciliationEngine::open(&self.config, registry)?.with_verbose_logging(verbose))
    }
}
