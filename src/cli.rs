//! Command-line interface definitions for orphanage.
//!
//! This module contains all CLI argument parsing structures using clap's derive macros.
//! The CLI definitions are shared between the main binary and build tools (like xtask)
//! for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes (#[arg(help = "...")]),
//! so we allow missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Main CLI structure for orphanage.
#[derive(Parser)]
#[command(
    name = "orphanage",
    version = crate::VERSION,
    about = "Find and adopt files missing from the managed-file registry",
    long_about = "Reconciles a directory tree against a registry of managed files, \
                  recording orphans, maintaining a file index and adopting files"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Record unmanaged files in the orphan table
    Scan {
        /// Rebuild index rows for every file and drop rows of deleted files
        #[arg(long)]
        full: bool,
    },

    /// List unmanaged files
    List {
        /// Maximum number of files to list (capped at 500)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Read from the index instead of walking the tree
        #[arg(long)]
        indexed: bool,

        /// Deepest directory level shown with --indexed
        #[arg(long, requires = "indexed")]
        depth: Option<u32>,
    },

    /// Scan one resumable slice of the tree
    Chunk {
        /// Resume token printed by the previous chunk
        #[arg(short, long)]
        resume: Option<String>,

        /// Stop after this many unmanaged files (capped at 500)
        #[arg(short, long)]
        batch: Option<usize>,

        /// Stop after this much wall-clock time (e.g. 30s, 2m)
        #[arg(short, long)]
        time_limit: Option<humantime::Duration>,
    },

    /// Rebuild the file index from scratch
    Index,

    /// Register files with the managed-file registry
    Adopt {
        /// URIs or root-relative paths to adopt
        #[arg(required_unless_present_any = ["unmanaged", "scan"])]
        uris: Vec<String>,

        /// Adopt unmanaged files recorded in the index
        #[arg(long, conflicts_with_all = ["uris", "scan"])]
        unmanaged: bool,

        /// Scan the tree and adopt orphans as they are found
        #[arg(long, conflicts_with = "uris")]
        scan: bool,

        /// Maximum number of files to adopt (capped at 500)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Remove files from the registry, leaving them on disk
    Release {
        /// URIs or root-relative paths to release
        #[arg(required = true)]
        uris: Vec<String>,
    },

    /// Show index and orphan totals
    Status {
        /// Number of oldest orphans to show
        #[arg(short = 'n', long, default_value = "10")]
        orphans: usize,
    },

    /// Show the configured ignore patterns
    Patterns,

    /// Drop orphan rows whose file is gone or now managed
    Prune,

    /// Get and set configuration options
    Config {
        /// Configuration key (section.name)
        key: Option<String>,

        /// Configuration value to set
        value: Option<String>,

        /// List all configuration values
        #[arg(short, long)]
        list: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
