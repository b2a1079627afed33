//! CLI command implementations.
//!
//! Each command opens its own engine, so every invocation loads a fresh
//! registry snapshot. Commands that write state hold the
//! [`crate::lock::ScanLock`] for their whole run.

pub mod adopt;
pub mod chunk;
pub mod config;
pub mod context;
pub mod index;
pub mod list;
pub mod patterns;
pub mod prune;
pub mod scan;
pub mod status;

pub use context::CommandContext;
