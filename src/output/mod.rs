//! Terminal output for the orphanage CLI.
//!
//! stdout carries only what scripts consume: URIs, the status table and
//! pattern listings. Everything else goes to stderr. [`Verbosity::Quiet`]
//! drops the routine messages but never warnings, errors or a resume token.
//!
//! Logging through `tracing` is separate; see [`init_logging`].

mod logging;

use crate::engine::{AdoptionSummary, IndexStats, ScanCounts, ScanLists};
use colored::{ColoredString, Colorize};
use std::sync::atomic::{AtomicU8, Ordering};

pub use logging::{init_logging, log_filter};

/// How much the CLI prints besides its primary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings, errors and resume tokens only
    Quiet = 0,
    /// Progress and summary messages as well
    Normal = 1,
}

static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Normal as u8);

/// Sets the process-wide verbosity.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Current process-wide verbosity.
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        _ => Verbosity::Normal,
    }
}

fn is_quiet() -> bool {
    get_verbosity() == Verbosity::Quiet
}

/// Green message on stderr.
pub fn success(message: &str) {
    if !is_quiet() {
        eprintln!("{}", message.green());
    }
}

/// Bold red message on stderr, shown even when quiet.
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Bold yellow message on stderr, shown even when quiet.
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Dimmed message on stderr.
pub fn info(message: &str) {
    if !is_quiet() {
        eprintln!("{}", message.dimmed());
    }
}

/// `verb subject` line for a per-file action, e.g. `released public://a.txt`.
pub fn action(verb: &str, subject: &str) {
    if !is_quiet() {
        eprintln!("{} {subject}", verb.dimmed().bold());
    }
}

/// Token to pass to the next `chunk --resume`. Always printed.
pub fn resume_token(token: &str) {
    eprintln!("{} {token}", "resume:".dimmed());
}

/// Reports a batch adoption: every failure, then the totals.
pub fn adoption_summary(summary: &AdoptionSummary) {
    for (uri, reason) in &summary.failures {
        error(&format!("{uri}: {reason}"));
    }
    success(&adoption_headline(summary));
    if summary.skipped > 0 {
        info(&format!("{} already managed or ignored", summary.skipped));
    }
}

/// One-line total of a batch adoption.
#[must_use]
pub fn adoption_headline(summary: &AdoptionSummary) -> String {
    format!("Adopted {} of {} files", summary.adopted, summary.attempted)
}

/// One-line total of an orphan scan; `adopting` selects the adoption wording.
#[must_use]
pub fn counts_headline(counts: &ScanCounts, adopting: bool) -> String {
    if adopting {
        format!(
            "Adopted {} of {} orphans ({} files scanned)",
            counts.adopted, counts.orphans, counts.files
        )
    } else {
        format!("Scanned {} files, {} orphans recorded", counts.files, counts.orphans)
    }
}

/// Footer under a capped orphan listing.
#[must_use]
pub fn lists_footer(lists: &ScanLists) -> String {
    format!(
        "{} of {} orphans shown ({} files scanned)",
        lists.to_manage.len(),
        lists.orphans,
        lists.files
    )
}

/// Label and count for each row of the status table, in display order.
#[must_use]
pub fn stats_rows(stats: &IndexStats) -> [(&'static str, usize); 5] {
    [
        ("indexed", stats.total),
        ("managed", stats.managed),
        ("ignored", stats.ignored),
        ("unmanaged", stats.unmanaged),
        ("orphans", stats.orphans),
    ]
}

/// Prints the index totals as an aligned table on stdout.
pub fn stats_table(stats: &IndexStats) {
    for (label, count) in stats_rows(stats) {
        let count = count.to_string();
        let styled: ColoredString = match label {
            "managed" => count.green(),
            "ignored" => count.dimmed(),
            "unmanaged" | "orphans" => count.yellow(),
            _ => count.normal(),
        };
        println!("  {label:<10} {styled}");
    }
}

/// Prints an ignore pattern with a validity marker on stdout.
pub fn pattern_status(pattern: &str, valid: bool) {
    if valid {
        println!("{} {pattern}", "✓".green().bold());
    } else {
        println!("{} {pattern} {}", "✗".red().bold(), "(invalid, never matches)".dimmed());
    }
}

/// UTC `YYYY-MM-DD HH:MM` rendering of a unix timestamp, empty when out of
/// range.
#[must_use]
pub fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
