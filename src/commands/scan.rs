use super::CommandContext;
use crate::OrphanageContext;
use crate::output;
use anyhow::Result;

/// Execute scan command
///
/// A plain scan records orphans; `full` refreshes the index instead.
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or the scan fails to persist
pub fn execute(ctx: &OrphanageContext, full: bool) -> Result<()> {
    let _lock = ctx.acquire_lock("scan")?;
    let mut engine = ctx.open_engine()?;

    if full {
        let report = engine.scan_public_files()?;
        output::success(&format!("Indexed {} files", report.files));
        if report.removed > 0 {
            output::info(&format!("Removed {} rows of deleted files", report.removed));
        }
    } else {
        let counts = engine.record_orphans(ctx.clamp_limit(None))?;
        output::success(&output::counts_headline(&counts, false));
    }

    Ok(())
}
