use super::CommandContext;
use crate::OrphanageContext;
use crate::output;
use anyhow::Result;

/// Execute prune command
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or the orphan table cannot be
/// saved
pub fn execute(ctx: &OrphanageContext) -> Result<()> {
    let _lock = ctx.acquire_lock("prune")?;
    let mut engine = ctx.open_engine()?;

    match engine.prune_stale_orphans()? {
        0 => output::info("No stale orphans"),
        removed => output::success(&format!("Removed {removed} stale orphans")),
    }
    Ok(())
}
