use super::CommandContext;
use crate::OrphanageContext;
use crate::output;
use anyhow::Result;

/// Execute index command: rebuild the index from an empty table
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or the index cannot be saved
pub fn execute(ctx: &OrphanageContext) -> Result<()> {
    let _lock = ctx.acquire_lock("index")?;
    let mut engine = ctx.open_engine()?;

    let count = engine.build_index()?;
    let stats = engine.stats();
    output::success(&format!("Rebuilt index with {count} files"));
    output::stats_table(&stats);
    Ok(())
}
