use super::CommandContext;
use crate::OrphanageContext;
use crate::output;
use anyhow::Result;

/// Execute list command
///
/// Prints one URI per line on stdout. Without `indexed` the tree is walked
/// (and the orphan table updated); with it the index is read as-is.
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or a table cannot be loaded
pub fn execute(
    ctx: &OrphanageContext,
    limit: Option<usize>,
    indexed: bool,
    depth: Option<u32>,
) -> Result<()> {
    let limit = ctx.clamp_limit(limit);

    if indexed {
        let engine = ctx.open_engine()?;
        let depth = depth.unwrap_or(ctx.config.scan.directory_depth);
        let uris = engine.index().list_unmanaged_unignored(limit, Some(depth));
        if uris.is_empty() {
            output::info("No unmanaged files in the index");
        }
        for uri in uris {
            println!("{uri}");
        }
        return Ok(());
    }

    let _lock = ctx.acquire_lock("list")?;
    let mut engine = ctx.open_engine()?;
    let lists = engine.scan_with_lists(limit)?;
    for uri in &lists.to_manage {
        println!("{uri}");
    }

    output::info(&output::lists_footer(&lists));
    Ok(())
}
