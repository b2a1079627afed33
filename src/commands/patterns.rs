use crate::OrphanageContext;
use crate::output;
use anyhow::Result;

/// Execute patterns command: print each ignore pattern with its status
///
/// # Errors
///
/// Returns an error if the state tables cannot be loaded
pub fn execute(ctx: &OrphanageContext) -> Result<()> {
    let engine = ctx.open_engine()?;
    if engine.get_ignore_patterns().is_empty() {
        output::info("No ignore patterns configured");
        return Ok(());
    }

    for (pattern, valid) in engine.matcher().pattern_status() {
        output::pattern_status(pattern, valid);
    }
    Ok(())
}
