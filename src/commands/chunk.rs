use super::CommandContext;
use crate::OrphanageContext;
use crate::output;
use anyhow::Result;

/// Execute chunk command
///
/// Unmanaged URIs go to stdout. The resume token always goes to stderr, even
/// in quiet mode, since scripts need it to continue.
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or the orphan table cannot be
/// saved
pub fn execute(
    ctx: &OrphanageContext,
    resume: Option<&str>,
    batch: Option<usize>,
    time_limit: Option<humantime::Duration>,
) -> Result<()> {
    let _lock = ctx.acquire_lock("chunk")?;
    let mut engine = ctx.open_engine()?;

    let chunk = engine.scan_chunk(
        resume.unwrap_or_default(),
        ctx.clamp_limit(batch),
        time_limit.map(Into::into),
    )?;
    for uri in &chunk.to_manage {
        println!("{uri}");
    }

    if chunk.is_complete() {
        output::success(&format!(
            "Scan complete ({} files in this chunk)",
            chunk.files
        ));
    } else {
        output::resume_token(&chunk.resume);
    }
    Ok(())
}
