use super::CommandContext;
use crate::engine::AdoptionSummary;
use crate::hooks::HookEffect;
use crate::{MAX_ITEMS_PER_RUN, OrphanageContext};
use crate::output;
use anyhow::{Result, bail};

/// Where `adopt` takes its files from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptSource {
    /// The URIs given on the command line
    Explicit,
    /// Unmanaged, unignored rows of the index
    Index,
    /// Orphans found by walking the tree
    Scan,
}

/// Execute adopt command
///
/// # Errors
///
/// Returns an error if the lock cannot be taken, a table cannot be saved, or
/// any file failed to adopt
pub fn execute(
    ctx: &OrphanageContext,
    uris: &[String],
    source: AdoptSource,
    limit: Option<usize>,
) -> Result<()> {
    let _lock = ctx.acquire_lock("adopt")?;
    let mut engine = ctx.open_engine()?;

    let summary = match source {
        AdoptSource::Scan => {
            let counts = engine.scan_and_process(true, ctx.clamp_limit(limit))?;
            output::success(&output::counts_headline(&counts, true));
            return Ok(());
        }
        AdoptSource::Index => engine.adopt_unmanaged(ctx.clamp_limit(limit))?,
        AdoptSource::Explicit => {
            let limit = ctx.clamp_limit(Some(limit.unwrap_or(MAX_ITEMS_PER_RUN)));
            if uris.len() > limit {
                output::warning(&format!(
                    "Only the first {limit} of {} files will be adopted",
                    uris.len()
                ));
            }
            let resolved: Vec<String> = uris
                .iter()
                .take(limit)
                .map(|arg| ctx.resolve_uri(arg))
                .collect();
            engine.adopt_files(&resolved)?
        }
    };

    report(&summary)
}

/// Execute release command: drop registry entries, keeping the files
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or the registry or index
/// cannot be saved
pub fn execute_release(ctx: &OrphanageContext, uris: &[String]) -> Result<()> {
    let _lock = ctx.acquire_lock("release")?;
    let mut engine = ctx.open_engine()?;

    for arg in uris {
        let uri = ctx.resolve_uri(arg);
        match engine.release_file(&uri)? {
            Some(HookEffect::Removed) => output::action("released", &format!("{uri} (file is gone)")),
            Some(_) => output::action("released", &uri),
            None => output::warning(&format!("{uri} is not managed")),
        }
    }
    Ok(())
}

/// Prints the summary and fails when any file failed
fn report(summary: &AdoptionSummary) -> Result<()> {
    output::adoption_summary(summary);
    if !summary.failures.is_empty() {
        bail!("{} files could not be adopted", summary.failures.len());
    }
    Ok(())
}
