use crate::OrphanageContext;
use crate::output;
use anyhow::Result;
use colored::Colorize;

/// Execute status command: index totals and the oldest recorded orphans
///
/// # Errors
///
/// Returns an error if the state tables cannot be loaded
pub fn execute(ctx: &OrphanageContext, orphans: usize) -> Result<()> {
    let engine = ctx.open_engine()?;
    let stats = engine.stats();

    println!("{} {}", "Root:".bold(), engine.scheme().root().display());
    println!("{} {}", "Scheme:".bold(), engine.scheme().prefix());
    println!();
    output::stats_table(&stats);

    if stats.total == 0 {
        output::info("Index is empty; run 'orphanage scan --full' to build it");
    }

    let oldest = engine.orphans().list_all(orphans);
    if oldest.is_empty() {
        return Ok(());
    }

    println!("\n{}", "Oldest orphans:".bold());
    for uri in oldest {
        let seen = engine
            .orphans()
            .get(&uri)
            .map(|record| output::format_timestamp(record.timestamp))
            .unwrap_or_default();
        println!("  {} {uri}", seen.dimmed());
    }
    Ok(())
}
