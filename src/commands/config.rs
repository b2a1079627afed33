use crate::OrphanageContext;
use crate::output;
use anyhow::Result;
use colored::Colorize;

/// Execute config command to get/set configuration values
///
/// # Errors
///
/// Returns an error if:
/// - The key is unknown or the value is invalid
/// - Failed to save configuration
pub fn execute(
    ctx: &mut OrphanageContext,
    key: Option<&str>,
    value: Option<String>,
    list: bool,
) -> Result<()> {
    // If --list flag is set or no key is provided, show all configuration
    let Some(key) = key.filter(|_| !list) else {
        show_all_config(ctx);
        return Ok(());
    };

    if let Some(val) = value {
        ctx.config.set(key, val.clone())?;
        ctx.config.save(&ctx.config_path)?;
        output::success(&format!("Set {key} = {val}"));
        if key == "scan.ignore_patterns" {
            output::info("Run 'orphanage index' to re-evaluate indexed files");
        }
    } else if let Some(val) = ctx.config.get(key) {
        println!("{val}");
    } else {
        output::warning(&format!("Configuration key '{key}' is not set"));
    }

    Ok(())
}

/// Show all configuration values
fn show_all_config(ctx: &OrphanageContext) {
    let config = &ctx.config;

    println!("{}", "[core]".bold());
    println!("  scheme = {}", config.core.scheme);
    println!("  root = {}", config.core.root.display());
    println!("  state_dir = {}", config.core.state_dir.display());

    println!("\n{}", "[scan]".bold());
    let patterns = config.scan.patterns();
    if patterns.is_empty() {
        println!("  ignore_patterns =");
    } else {
        println!("  ignore_patterns = {}", patterns.join(", "));
    }
    println!("  ignore_symlinks = {}", config.scan.ignore_symlinks);
    println!("  items_per_run = {}", config.scan.items_per_run);
    println!("  verbose_logging = {}", config.scan.verbose_logging);
    println!("  directory_depth = {}", config.scan.directory_depth);
    println!("  case_sensitive = {}", config.scan.case_sensitive());
}
