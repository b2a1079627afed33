use super::Config;
use crate::MAX_ITEMS_PER_RUN;
use crate::scanner::ignore::validate_patterns;
use anyhow::{Context, Result};
use std::path::Path;

/// Reads, parses and validates a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or holds
/// invalid values
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
}

/// Parses and validates configuration text.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML or holds invalid values
pub fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse TOML config")?;

    // Validate and return validation errors directly without wrapping
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    if config.core.scheme.is_empty() || config.core.scheme.contains(['/', ':']) {
        anyhow::bail!("Invalid scheme name: '{}'", config.core.scheme);
    }

    if config.scan.items_per_run == 0 || config.scan.items_per_run > MAX_ITEMS_PER_RUN {
        anyhow::bail!("Items per run must be between 1 and {MAX_ITEMS_PER_RUN}");
    }

    validate_patterns(&config.scan.ignore_patterns)?;

    Ok(())
}
