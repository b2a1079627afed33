pub mod parser;

use crate::MAX_ITEMS_PER_RUN;
use crate::scanner::ignore::{parse_patterns, platform_case_sensitive, validate_patterns};
use crate::uri::Scheme;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// URI scheme the root is exposed under (`public` gives `public://...`)
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Directory reconciled against the registry
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Directory holding the index, orphan and registry tables
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Newline or comma separated glob patterns, relative to the root
    #[serde(default)]
    pub ignore_patterns: String,
    #[serde(default)]
    pub ignore_symlinks: bool,
    /// Default number of files listed or adopted per run
    #[serde(default = "default_items_per_run")]
    pub items_per_run: usize,
    #[serde(default)]
    pub verbose_logging: bool,
    /// How many directory levels listings show; does not affect scanning
    #[serde(default = "default_directory_depth")]
    pub directory_depth: u32,
    /// Overrides the platform default for pattern case sensitivity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            root: default_root(),
            state_dir: default_state_dir(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: String::new(),
            ignore_symlinks: false,
            items_per_run: default_items_per_run(),
            verbose_logging: false,
            directory_depth: default_directory_depth(),
            case_sensitive: None,
        }
    }
}

impl ScanConfig {
    /// Parsed ignore patterns in configuration order.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        parse_patterns(&self.ignore_patterns)
    }

    /// Effective case sensitivity for pattern matching.
    #[must_use]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive.unwrap_or_else(platform_case_sensitive)
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot read or parse the configuration file
    /// - Configuration file contains invalid TOML or invalid values
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            // Create default config if it doesn't exist
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        parser::parse_config_file(path)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot write to the file
    /// - TOML serialization fails
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(toml_str.as_bytes())?;
        Ok(())
    }

    /// The configured scheme rooted at the configured directory.
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        Scheme::new(self.core.scheme.clone(), self.core.root.clone())
    }

    /// Get a configuration value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let (section, name) = key.split_once('.')?;

        match (section, name) {
            ("core", "scheme") => Some(self.core.scheme.clone()),
            ("core", "root") => Some(self.core.root.display().to_string()),
            ("core", "state_dir") => Some(self.core.state_dir.display().to_string()),
            ("scan", "ignore_patterns") => Some(self.scan.ignore_patterns.clone()),
            ("scan", "ignore_symlinks") => Some(self.scan.ignore_symlinks.to_string()),
            ("scan", "items_per_run") => Some(self.scan.items_per_run.to_string()),
            ("scan", "verbose_logging") => Some(self.scan.verbose_logging.to_string()),
            ("scan", "directory_depth") => Some(self.scan.directory_depth.to_string()),
            ("scan", "case_sensitive") => Some(self.scan.case_sensitive().to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key
    ///
    /// Ignore patterns are compiled before they are accepted, so an invalid
    /// pattern never reaches the saved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key format is invalid (must be section.key)
    /// - The key is unknown
    /// - The value is invalid for the key
    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        let Some((section, name)) = key.split_once('.') else {
            return Err(anyhow::anyhow!("Invalid configuration key: {key}"));
        };

        match (section, name) {
            ("core", "scheme") => {
                if value.is_empty() || value.contains(':') || value.contains('/') {
                    return Err(anyhow::anyhow!("Invalid scheme name: {value}"));
                }
                self.core.scheme = value;
            }
            ("core", "root") => self.core.root = crate::utils::expand_tilde(&value)?,
            ("core", "state_dir") => self.core.state_dir = crate::utils::expand_tilde(&value)?,
            ("scan", "ignore_patterns") => {
                validate_patterns(&value)?;
                self.scan.ignore_patterns = value;
            }
            ("scan", "ignore_symlinks") => {
                self.scan.ignore_symlinks = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {value}"))?;
            }
            ("scan", "items_per_run") => {
                let items: usize = value
                    .parse()
                    .with_context(|| format!("Invalid number: {value}"))?;
                if !(1..=MAX_ITEMS_PER_RUN).contains(&items) {
                    return Err(anyhow::anyhow!(
                        "Items per run must be between 1 and {MAX_ITEMS_PER_RUN}"
                    ));
                }
                self.scan.items_per_run = items;
            }
            ("scan", "verbose_logging") => {
                self.scan.verbose_logging = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {value}"))?;
            }
            ("scan", "directory_depth") => {
                self.scan.directory_depth = value
                    .parse()
                    .with_context(|| format!("Invalid number: {value}"))?;
            }
            ("scan", "case_sensitive") => {
                self.scan.case_sensitive = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid boolean: {value}"))?,
                );
            }
            _ => return Err(anyhow::anyhow!("Unknown configuration key: {key}")),
        }
        Ok(())
    }
}

// Default functions for serde
fn default_scheme() -> String {
    "public".to_string()
}

fn default_root() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    home.join("files")
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("orphanage")
}

const fn default_items_per_run() -> usize {
    20
}

const fn default_directory_depth() -> u32 {
    2
}
