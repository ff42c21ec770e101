use anyhow::{Context, Result};
use compaction::PlannerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("compactor"))
}

// ============================================================================
// Main Config Schema
// ============================================================================

/// The compactor configuration file
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompactorConfig {
    /// Thresholds, sampling budget and savings model
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Directories that are never entered
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Per-file eligibility rules
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Directory names excluded wherever they appear (case-insensitive)
    pub exclude_names: Vec<String>,
    /// Absolute directories excluded with everything below them
    pub exclude_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Extensions skipped in addition to the built-in list, without the dot
    pub skip_extensions: Vec<String>,
    /// Files smaller than this are never worth compressing
    pub min_file_size: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            skip_extensions: Vec::new(),
            min_file_size: 4096,
        }
    }
}

impl CompactorConfig {
    /// Load from `path`, or from ~/.config/compactor/config.toml
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = config_dir()?.join("config.toml");
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read config file: {}", config_path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format in compactor config")
    }
}
