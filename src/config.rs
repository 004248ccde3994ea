//! Project file loading - YAML description of the pool and its projects

use crate::core::Task;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the file's pool capacity
pub const CAPACITY_ENV: &str = "MAKESPAN_CAPACITY";

/// Files tried, in order, by [`Config::auto_load`]
pub const DEFAULT_PATHS: [&str; 2] = ["makespan.yml", ".makespan/projects.yml"];

/// Top-level project file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Total units in the shared resource pool
    pub capacity: u64,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: Option<String>,
    /// Default deadline for `check`, in any form `parse_deadline` accepts
    pub deadline: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Config {
    /// Load config from YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Auto-detect and load the project file from the current directory
    pub fn auto_load() -> Result<Self> {
        for candidate in DEFAULT_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                log::info!("Using project file {}", path.display());
                return Self::from_file(path);
            }
        }

        anyhow::bail!(
            "No project file found. Expected {} in current directory.",
            DEFAULT_PATHS.join(" or ")
        )
    }

    /// Apply capacity overrides: `flag` wins, otherwise the `env` value
    ///
    /// The environment value is not parsed at all when a flag is given.
    pub fn apply_overrides(&mut self, flag: Option<u64>, env: Option<&str>) -> Result<()> {
        match flag {
            Some(capacity) => {
                log::info!("Capacity overridden: {} -> {}", self.capacity, capacity);
                self.capacity = capacity;
                Ok(())
            }
            None => self.apply_capacity_override(env),
        }
    }

    /// Replace the capacity with `value` when it is set
    pub fn apply_capacity_override(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(raw) = value {
            let capacity = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{}={:?} is not a unit count", CAPACITY_ENV, raw))?;
            log::info!("Capacity overridden: {} -> {}", self.capacity, capacity);
            self.capacity = capacity;
        }
        Ok(())
    }
}
