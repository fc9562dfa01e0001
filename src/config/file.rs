//! Configuration file management
//!
//! Handles finding, loading, and validating runner configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::profile::builtin_runners;
use super::RunnerOptions;
use crate::glue::GlueCatalog;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./bdd-runner.yaml",
    "./bdd-runner.yml",
    "./.bdd-runner.yaml",
    "~/.config/bdd-runner/config.yaml",
];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Runner manifests; empty means the built-in `api` and `web` runners
    #[serde(default)]
    pub runners: Vec<RunnerOptions>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            runners: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load from an explicit path, else the first standard location, else defaults
    pub fn load_or_default(explicit: Option<&str>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(expand_path(path)),
            None => match Self::find() {
                Some(path) => Self::load(path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.check_version()?;
        tracing::debug!("Loaded config file {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn check_version(&self) -> Result<()> {
        if self.version != "1.0" {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }
        Ok(())
    }

    /// Validate the version and every runner manifest
    pub fn validate(&self, catalog: &GlueCatalog) -> Result<()> {
        self.check_version()?;

        let runners = self.effective_runners();
        for (i, runner) in runners.iter().enumerate() {
            if runners[..i].iter().any(|r| r.name == runner.name) {
                anyhow::bail!("Duplicate runner name: {}", runner.name);
            }
            runner
                .validate(catalog)
                .with_context(|| format!("Invalid runner '{}'", runner.name))?;
        }

        Ok(())
    }

    /// Example configuration holding the built-in runners
    pub fn example() -> Self {
        Self {
            version: default_version(),
            runners: builtin_runners(),
        }
    }

    /// Runners declared in the file, or the built-in ones
    pub fn effective_runners(&self) -> Vec<RunnerOptions> {
        if self.runners.is_empty() {
            builtin_runners()
        } else {
            self.runners.clone()
        }
    }

    /// Get runner by name
    pub fn runner(&self, name: &str) -> Option<RunnerOptions> {
        self.effective_runners().into_iter().find(|r| r.name == name)
    }

    pub fn runner_names(&self) -> Vec<String> {
        self.effective_runners().into_iter().map(|r| r.name).collect()
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
