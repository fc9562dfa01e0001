//! Configuration module
//!
//! Runner manifests, the configuration file that holds them, built-in
//! profiles and environment overrides.

mod env;
mod file;
mod profile;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;
#[cfg(test)]
pub(crate) use profile::RunnerProfile;

use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};
use crate::features::ScenarioFilter;
use crate::glue::GlueCatalog;
use crate::output::PluginSpec;

/// Declarative manifest for one named test run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunnerOptions {
    /// Runner name (`api`, `web`, ...)
    pub name: String,

    /// Glue locations searched for step definitions
    #[serde(default)]
    pub glue: Vec<String>,

    /// Feature roots, optionally suffixed with `:LINE`
    #[serde(default)]
    pub features: Vec<String>,

    /// Report emitters, `name[:destination]`
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Tag expression selecting scenarios
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    /// Scenario name patterns; any match retains the scenario
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    /// Suppress ANSI colours in console output
    #[serde(default)]
    pub monochrome: bool,

    /// Match steps without executing them
    #[serde(default)]
    pub dry_run: bool,

    /// Scenarios in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Base URL for relative request paths in glue steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// HTTP timeout for glue steps in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_concurrency() -> usize {
    1
}

fn default_timeout() -> u64 {
    30
}

impl RunnerOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            glue: Vec::new(),
            features: Vec::new(),
            plugins: Vec::new(),
            tags: None,
            names: Vec::new(),
            monochrome: false,
            dry_run: false,
            concurrency: default_concurrency(),
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_glue(mut self, glue: impl Into<String>) -> Self {
        self.glue.push(glue.into());
        self
    }

    pub fn with_features(mut self, root: impl Into<String>) -> Self {
        self.features.push(root.into());
        self
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugins.push(plugin.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn monochrome(mut self, monochrome: bool) -> Self {
        self.monochrome = monochrome;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Parsed plugin specifications
    pub fn plugin_specs(&self) -> RunnerResult<Vec<PluginSpec>> {
        self.plugins.iter().map(|p| p.parse()).collect()
    }

    /// Scenario filter built from tags and names
    pub fn filter(&self) -> RunnerResult<ScenarioFilter> {
        ScenarioFilter::new(self.tags.as_deref(), &self.names)
    }

    /// Validate everything that can be checked before discovery.
    ///
    /// Feature roots are checked by discovery itself so the error names the
    /// exact missing path.
    pub fn validate(&self, catalog: &GlueCatalog) -> RunnerResult<()> {
        if self.name.trim().is_empty() {
            return Err(RunnerError::config("Runner name must not be empty"));
        }
        if self.features.is_empty() {
            return Err(RunnerError::config(format!(
                "Runner '{}' has no feature roots",
                self.name
            )));
        }
        if self.concurrency == 0 {
            return Err(RunnerError::config(format!(
                "Runner '{}' concurrency must be at least 1",
                self.name
            )));
        }
        catalog.validate(&self.glue)?;
        self.plugin_specs()?;
        self.filter()?;
        Ok(())
    }
}
