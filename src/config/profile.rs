//! Built-in runner profiles
//!
//! The `api` and `web` runners used when no configuration file defines
//! its own runners.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::RunnerOptions;

/// Glue location shared by both built-in runners
pub const DEFAULT_GLUE: &str = "stepDef";

/// Predefined runner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerProfile {
    Api,
    Web,
}

impl RunnerProfile {
    pub fn name(&self) -> &'static str {
        match self {
            RunnerProfile::Api => "api",
            RunnerProfile::Web => "web",
        }
    }

    pub fn all() -> Vec<RunnerProfile> {
        vec![RunnerProfile::Api, RunnerProfile::Web]
    }

    /// Directory holding this runner's feature files
    pub fn feature_root(&self) -> &'static str {
        match self {
            RunnerProfile::Api => "src/test/resources/apiFeatures",
            RunnerProfile::Web => "src/test/resources/webFeatures",
        }
    }

    /// Tag expression selecting this runner's scenarios
    pub fn tag(&self) -> &'static str {
        match self {
            RunnerProfile::Api => "@api",
            RunnerProfile::Web => "@web",
        }
    }

    /// Report base path without extension
    pub fn report_stem(&self) -> String {
        format!("reports/cucumber-{}", self.name())
    }

    pub fn options(&self) -> RunnerOptions {
        let stem = self.report_stem();
        RunnerOptions::new(self.name())
            .with_glue(DEFAULT_GLUE)
            .with_features(self.feature_root())
            .with_plugin("pretty")
            .with_plugin(format!("html:{stem}.html"))
            .with_plugin(format!("json:{stem}.json"))
            .with_tags(self.tag())
            .monochrome(true)
    }
}

impl fmt::Display for RunnerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for every built-in runner
pub fn builtin_runners() -> Vec<RunnerOptions> {
    RunnerProfile::all().iter().map(|p| p.options()).collect()
}
