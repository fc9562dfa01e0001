//! Glue: step definitions, hooks and per-scenario state
//!
//! Glue locations are dotted package names. A location selects every
//! package equal to it or nested under it, so `stepDef` pulls in
//! `stepDef.common`, `stepDef.api` and `stepDef.web`.

mod expression;
mod registry;
mod steps;
mod world;

pub use expression::snippet;
pub use registry::{Hook, StepContext, StepFuture, StepMatch, StepRegistry};
pub use world::World;

#[cfg(test)]
pub(crate) use world::test_world;

use tracing::{debug, warn};

use crate::error::{RunnerError, RunnerResult};

/// Registration function contributed by a glue package
pub type GlueFn = fn(&mut StepRegistry) -> RunnerResult<()>;

/// A named glue package
#[derive(Clone)]
pub struct GluePackage {
    pub name: String,
    pub description: String,
    register: GlueFn,
}

/// Every glue package known to the binary
#[derive(Clone, Default)]
pub struct GlueCatalog {
    packages: Vec<GluePackage>,
}

impl GlueCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in `stepDef` packages
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.add(
            "stepDef.common",
            "Scenario variables and value comparison",
            steps::register_common,
        );
        catalog.add(
            "stepDef.api",
            "HTTP requests and response assertions",
            steps::register_api,
        );
        catalog.add(
            "stepDef.web",
            "Page fetching and page content assertions",
            steps::register_web,
        );
        catalog
    }

    pub fn add(&mut self, name: &str, description: &str, register: GlueFn) -> &mut Self {
        self.packages.push(GluePackage {
            name: name.to_string(),
            description: description.to_string(),
            register,
        });
        self
    }

    pub fn packages(&self) -> &[GluePackage] {
        &self.packages
    }

    /// Packages selected by a glue location
    pub fn resolve(&self, location: &str) -> Vec<&GluePackage> {
        let location = location.trim().trim_end_matches('.');
        let prefix = format!("{location}.");
        self.packages
            .iter()
            .filter(|p| p.name == location || p.name.starts_with(&prefix))
            .collect()
    }

    /// Check that every location selects at least one package
    pub fn validate(&self, locations: &[String]) -> RunnerResult<()> {
        for location in locations {
            if self.resolve(location).is_empty() {
                return Err(RunnerError::config(format!(
                    "Glue location does not exist: {location}"
                )));
            }
        }
        Ok(())
    }

    /// Build a registry from the given glue locations.
    ///
    /// A package selected by several locations is registered once.
    pub fn build_registry(&self, locations: &[String]) -> RunnerResult<StepRegistry> {
        self.validate(locations)?;

        let mut registry = StepRegistry::new();
        let mut loaded: Vec<&str> = Vec::new();

        for location in locations {
            for package in self.resolve(location) {
                if loaded.contains(&package.name.as_str()) {
                    continue;
                }
                registry.set_location(&package.name);
                (package.register)(&mut registry)?;
                loaded.push(&package.name);
            }
        }

        debug!(
            "Loaded {} step definition(s) from {:?}",
            registry.len(),
            loaded
        );
        if registry.is_empty() {
            warn!("No step definitions found for glue {:?}", locations);
        }
        Ok(registry)
    }
}
