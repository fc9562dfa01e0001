//! Environment variable configuration
//!
//! Provides environment variable overrides for runner manifests.

use std::env;

use super::RunnerOptions;

/// Environment variable prefix
const ENV_PREFIX: &str = "BDD_RUNNER";

/// Overrides read from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Tag expression from BDD_RUNNER_TAGS
    pub tags: Option<String>,
    /// Monochrome from BDD_RUNNER_MONOCHROME
    pub monochrome: Option<bool>,
    /// Dry run from BDD_RUNNER_DRY_RUN
    pub dry_run: Option<bool>,
    /// Concurrency from BDD_RUNNER_CONCURRENCY
    pub concurrency: Option<usize>,
    /// Base URL from BDD_RUNNER_BASE_URL
    pub base_url: Option<String>,
    /// HTTP timeout from BDD_RUNNER_TIMEOUT
    pub timeout: Option<u64>,
    /// Config file from BDD_RUNNER_CONFIG
    pub config_file: Option<String>,
    /// Extra plugins from BDD_RUNNER_PLUGIN, comma separated
    pub plugins: Vec<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            tags: get_env("TAGS"),
            monochrome: get_env_bool("MONOCHROME"),
            dry_run: get_env_bool("DRY_RUN"),
            concurrency: get_env_parse("CONCURRENCY"),
            base_url: get_env("BASE_URL"),
            timeout: get_env_parse("TIMEOUT"),
            config_file: get_env("CONFIG"),
            plugins: get_env("PLUGIN")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.tags.is_some()
            || self.monochrome.is_some()
            || self.dry_run.is_some()
            || self.concurrency.is_some()
            || self.base_url.is_some()
            || self.timeout.is_some()
            || self.config_file.is_some()
            || !self.plugins.is_empty()
    }

    /// Overlay the set variables onto a runner manifest
    pub fn apply(&self, options: &mut RunnerOptions) {
        if let Some(tags) = &self.tags {
            options.tags = Some(tags.clone());
        }
        if let Some(monochrome) = self.monochrome {
            options.monochrome = monochrome;
        }
        if let Some(dry_run) = self.dry_run {
            options.dry_run = dry_run;
        }
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency;
        }
        if let Some(base_url) = &self.base_url {
            options.base_url = Some(base_url.clone());
        }
        if let Some(timeout) = self.timeout {
            options.timeout_secs = timeout;
        }
        for plugin in &self.plugins {
            if !options.plugins.contains(plugin) {
                options.plugins.push(plugin.clone());
            }
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_TAGS:        {:?}", ENV_PREFIX, self.tags);
        println!("  {}_MONOCHROME:  {:?}", ENV_PREFIX, self.monochrome);
        println!("  {}_DRY_RUN:     {:?}", ENV_PREFIX, self.dry_run);
        println!("  {}_CONCURRENCY: {:?}", ENV_PREFIX, self.concurrency);
        println!("  {}_BASE_URL:    {:?}", ENV_PREFIX, self.base_url);
        println!("  {}_TIMEOUT:     {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_CONFIG:      {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_PLUGIN:      {:?}", ENV_PREFIX, self.plugins);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables in tests
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.into()));
        self
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        for (key, value) in self.vars {
            env::set_var(key, value);
        }

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all BDD_RUNNER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_TAGS         Tag expression (e.g. \"@api and not @slow\")");
    println!("  {ENV_PREFIX}_MONOCHROME   Disable ANSI colours (true/false)");
    println!("  {ENV_PREFIX}_DRY_RUN      Match steps without executing them (true/false)");
    println!("  {ENV_PREFIX}_CONCURRENCY  Scenarios run at once");
    println!("  {ENV_PREFIX}_BASE_URL     Base URL for relative request paths");
    println!("  {ENV_PREFIX}_TIMEOUT      HTTP timeout in seconds");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!("  {ENV_PREFIX}_PLUGIN       Extra plugins, comma separated (e.g. rerun:reports/rerun.txt)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_BASE_URL=http://localhost:8080");
    println!("  export {ENV_PREFIX}_TAGS=@api");
    println!("  bdd-runner run api");
}
