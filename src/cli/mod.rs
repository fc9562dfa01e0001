//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::config::RunnerOptions;

/// Cucumber-style BDD scenario runner
#[derive(Parser, Debug)]
#[command(name = "bdd-runner")]
#[command(author = "hephaex@gmail.com")]
#[command(version = "0.1.0")]
#[command(about = "Run Gherkin feature files against registered step definitions")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one or more runners (default: api and web)
    Run(RunArgs),

    /// List the scenarios a runner would execute
    List(ListArgs),

    /// List registered step definitions per glue location
    Steps(StepsArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Runner names; `all` selects every configured runner
    pub runners: Vec<String>,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Per-invocation overrides applied on top of config and environment
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct Overrides {
    /// Tag expression replacing the runner's own (e.g. "@api and not @slow")
    #[arg(short, long)]
    pub tags: Option<String>,

    /// Only run scenarios whose name matches this regex (repeatable)
    #[arg(short, long = "name")]
    pub names: Vec<String>,

    /// Additional plugin, name[:destination] (repeatable)
    #[arg(short, long = "plugin")]
    pub plugins: Vec<String>,

    /// Feature roots replacing the runner's own, optionally path:LINE (repeatable)
    #[arg(short, long = "features")]
    pub features: Vec<String>,

    /// Glue locations replacing the runner's own (repeatable)
    #[arg(short, long = "glue")]
    pub glue: Vec<String>,

    /// Match steps without executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Disable ANSI colours
    #[arg(short, long)]
    pub monochrome: bool,

    /// Scenarios run at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Base URL for relative request paths
    #[arg(long)]
    pub base_url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Overrides {
    /// Apply command-line values; they win over file and environment
    pub fn apply(&self, options: &mut RunnerOptions) {
        if let Some(tags) = &self.tags {
            options.tags = Some(tags.clone());
        }
        if !self.names.is_empty() {
            options.names = self.names.clone();
        }
        for plugin in &self.plugins {
            if !options.plugins.contains(plugin) {
                options.plugins.push(plugin.clone());
            }
        }
        if !self.features.is_empty() {
            options.features = self.features.clone();
        }
        if !self.glue.is_empty() {
            options.glue = self.glue.clone();
        }
        if self.dry_run {
            options.dry_run = true;
        }
        if self.monochrome {
            options.monochrome = true;
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
    }
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Runner to list (default: every configured runner)
    pub runner: Option<String>,

    /// Show steps of every scenario
    #[arg(short, long)]
    pub detailed: bool,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Arguments for steps command
#[derive(Parser, Debug)]
pub struct StepsArgs {
    /// Glue location to inspect (default: every built-in location)
    pub glue: Option<String>,
}

/// Arguments for config management
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "bdd-runner.yaml")]
        output: String,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective runner configuration
    Show {
        /// Output as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (default: discovered configuration)
        path: Option<String>,
    },

    /// Show supported environment variables and their current values
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_overrides() {
        let args = Args::parse_from([
            "bdd-runner",
            "run",
            "api",
            "web",
            "--tags",
            "@smoke",
            "--plugin",
            "rerun:reports/rerun.txt",
            "--name",
            "^Login",
            "--dry-run",
            "--concurrency",
            "4",
        ]);
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };
        assert_eq!(run.runners, vec!["api", "web"]);
        assert_eq!(run.overrides.tags.as_deref(), Some("@smoke"));
        assert_eq!(run.overrides.plugins, vec!["rerun:reports/rerun.txt"]);
        assert_eq!(run.overrides.concurrency, Some(4));
        assert!(run.overrides.dry_run);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["bdd-runner", "list", "web", "-v", "--config", "x.yaml"]);
        assert!(args.verbose);
        assert_eq!(args.config.as_deref(), Some("x.yaml"));
        assert!(matches!(args.command, Command::List(ListArgs { runner: Some(ref r), .. }) if r == "web"));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            tags: Some("@web and @smoke".to_string()),
            features: vec!["other/features".to_string()],
            plugins: vec!["pretty".to_string(), "progress".to_string()],
            monochrome: true,
            concurrency: Some(3),
            ..Default::default()
        };
        let mut opts = RunnerOptions::new("web")
            .with_features("src/test/resources/webFeatures")
            .with_plugin("pretty")
            .with_tags("@web");
        overrides.apply(&mut opts);

        assert_eq!(opts.tags.as_deref(), Some("@web and @smoke"));
        assert_eq!(opts.features, vec!["other/features".to_string()]);
        assert_eq!(opts.plugins, vec!["pretty".to_string(), "progress".to_string()]);
        assert!(opts.monochrome);
        assert_eq!(opts.concurrency, 3);
    }

    #[test]
    fn test_config_subcommands() {
        let args = Args::parse_from(["bdd-runner", "config", "init", "--force"]);
        let Command::Config(cfg) = args.command else {
            panic!("expected config command");
        };
        assert!(matches!(cfg.action, ConfigAction::Init { force: true, .. }));
    }
}
