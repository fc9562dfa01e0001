//! bdd-runner - Cucumber-style BDD scenario runner
//!
//! Discovers Gherkin feature files, filters scenarios by tag expression,
//! executes their steps against registered glue and writes console, HTML,
//! JSON and rerun reports.
//!
//! ## Runners
//!
//! Two runners are built in:
//!
//! - `api`: `@api` scenarios under `src/test/resources/apiFeatures`,
//!   reports in `reports/cucumber-api.{html,json}`
//! - `web`: `@web` scenarios under `src/test/resources/webFeatures`,
//!   reports in `reports/cucumber-web.{html,json}`
//!
//! ## Usage
//!
//! ```bash
//! # Run both runners
//! bdd-runner run
//!
//! # Run the API runner against a local service
//! bdd-runner run api --base-url http://localhost:8080
//!
//! # Only smoke scenarios, with a rerun file for failures
//! bdd-runner run web --tags "@web and @smoke" --plugin rerun:reports/rerun.txt
//!
//! # Show what would run
//! bdd-runner list api --detailed
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

mod cli;
mod config;
mod error;
mod executor;
mod features;
mod glue;
mod http;
mod models;
mod output;
mod utils;

use cli::{Args, Overrides};
use config::{ConfigFile, EnvConfig, RunnerOptions};
use executor::{Runner, RunnerOutcome, Suite};
use glue::GlueCatalog;
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let level = match args.log_level.as_deref() {
        Some(name) => name.parse::<LogLevel>().map_err(anyhow::Error::msg)?,
        None => LogLevel::from_verbose(args.verbose),
    };
    init_logger(level);

    let config_path = args.config.clone();
    match args.command {
        cli::Command::Run(run_args) => run_runners(config_path, run_args).await,
        cli::Command::List(list_args) => {
            list_scenarios(config_path, list_args)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Steps(steps_args) => {
            list_steps(steps_args)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Config(config_args) => manage_config(config_path, config_args),
    }
}

/// Runner manifests after file, environment and command-line layering
fn resolve_runners(
    config_path: Option<String>,
    names: &[String],
    overrides: &Overrides,
) -> Result<Vec<RunnerOptions>> {
    let env = EnvConfig::load();
    let explicit = config_path.or_else(|| env.config_file.clone());
    let config = ConfigFile::load_or_default(explicit.as_deref())?;
    let available = config.effective_runners();
    if env.has_any() {
        debug!("Applying BDD_RUNNER_* environment overrides");
    }

    let selected: Vec<RunnerOptions> = if names.is_empty() || names.iter().any(|n| n == "all") {
        available
    } else {
        names
            .iter()
            .map(|name| {
                config.runner(name).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Unknown runner: {}. Available: {}",
                        name,
                        config.runner_names().join(", ")
                    )
                })
            })
            .collect::<Result<_>>()?
    };

    Ok(selected
        .into_iter()
        .map(|mut options| {
            env.apply(&mut options);
            overrides.apply(&mut options);
            debug!("Effective options for '{}': {:?}", options.name, options);
            options
        })
        .collect())
}

async fn run_runners(config_path: Option<String>, args: cli::RunArgs) -> Result<ExitCode> {
    let runners = resolve_runners(config_path, &args.runners, &args.overrides)?;

    let suite = runners
        .into_iter()
        .fold(Suite::new(), |suite, options| suite.add_runner(Runner::new(options)));
    let several = suite.len() > 1;
    let outcomes = suite.run_all().await;

    let mut success = true;
    if several {
        eprintln!();
    }
    for outcome in &outcomes {
        let name = outcome.runner();
        match outcome {
            RunnerOutcome::Completed(report) => {
                let status = if report.is_success() { "✓" } else { "✗" };
                if several {
                    eprintln!("{} {:<10} {}", status, name, report.scenario_counts());
                }
            }
            RunnerOutcome::Aborted { error, .. } => {
                eprintln!("✗ {name:<10} Error: {error}");
            }
        }
        success &= outcome.is_success();
    }

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_scenarios(config_path: Option<String>, args: cli::ListArgs) -> Result<()> {
    let names: Vec<String> = args.runner.into_iter().collect();
    let runners = resolve_runners(config_path, &names, &args.overrides)?;

    for options in runners {
        let runner = Runner::new(options);
        let pickles = runner
            .discover()
            .with_context(|| format!("Cannot list runner '{}'", runner.name()))?;

        println!(
            "\nRunner '{}' ({} scenarios, tags: {})",
            runner.name(),
            pickles.len(),
            runner.options().tags.as_deref().unwrap_or("<none>")
        );
        println!("{:-<70}", "");

        for pickle in &pickles {
            println!(
                "  {:40} {} {}",
                pickle.location(),
                pickle.name,
                pickle.display_tags().join(" ")
            );
            if args.detailed {
                for step in &pickle.steps {
                    println!("      {step}");
                }
            }
        }
    }
    println!();

    Ok(())
}

fn list_steps(args: cli::StepsArgs) -> Result<()> {
    let catalog = GlueCatalog::builtin();
    let packages = match &args.glue {
        Some(location) => {
            let found = catalog.resolve(location);
            if found.is_empty() {
                anyhow::bail!("Glue location does not exist: {location}");
            }
            found
        }
        None => catalog.packages().iter().collect(),
    };

    for package in packages {
        let registry = catalog.build_registry(std::slice::from_ref(&package.name))?;
        println!("\n{} - {}", package.name, package.description);
        println!("{:-<70}", "");
        for definition in registry.definitions() {
            println!("  {}", definition.expression.source());
        }
    }
    println!();

    Ok(())
}

fn manage_config(config_path: Option<String>, args: cli::ConfigArgs) -> Result<ExitCode> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to customize your runners.");
        }

        cli::ConfigAction::Show { json } => {
            let runners = resolve_runners(config_path, &[], &Overrides::default())?;
            let config = ConfigFile {
                runners,
                ..ConfigFile::default()
            };
            let output = if json {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Validate { path } => {
            let path = match path.or(config_path) {
                Some(path) => path,
                None => match ConfigFile::find() {
                    Some(found) => found.to_string_lossy().to_string(),
                    None => {
                        println!("No configuration file found; built-in runners are used.");
                        return Ok(ExitCode::SUCCESS);
                    }
                },
            };

            let result = ConfigFile::load(&path)
                .and_then(|config| config.validate(&GlueCatalog::builtin()));
            match result {
                Ok(()) => println!("✓ Configuration file is valid: {path}"),
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e:#}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        cli::ConfigAction::Env => {
            config::print_env_help();
            println!();
            EnvConfig::load().print_summary();
        }
    }

    Ok(ExitCode::SUCCESS)
}
