//! Runner execution
//!
//! Turns a `RunnerOptions` manifest into a `RunReport`: discover features,
//! filter scenarios, execute them against the configured glue and stream
//! results to the report plugins.

use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::parallel::run_ordered;
use super::scenario::ScenarioExecutor;
use crate::config::RunnerOptions;
use crate::error::{RunnerError, RunnerResult};
use crate::features::load_pickles;
use crate::glue::GlueCatalog;
use crate::http::HttpClient;
use crate::models::{Pickle, RunReport};
use crate::output::Reporter;
use crate::utils::timer::Timer;

/// Executes one runner manifest
pub struct Runner {
    options: RunnerOptions,
    catalog: GlueCatalog,
}

impl Runner {
    /// Runner using the built-in glue catalog
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            options,
            catalog: GlueCatalog::builtin(),
        }
    }

    #[cfg(test)]
    pub fn with_catalog(mut self, catalog: GlueCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    /// Check the manifest without touching the file system
    pub fn validate(&self) -> RunnerResult<()> {
        self.options.validate(&self.catalog)
    }

    /// Scenarios this runner would execute, in execution order
    pub fn discover(&self) -> RunnerResult<Vec<Pickle>> {
        self.validate()?;
        load_pickles(&self.options.features, &self.options.filter()?)
    }

    /// Execute every selected scenario.
    ///
    /// Configuration and parse errors abort before anything runs; scenario
    /// failures are recorded in the report.
    pub async fn run(&self) -> RunnerResult<RunReport> {
        let opts = &self.options;
        let timer = Timer::start(format!("Runner '{}'", opts.name));

        let registry = Arc::new(self.catalog.build_registry(&opts.glue)?);
        let pickles = self.discover()?;
        let specs = opts.plugin_specs()?;

        let http = HttpClient::with_timeout(opts.timeout_secs)
            .map_err(|e| RunnerError::config(e.to_string()))?;
        let executor = ScenarioExecutor::new(registry, http)
            .with_base_url(opts.base_url.clone())
            .dry_run(opts.dry_run);
        let mut reporter = Reporter::from_specs(&specs, opts.monochrome);

        info!(
            "Runner '{}': {} scenario(s), {} plugin(s), concurrency {}{}",
            opts.name,
            pickles.len(),
            reporter.plugin_count(),
            opts.concurrency,
            if opts.dry_run { ", dry run" } else { "" }
        );

        reporter.run_started(&opts.name)?;

        let mut scenarios = Vec::with_capacity(pickles.len());
        let results = run_ordered(pickles, opts.concurrency, |pickle| executor.execute(pickle));
        futures::pin_mut!(results);
        while let Some(result) = results.next().await {
            debug!("  {}", result);
            reporter.scenario_finished(&result)?;
            scenarios.push(result);
        }

        let report = RunReport::new(&opts.name, timer.started_at(), scenarios);
        reporter.run_finished(&report)?;

        let counts = report.scenario_counts();
        if report.is_success() {
            info!(
                "Runner '{}' passed in {}ms: {}",
                opts.name,
                timer.elapsed_ms(),
                counts
            );
        } else {
            warn!(
                "Runner '{}' failed in {}ms: {}",
                opts.name,
                timer.elapsed_ms(),
                counts
            );
        }

        Ok(report)
    }
}

/// Outcome of one runner within a suite
#[derive(Debug)]
pub enum RunnerOutcome {
    Completed(RunReport),
    Aborted { runner: String, error: RunnerError },
}

impl RunnerOutcome {
    /// Name of the runner this outcome belongs to
    pub fn runner(&self) -> &str {
        match self {
            RunnerOutcome::Completed(report) => &report.runner,
            RunnerOutcome::Aborted { runner, .. } => runner,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunnerOutcome::Completed(report) if report.is_success())
    }
}

/// Several independent runners executed one after another
pub struct Suite {
    runners: Vec<Runner>,
}

impl Suite {
    pub fn new() -> Self {
        Self {
            runners: Vec::new(),
        }
    }

    pub fn add_runner(mut self, runner: Runner) -> Self {
        self.runners.push(runner);
        self
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Run every runner; one runner's error never stops the others
    pub async fn run_all(&self) -> Vec<RunnerOutcome> {
        if self.is_empty() {
            warn!("No runners selected");
        }
        let mut outcomes = Vec::with_capacity(self.len());

        for runner in &self.runners {
            info!("=== Runner '{}' ===", runner.name());
            let outcome = match runner.run().await {
                Ok(report) => RunnerOutcome::Completed(report),
                Err(error) => {
                    warn!("Runner '{}' aborted: {}", runner.name(), error);
                    RunnerOutcome::Aborted {
                        runner: runner.name().to_string(),
                        error,
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

impl Default for Suite {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerProfile;
    use crate::glue::{StepContext, StepFuture, StepRegistry, World};
    use crate::models::Status;
    use futures::FutureExt;
    use serde_json::Value;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    const API_FEATURE: &str = r#"@api
Feature: Accounts API

  Scenario: Variables round trip
    Given I set "id" to "42"
    Then "${id}" should equal "42"

  Scenario: Another passing check
    Then "a" should equal "a"
"#;

    const WEB_FEATURE: &str = r#"@web
Feature: Home page

  Scenario: Broken expectation
    Given I set "title" to "Home"
    Then "${title}" should equal "About"
"#;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// Mirror of a built-in profile rooted in a temp dir
    fn profile_in(dir: &TempDir, profile: RunnerProfile, features: &str) -> RunnerOptions {
        let mut opts = profile.options();
        opts.features = vec![dir.path().join(features).display().to_string()];
        let stem = dir.path().join(profile.report_stem()).display().to_string();
        opts.plugins = vec![format!("html:{stem}.html"), format!("json:{stem}.json")];
        opts
    }

    fn shared_tree() -> TempDir {
        let dir = tempdir().unwrap();
        write(dir.path(), "features/api/accounts.feature", API_FEATURE);
        write(dir.path(), "features/web/home.feature", WEB_FEATURE);
        dir
    }

    #[tokio::test]
    async fn test_api_passes_while_web_fails() {
        let dir = shared_tree();

        let api = Runner::new(profile_in(&dir, RunnerProfile::Api, "features"));
        let web = Runner::new(profile_in(&dir, RunnerProfile::Web, "features"));

        let api_report = api.run().await.unwrap();
        let web_report = web.run().await.unwrap();

        assert!(api_report.is_success());
        assert_eq!(api_report.scenario_counts().passed, 2);
        assert!(!web_report.is_success());
        assert_eq!(web_report.scenario_counts().failed, 1);

        // Tag filters keep the two reports disjoint
        let api_json = std::fs::read_to_string(dir.path().join("reports/cucumber-api.json")).unwrap();
        let web_json = std::fs::read_to_string(dir.path().join("reports/cucumber-web.json")).unwrap();
        assert!(api_json.contains("Accounts API") && !api_json.contains("Home page"));
        assert!(web_json.contains("Home page") && !web_json.contains("Accounts API"));
        assert!(dir.path().join("reports/cucumber-api.html").exists());
        assert!(dir.path().join("reports/cucumber-web.html").exists());
    }

    #[tokio::test]
    async fn test_suite_reports_each_runner() {
        let dir = shared_tree();
        let suite = Suite::new()
            .add_runner(Runner::new(profile_in(&dir, RunnerProfile::Api, "features")))
            .add_runner(Runner::new(profile_in(&dir, RunnerProfile::Web, "features")))
            .add_runner(Runner::new(profile_in(&dir, RunnerProfile::Web, "missing")));

        let outcomes = suite.run_all().await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(matches!(
            &outcomes[2],
            RunnerOutcome::Aborted {
                error: RunnerError::Configuration(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_directory_succeeds() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("features")).unwrap();

        let report = Runner::new(profile_in(&dir, RunnerProfile::Api, "features"))
            .run()
            .await
            .unwrap();
        assert!(report.is_success());
        assert!(report.scenarios.is_empty());

        let json = std::fs::read_to_string(dir.path().join("reports/cucumber-api.json")).unwrap();
        assert_eq!(json, "[]");
    }

    #[tokio::test]
    async fn test_missing_root_and_glue_are_configuration_errors() {
        let dir = tempdir().unwrap();
        let err = Runner::new(profile_in(&dir, RunnerProfile::Api, "nowhere"))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Configuration(_)));

        write(dir.path(), "features/a.feature", API_FEATURE);
        let mut opts = profile_in(&dir, RunnerProfile::Api, "features");
        opts.glue = vec!["com.example.missing".to_string()];
        let err = Runner::new(opts).run().await.unwrap_err();
        assert!(matches!(err, RunnerError::Configuration(_)));
        assert!(
            !dir.path().join("reports/cucumber-api.json").exists(),
            "nothing is written when configuration fails"
        );
    }

    #[tokio::test]
    async fn test_malformed_feature_is_parse_error() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "features/bad.feature",
            "This is not gherkin at all\n  Given what\n",
        );
        let err = Runner::new(profile_in(&dir, RunnerProfile::Api, "features"))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Parse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_undefined_step_reported_in_every_format() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "features/undefined.feature",
            "@api\nFeature: Gaps\n\n  Scenario: Missing glue\n    Given I have 3 cukes in my belly\n",
        );
        let mut opts = profile_in(&dir, RunnerProfile::Api, "features");
        let pretty = dir.path().join("reports/pretty.txt");
        opts.plugins.push(format!("pretty:{}", pretty.display()));

        let report = Runner::new(opts).run().await.unwrap();
        assert!(!report.is_success());
        let step = &report.scenarios[0].steps[0];
        assert_eq!(step.status, Status::Undefined);
        assert_eq!(
            step.error.as_deref(),
            Some("Undefined step: I have 3 cukes in my belly")
        );

        let pretty = std::fs::read_to_string(pretty).unwrap();
        assert!(pretty.contains("1 scenarios (1 undefined)"));
        assert!(pretty.contains("I have {int} cukes in my belly"));

        let html = std::fs::read_to_string(dir.path().join("reports/cucumber-api.html")).unwrap();
        assert!(html.contains(r#"<span class="undefined">undefined</span>"#));

        let json: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("reports/cucumber-api.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            json[0]["elements"][0]["steps"][0]["result"]["status"],
            "undefined"
        );
    }

    #[test]
    fn test_shipped_features_follow_runner_base_url() {
        let api = Runner::new(RunnerProfile::Api.options()).discover().unwrap();
        let web = Runner::new(RunnerProfile::Web.options()).discover().unwrap();

        assert!(!api.is_empty() && !web.is_empty());
        assert!(api.iter().all(|p| p.has_tag("api") && !p.has_tag("web")));
        assert!(web.iter().all(|p| p.has_tag("web") && !p.has_tag("api")));
        for pickle in api.iter().chain(&web) {
            assert!(
                pickle.steps.iter().all(|s| !s.text.starts_with("the base URL is")),
                "{} pins its own base URL",
                pickle.location()
            );
        }
    }

    #[tokio::test]
    async fn test_builtin_hooks_run_around_tagged_scenarios() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "features/hooks.feature",
            "@api\nFeature: Hooks\n\n  @json\n  Scenario: With JSON\n    Given I set \"a\" to \"b\"\n\n  Scenario: Plain\n    Given I set \"a\" to \"b\"\n",
        );
        let report = Runner::new(profile_in(&dir, RunnerProfile::Api, "features"))
            .run()
            .await
            .unwrap();

        assert!(report.is_success());
        fn names(hooks: &[crate::models::HookResult]) -> Vec<String> {
            hooks.iter().map(|h| h.name.clone()).collect()
        }
        assert_eq!(names(&report.scenarios[0].before), vec!["JSON headers"]);
        assert!(report.scenarios[1].before.is_empty());
        for scenario in &report.scenarios {
            assert_eq!(names(&scenario.after), vec!["log last response"]);
        }
    }

    fn strip_volatile(value: &mut Value) {
        match value {
            Value::Object(map) => {
                map.remove("duration");
                map.values_mut().for_each(strip_volatile);
            }
            Value::Array(items) => items.iter_mut().for_each(strip_volatile),
            _ => {}
        }
    }

    #[tokio::test]
    async fn test_rerun_gives_identical_json() {
        let dir = shared_tree();
        let runner = Runner::new(profile_in(&dir, RunnerProfile::Web, "features"));
        let path = dir.path().join("reports/cucumber-web.json");

        runner.run().await.unwrap();
        let mut first: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        runner.run().await.unwrap();
        let mut second: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        strip_volatile(&mut first);
        strip_volatile(&mut second);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_dry_run_skips_matched_steps() {
        let dir = shared_tree();
        let opts = profile_in(&dir, RunnerProfile::Web, "features").dry_run(true);
        let report = Runner::new(opts).run().await.unwrap();

        assert!(report.is_success());
        assert!(report.scenarios[0]
            .steps
            .iter()
            .all(|s| s.status == Status::Skipped));
    }

    #[tokio::test]
    async fn test_line_selector_and_name_filter() {
        let dir = shared_tree();
        let file = dir.path().join("features/api/accounts.feature");

        let mut opts = profile_in(&dir, RunnerProfile::Api, "features");
        opts.features = vec![format!("{}:8", file.display())];
        let pickles = Runner::new(opts).discover().unwrap();
        assert_eq!(pickles.len(), 1);
        assert_eq!(pickles[0].name, "Another passing check");

        let mut opts = profile_in(&dir, RunnerProfile::Api, "features");
        opts.names = vec!["^Variables".to_string()];
        let pickles = Runner::new(opts).discover().unwrap();
        assert_eq!(pickles.len(), 1);
        assert_eq!(pickles[0].name, "Variables round trip");
    }

    fn pause<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
        async move {
            let ms: u64 = ctx.parse(0)?;
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            world.vars.insert("slept".to_string(), ms.to_string());
            Ok(())
        }
        .boxed()
    }

    fn register_timing(registry: &mut StepRegistry) -> RunnerResult<()> {
        registry.when("I pause for {int} ms", pause)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_run_keeps_discovery_order() {
        let dir = tempdir().unwrap();
        let mut feature = String::from("@api\nFeature: Timing\n");
        let delays = [120, 10, 80, 0, 40];
        for (i, ms) in delays.iter().enumerate() {
            feature.push_str(&format!(
                "\n  Scenario: Pause {i}\n    When I pause for {ms} ms\n"
            ));
        }
        write(dir.path(), "features/timing.feature", &feature);

        let mut catalog = GlueCatalog::builtin();
        catalog.add("support.timing", "Sleeps", register_timing);

        let mut opts = profile_in(&dir, RunnerProfile::Api, "features");
        opts.concurrency = 5;
        opts.glue = vec!["support".to_string()];

        let start = std::time::Instant::now();
        let report = Runner::new(opts).with_catalog(catalog).run().await.unwrap();
        let elapsed = start.elapsed();

        let names: Vec<&str> = report.scenarios.iter().map(|s| s.pickle.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Pause 0", "Pause 1", "Pause 2", "Pause 3", "Pause 4"]
        );
        assert!(report.is_success());
        assert!(
            elapsed < std::time::Duration::from_millis(240),
            "scenarios should overlap, took {elapsed:?}"
        );
    }
}
