//! Execution of a single pickle
//!
//! Before hooks, then steps in order, then after hooks. Once a step or
//! before hook does not pass, later steps are only matched, never run.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ExecutionError;
use crate::glue::{snippet, Hook, StepContext, StepMatch, StepRegistry, World};
use crate::http::HttpClient;
use crate::models::{HookKind, HookResult, Pickle, PickleStep, ScenarioResult, Status, StepResult};
use crate::utils::timer::Timer;

/// Runs pickles against one registry
pub struct ScenarioExecutor {
    registry: Arc<StepRegistry>,
    http: HttpClient,
    base_url: Option<String>,
    dry_run: bool,
}

impl ScenarioExecutor {
    pub fn new(registry: Arc<StepRegistry>, http: HttpClient) -> Self {
        Self {
            registry,
            http,
            base_url: None,
            dry_run: false,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn execute(&self, pickle: Pickle) -> ScenarioResult {
        let timer = Timer::start(format!("Scenario '{}'", pickle.name));
        let started_at = timer.started_at();
        let mut world = World::new(self.http.clone(), self.base_url.clone());

        debug!("Executing {}", pickle);

        let mut before = Vec::new();
        if !self.dry_run {
            for hook in self.registry.hooks_for(HookKind::Before, &pickle.tags) {
                before.push(run_hook(hook, &mut world).await);
            }
        }
        let mut runnable = before.iter().all(|h| h.status == Status::Passed);

        let mut steps = Vec::with_capacity(pickle.steps.len());
        for step in &pickle.steps {
            let result = self.run_step(step, &mut world, runnable).await;
            if result.status != Status::Passed {
                runnable = false;
            }
            steps.push(result);
        }

        let mut after = Vec::new();
        if !self.dry_run {
            for hook in self.registry.hooks_for(HookKind::After, &pickle.tags) {
                after.push(run_hook(hook, &mut world).await);
            }
        }

        timer.stop();
        let result = ScenarioResult::new(pickle, before, steps, after, started_at);
        if result.status.is_failure() {
            warn!("{}", result);
        }
        result
    }

    async fn run_step(&self, step: &PickleStep, world: &mut World, runnable: bool) -> StepResult {
        match self.registry.find(&step.text) {
            StepMatch::Undefined => {
                let error = ExecutionError::Undefined {
                    step: step.text.clone(),
                };
                debug!("{}", error);
                StepResult::new(step.clone(), Status::Undefined)
                    .with_error(error.to_string())
                    .with_snippet(snippet(
                        &step.keyword,
                        &step.text,
                        step.docstring.is_some(),
                        step.table.is_some(),
                    ))
            }
            StepMatch::Ambiguous(patterns) if runnable || self.dry_run => {
                let error = ExecutionError::Ambiguous {
                    step: step.text.clone(),
                    patterns,
                };
                StepResult::new(step.clone(), Status::Ambiguous).with_error(error.to_string())
            }
            StepMatch::Ambiguous(_) => StepResult::new(step.clone(), Status::Skipped),
            StepMatch::Matched { definition, args } => {
                let pattern = definition.expression.source().to_string();
                if self.dry_run || !runnable {
                    return StepResult::new(step.clone(), Status::Skipped).with_matched(pattern);
                }

                debug!("Step '{}' matched '{}' from {}", step.text, pattern, definition.location);
                let ctx = StepContext {
                    text: step.text.clone(),
                    args,
                    docstring: step.docstring.clone(),
                    table: step.table.clone(),
                };

                let timer = Timer::start(format!("Step '{}'", step.text));
                let outcome = AssertUnwindSafe((definition.handler)(world, ctx))
                    .catch_unwind()
                    .await;
                let duration = timer.stop();

                let result = StepResult::new(step.clone(), Status::Passed)
                    .with_matched(pattern)
                    .with_duration(duration);
                let error = match outcome {
                    Ok(Ok(())) => return result,
                    Ok(Err(e)) => ExecutionError::StepFailed {
                        step: step.text.clone(),
                        message: format!("{e:#}"),
                    },
                    Err(payload) => ExecutionError::Panicked {
                        step: step.text.clone(),
                        message: panic_message(payload.as_ref()),
                    },
                };
                StepResult {
                    status: Status::Failed,
                    ..result
                }
                .with_error(error.to_string())
            }
        }
    }
}

async fn run_hook(hook: &Hook, world: &mut World) -> HookResult {
    let timer = Timer::start(format!("{} hook '{}'", hook.kind, hook.name));
    let outcome = AssertUnwindSafe((hook.handler)(world)).catch_unwind().await;
    let duration = timer.stop();

    let message = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{e:#}")),
        Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
    };
    let error = message.map(|message| {
        ExecutionError::HookFailed {
            hook: hook.name.clone(),
            message,
        }
        .to_string()
    });

    HookResult {
        kind: hook.kind,
        name: hook.name.clone(),
        status: if error.is_some() {
            Status::Failed
        } else {
            Status::Passed
        },
        duration,
        error,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glue::StepFuture;
    use crate::models::pickle_fixtures::pickle;

    fn pass<'a>(world: &'a mut World, _ctx: StepContext) -> StepFuture<'a> {
        async move {
            let n = world.vars.len();
            world.vars.insert(format!("step{n}"), "ran".to_string());
            Ok(())
        }
        .boxed()
    }

    fn fail<'a>(_world: &'a mut World, _ctx: StepContext) -> StepFuture<'a> {
        async { anyhow::bail!("expected 1 but was 2") }.boxed()
    }

    fn kaboom() -> anyhow::Result<()> {
        panic!("kaboom")
    }

    fn explode<'a>(_world: &'a mut World, _ctx: StepContext) -> StepFuture<'a> {
        async { kaboom() }.boxed()
    }

    fn seen_step<'a>(world: &'a mut World, _ctx: StepContext) -> StepFuture<'a> {
        async move {
            if world.vars.contains_key("hooked") {
                Ok(())
            } else {
                anyhow::bail!("before hook did not run")
            }
        }
        .boxed()
    }

    fn mark<'a>(world: &'a mut World) -> StepFuture<'a> {
        async move {
            world.vars.insert("hooked".to_string(), "yes".to_string());
            Ok(())
        }
        .boxed()
    }

    fn refuse<'a>(_world: &'a mut World) -> StepFuture<'a> {
        async { anyhow::bail!("database unavailable") }.boxed()
    }

    fn registry() -> Arc<StepRegistry> {
        let mut registry = StepRegistry::new();
        registry
            .step("a passing step", pass)
            .unwrap()
            .step("a failing step", fail)
            .unwrap()
            .step("a panicking step", explode)
            .unwrap()
            .step("the hook has run", seen_step)
            .unwrap()
            .step("a twin step", pass)
            .unwrap()
            .step("a twin {word}", pass)
            .unwrap()
            .before("mark", None, mark)
            .unwrap()
            .before("db", Some("@db"), refuse)
            .unwrap()
            .after("cleanup", None, mark)
            .unwrap();
        Arc::new(registry)
    }

    fn executor() -> ScenarioExecutor {
        ScenarioExecutor::new(registry(), HttpClient::with_timeout(5).unwrap())
    }

    fn statuses(result: &ScenarioResult) -> Vec<Status> {
        result.steps.iter().map(|s| s.status).collect()
    }

    #[tokio::test]
    async fn test_passing_scenario_runs_hooks() {
        let result = executor()
            .execute(pickle("ok", &[], &["the hook has run", "a passing step"]))
            .await;
        assert_eq!(result.status, Status::Passed);
        assert_eq!(result.before.len(), 1);
        assert_eq!(result.after.len(), 1);
        assert_eq!(result.steps[1].matched.as_deref(), Some("a passing step"));
    }

    #[tokio::test]
    async fn test_failure_skips_rest_but_reports_undefined() {
        let result = executor()
            .execute(pickle(
                "broken",
                &[],
                &["a passing step", "a failing step", "a passing step", "nobody knows me"],
            ))
            .await;

        assert_eq!(
            statuses(&result),
            vec![Status::Passed, Status::Failed, Status::Skipped, Status::Undefined]
        );
        assert_eq!(result.status, Status::Failed);
        let err = result.steps[1].error.as_deref().unwrap();
        assert!(err.contains("a failing step"));
        assert!(err.contains("expected 1 but was 2"));
        assert!(result.steps[3].snippet.is_some());
        assert_eq!(result.after[0].status, Status::Passed, "after hooks always run");
    }

    #[tokio::test]
    async fn test_undefined_step_names_the_step() {
        let result = executor()
            .execute(pickle("missing", &[], &["I have 3 cukes"]))
            .await;
        assert_eq!(result.status, Status::Undefined);
        assert_eq!(
            result.steps[0].error.as_deref(),
            Some("Undefined step: I have 3 cukes")
        );
    }

    #[tokio::test]
    async fn test_ambiguous_step() {
        let result = executor()
            .execute(pickle("twins", &[], &["a twin step", "a passing step"]))
            .await;
        assert_eq!(statuses(&result), vec![Status::Ambiguous, Status::Skipped]);
        assert!(result.steps[0]
            .error
            .as_deref()
            .unwrap()
            .contains("a twin {word}"));
    }

    #[tokio::test]
    async fn test_panic_is_recorded_as_failure() {
        let result = executor()
            .execute(pickle("panics", &[], &["a panicking step", "a passing step"]))
            .await;
        assert_eq!(statuses(&result), vec![Status::Failed, Status::Skipped]);
        assert!(result.steps[0].error.as_deref().unwrap().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_failing_before_hook_skips_steps() {
        let result = executor()
            .execute(pickle("needs db", &["db"], &["a passing step"]))
            .await;
        assert_eq!(result.status, Status::Failed);
        assert_eq!(statuses(&result), vec![Status::Skipped]);
        assert!(result.errors()[0].contains("database unavailable"));
        assert_eq!(result.after.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_matches_without_executing() {
        let result = executor()
            .dry_run(true)
            .execute(pickle(
                "dry",
                &["db"],
                &["a failing step", "a twin step", "unknown step"],
            ))
            .await;
        assert_eq!(
            statuses(&result),
            vec![Status::Skipped, Status::Ambiguous, Status::Undefined]
        );
        assert!(result.before.is_empty());
        assert!(result.after.is_empty());
    }

    #[tokio::test]
    async fn test_empty_scenario_passes() {
        let result = executor().execute(pickle("empty", &[], &[])).await;
        assert_eq!(result.status, Status::Passed);
    }
}
