//! Scenario and step result models
//!
//! Defines statuses, per-step and per-scenario results and the run report
//! every output plugin renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::pickle::{FeatureInfo, Pickle, PickleStep};

/// Outcome of a step, hook or scenario.
///
/// Variants are declared in increasing severity so that the worst status
/// of a scenario is simply the maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Skipped,
    Undefined,
    Ambiguous,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Skipped => "skipped",
            Status::Undefined => "undefined",
            Status::Ambiguous => "ambiguous",
            Status::Failed => "failed",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Passed => "✓",
            Status::Skipped => "-",
            Status::Undefined => "?",
            Status::Ambiguous => "~",
            Status::Failed => "✗",
        }
    }

    /// Single character used by the progress plugin
    pub fn progress_char(&self) -> char {
        match self {
            Status::Passed => '.',
            Status::Skipped => '-',
            Status::Undefined => 'U',
            Status::Ambiguous => 'A',
            Status::Failed => 'F',
        }
    }

    /// ANSI colour code for console output
    pub fn ansi_color(&self) -> &'static str {
        match self {
            Status::Passed => "32",
            Status::Skipped => "36",
            Status::Undefined | Status::Ambiguous => "33",
            Status::Failed => "31",
        }
    }

    /// Statuses that make a run fail
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed | Status::Undefined | Status::Ambiguous)
    }

    pub fn all() -> [Status; 5] {
        [
            Status::Passed,
            Status::Failed,
            Status::Undefined,
            Status::Ambiguous,
            Status::Skipped,
        ]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing one step
#[derive(Clone, Debug)]
pub struct StepResult {
    pub step: PickleStep,
    pub status: Status,
    pub duration: Duration,
    pub error: Option<String>,
    /// Pattern of the step definition that matched
    pub matched: Option<String>,
    /// Suggested definition for undefined steps
    pub snippet: Option<String>,
}

impl StepResult {
    pub fn new(step: PickleStep, status: Status) -> Self {
        Self {
            step,
            status,
            duration: Duration::ZERO,
            error: None,
            matched: None,
            snippet: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_matched(mut self, pattern: impl Into<String>) -> Self {
        self.matched = Some(pattern.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// Hook phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    Before,
    After,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Before => f.write_str("before"),
            HookKind::After => f.write_str("after"),
        }
    }
}

/// Result of running one hook
#[derive(Clone, Debug)]
pub struct HookResult {
    pub kind: HookKind,
    pub name: String,
    pub status: Status,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Result of executing one pickle
#[derive(Clone, Debug)]
pub struct ScenarioResult {
    pub pickle: Pickle,
    pub before: Vec<HookResult>,
    pub steps: Vec<StepResult>,
    pub after: Vec<HookResult>,
    pub status: Status,
    pub started_at: DateTime<Utc>,
}

impl ScenarioResult {
    pub fn new(
        pickle: Pickle,
        before: Vec<HookResult>,
        steps: Vec<StepResult>,
        after: Vec<HookResult>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let hook_status = before.iter().chain(after.iter()).map(|h| h.status);
        let step_status = steps.iter().map(|s| s.status);
        let status = hook_status
            .chain(step_status)
            .max()
            .unwrap_or(Status::Passed);

        Self {
            pickle,
            before,
            steps,
            after,
            status,
            started_at,
        }
    }

    pub fn duration(&self) -> Duration {
        let hooks: Duration = self
            .before
            .iter()
            .chain(self.after.iter())
            .map(|h| h.duration)
            .sum();
        let steps: Duration = self.steps.iter().map(|s| s.duration).sum();
        hooks + steps
    }

    /// Every error message recorded for this scenario, hooks first
    pub fn errors(&self) -> Vec<&str> {
        self.before
            .iter()
            .filter_map(|h| h.error.as_deref())
            .chain(self.steps.iter().filter_map(|s| s.error.as_deref()))
            .chain(self.after.iter().filter_map(|h| h.error.as_deref()))
            .collect()
    }

    pub fn snippets(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|s| s.snippet.as_deref())
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.pickle.name,
            self.duration().as_millis()
        )?;
        if let Some(err) = self.errors().first() {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}

/// Counters per status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub undefined: usize,
    pub ambiguous: usize,
}

impl StatusCounts {
    pub fn from_statuses(statuses: impl IntoIterator<Item = Status>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.total += 1;
            match status {
                Status::Passed => counts.passed += 1,
                Status::Failed => counts.failed += 1,
                Status::Skipped => counts.skipped += 1,
                Status::Undefined => counts.undefined += 1,
                Status::Ambiguous => counts.ambiguous += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Passed => self.passed,
            Status::Failed => self.failed,
            Status::Skipped => self.skipped,
            Status::Undefined => self.undefined,
            Status::Ambiguous => self.ambiguous,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.total)?;
        let parts: Vec<String> = Status::all()
            .iter()
            .filter(|s| self.get(**s) > 0)
            .map(|s| format!("{} {}", self.get(*s), s))
            .collect();
        if !parts.is_empty() {
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

/// Complete outcome of one runner invocation
#[derive(Clone, Debug)]
pub struct RunReport {
    pub runner: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioResult>,
}

impl RunReport {
    pub fn new(
        runner: impl Into<String>,
        started_at: DateTime<Utc>,
        scenarios: Vec<ScenarioResult>,
    ) -> Self {
        Self {
            runner: runner.into(),
            started_at,
            finished_at: Utc::now(),
            scenarios,
        }
    }

    pub fn scenario_counts(&self) -> StatusCounts {
        StatusCounts::from_statuses(self.scenarios.iter().map(|s| s.status))
    }

    pub fn step_counts(&self) -> StatusCounts {
        StatusCounts::from_statuses(
            self.scenarios
                .iter()
                .flat_map(|s| s.steps.iter().map(|st| st.status)),
        )
    }

    pub fn duration(&self) -> Duration {
        self.scenarios.iter().map(|s| s.duration()).sum()
    }

    /// True when no scenario failed, was undefined or ambiguous
    pub fn is_success(&self) -> bool {
        !self.scenarios.iter().any(|s| s.status.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.scenarios.iter().filter(|s| s.status.is_failure())
    }

    /// Scenario results grouped by feature, in discovery order
    pub fn by_feature(&self) -> Vec<(&FeatureInfo, Vec<&ScenarioResult>)> {
        let mut groups: Vec<(&FeatureInfo, Vec<&ScenarioResult>)> = Vec::new();
        for result in &self.scenarios {
            let feature = result.pickle.feature.as_ref();
            match groups.last_mut() {
                Some((f, list)) if f.uri == feature.uri => list.push(result),
                _ => groups.push((feature, vec![result])),
            }
        }
        groups
    }

    /// Distinct snippets for undefined steps, first occurrence order
    pub fn snippets(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for snippet in self.scenarios.iter().flat_map(|s| s.snippets()) {
            if !seen.contains(&snippet) {
                seen.push(snippet);
            }
        }
        seen
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Runner '{}'", self.runner)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.scenarios {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "Scenarios: {}", self.scenario_counts())?;
        writeln!(f, "Steps: {}", self.step_counts())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::scenario;
    use super::*;

    #[test]
    fn test_status_severity_order() {
        assert!(Status::Failed > Status::Ambiguous);
        assert!(Status::Ambiguous > Status::Undefined);
        assert!(Status::Undefined > Status::Skipped);
        assert!(Status::Skipped > Status::Passed);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&Status::Undefined).unwrap();
        assert_eq!(json, "\"undefined\"");
    }

    #[test]
    fn test_scenario_status_is_worst_step() {
        let result = scenario("mixed", &[Status::Passed, Status::Undefined, Status::Skipped]);
        assert_eq!(result.status, Status::Undefined);

        let result = scenario("empty", &[]);
        assert_eq!(result.status, Status::Passed);
    }

    #[test]
    fn test_hook_failure_fails_scenario() {
        let mut result = scenario("hooked", &[Status::Skipped]);
        result.before.push(HookResult {
            kind: HookKind::Before,
            name: "setup".to_string(),
            status: Status::Failed,
            duration: Duration::ZERO,
            error: Some("no db".to_string()),
        });
        let rebuilt = ScenarioResult::new(
            result.pickle,
            result.before,
            result.steps,
            result.after,
            result.started_at,
        );
        assert_eq!(rebuilt.status, Status::Failed);
        assert_eq!(rebuilt.errors(), vec!["no db"]);
    }

    #[test]
    fn test_report_success_and_counts() {
        let report = RunReport::new(
            "api",
            Utc::now(),
            vec![
                scenario("ok", &[Status::Passed]),
                scenario("dry", &[Status::Skipped]),
            ],
        );
        assert!(report.is_success());
        assert_eq!(report.scenario_counts().passed, 1);
        assert_eq!(report.scenario_counts().skipped, 1);
        assert_eq!(report.step_counts().total, 2);

        let failing = RunReport::new("web", Utc::now(), vec![scenario("bad", &[Status::Failed])]);
        assert!(!failing.is_success());
        assert_eq!(failing.failures().count(), 1);
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = RunReport::new("api", Utc::now(), Vec::new());
        assert!(report.is_success());
        assert_eq!(report.scenario_counts().total, 0);
        assert!(report.by_feature().is_empty());
    }

    #[test]
    fn test_snippets_are_deduplicated() {
        let report = RunReport::new(
            "api",
            Utc::now(),
            vec![
                scenario("a", &[Status::Undefined]),
                scenario("b", &[Status::Undefined]),
            ],
        );
        assert_eq!(report.snippets(), vec!["step(\"step 0\")"]);
    }

    #[test]
    fn test_counts_display() {
        let counts = StatusCounts::from_statuses([Status::Passed, Status::Failed, Status::Passed]);
        assert_eq!(counts.to_string(), "3 (2 passed, 1 failed)");
        assert!((counts.pass_rate() - 66.666).abs() < 0.01);
    }
}
