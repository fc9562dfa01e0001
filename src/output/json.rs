//! Cucumber JSON report
//!
//! Array of features, each with `elements` (scenarios) holding `steps`
//! whose `result.status` uses the lowercase status names.

use serde::Serialize;
use std::path::PathBuf;

use super::{write_report_file, Plugin};
use crate::error::{RunnerError, RunnerResult};
use crate::models::{FeatureInfo, HookResult, RunReport, ScenarioResult, Status, StepResult};

#[derive(Serialize)]
struct JsonFeature {
    uri: String,
    id: String,
    keyword: String,
    name: String,
    description: String,
    line: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<JsonTag>,
    elements: Vec<JsonElement>,
}

#[derive(Serialize)]
struct JsonTag {
    name: String,
}

#[derive(Serialize)]
struct JsonElement {
    id: String,
    keyword: String,
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
    line: usize,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<JsonTag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    before: Vec<JsonHook>,
    steps: Vec<JsonStep>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    after: Vec<JsonHook>,
}

#[derive(Serialize)]
struct JsonStep {
    keyword: String,
    name: String,
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc_string: Option<JsonDocString>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rows: Vec<JsonRow>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    matched: Option<JsonMatch>,
    result: JsonResult,
}

#[derive(Serialize)]
struct JsonDocString {
    value: String,
}

#[derive(Serialize)]
struct JsonRow {
    cells: Vec<String>,
}

#[derive(Serialize)]
struct JsonMatch {
    location: String,
}

#[derive(Serialize)]
struct JsonHook {
    #[serde(rename = "match")]
    matched: JsonMatch,
    result: JsonResult,
}

#[derive(Serialize)]
struct JsonResult {
    status: Status,
    /// Nanoseconds
    duration: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

fn tags(names: &[String]) -> Vec<JsonTag> {
    names
        .iter()
        .map(|t| JsonTag {
            name: format!("@{t}"),
        })
        .collect()
}

fn feature_json(feature: &FeatureInfo, scenarios: &[&ScenarioResult]) -> JsonFeature {
    JsonFeature {
        uri: feature.uri.clone(),
        id: feature.id(),
        keyword: feature.keyword.clone(),
        name: feature.name.clone(),
        description: feature.description.clone().unwrap_or_default(),
        line: feature.line,
        tags: tags(&feature.tags),
        elements: scenarios.iter().map(|s| element_json(s)).collect(),
    }
}

fn element_json(result: &ScenarioResult) -> JsonElement {
    let pickle = &result.pickle;
    JsonElement {
        id: pickle.id(),
        keyword: pickle.keyword.clone(),
        name: pickle.name.clone(),
        description: pickle.description.clone().unwrap_or_default(),
        rule: pickle.rule.clone(),
        line: pickle.effective_line(),
        kind: "scenario",
        tags: tags(&pickle.tags),
        before: result.before.iter().map(hook_json).collect(),
        steps: result.steps.iter().map(step_json).collect(),
        after: result.after.iter().map(hook_json).collect(),
    }
}

fn step_json(result: &StepResult) -> JsonStep {
    let step = &result.step;
    JsonStep {
        keyword: format!("{} ", step.keyword),
        name: step.text.clone(),
        line: step.line,
        doc_string: step.docstring.as_ref().map(|value| JsonDocString {
            value: value.clone(),
        }),
        rows: step
            .table
            .iter()
            .flatten()
            .map(|cells| JsonRow {
                cells: cells.clone(),
            })
            .collect(),
        matched: result.matched.as_ref().map(|location| JsonMatch {
            location: location.clone(),
        }),
        result: JsonResult {
            status: result.status,
            duration: result.duration.as_nanos(),
            error_message: result.error.clone(),
        },
    }
}

fn hook_json(hook: &HookResult) -> JsonHook {
    JsonHook {
        matched: JsonMatch {
            location: format!("{} hook '{}'", hook.kind, hook.name),
        },
        result: JsonResult {
            status: hook.status,
            duration: hook.duration.as_nanos(),
            error_message: hook.error.clone(),
        },
    }
}

/// Render a run as Cucumber JSON
pub fn render_json(report: &RunReport) -> serde_json::Result<String> {
    let features: Vec<JsonFeature> = report
        .by_feature()
        .into_iter()
        .map(|(feature, scenarios)| feature_json(feature, &scenarios))
        .collect();
    serde_json::to_string_pretty(&features)
}

pub struct JsonPlugin {
    path: PathBuf,
}

impl JsonPlugin {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Plugin for JsonPlugin {
    fn name(&self) -> &str {
        "json"
    }

    fn on_run_finished(&mut self, report: &RunReport) -> RunnerResult<()> {
        let content = render_json(report).map_err(|e| RunnerError::report("json", e.to_string()))?;
        write_report_file(&self.path, &content)
    }
}
