//! Feature compilation
//!
//! Parses feature files with the `gherkin` crate and compiles them into
//! pickles: backgrounds merged, rules flattened, outlines expanded.

use gherkin::{Feature, GherkinEnv, Rule, Scenario, Step};
use std::sync::Arc;
use tracing::debug;

use super::discovery::FeatureSource;
use crate::error::{RunnerError, RunnerResult};
use crate::models::{FeatureInfo, Pickle, PickleStep};

/// Parse and compile one feature file, applying its line selectors
pub fn compile_source(source: &FeatureSource) -> RunnerResult<Vec<Pickle>> {
    let content = std::fs::read_to_string(&source.path)
        .map_err(|e| RunnerError::io(&source.path, e))?;

    let pickles = compile_str(&content, &source.uri())?;
    if source.selects_all() {
        return Ok(pickles);
    }

    Ok(pickles
        .into_iter()
        .filter(|p| {
            source.lines.contains(&p.line)
                || p.example_line.is_some_and(|l| source.lines.contains(&l))
        })
        .collect())
}

/// Compile feature text into pickles.
///
/// A file that holds nothing but whitespace and comments compiles to no
/// pickles; anything else must parse as a feature.
pub fn compile_str(content: &str, uri: &str) -> RunnerResult<Vec<Pickle>> {
    if is_blank(content) {
        debug!("Skipping empty feature file {}", uri);
        return Ok(Vec::new());
    }

    let feature = Feature::parse(content, GherkinEnv::default()).map_err(|e| {
        RunnerError::Parse {
            path: uri.into(),
            message: e.to_string(),
        }
    })?;

    Ok(compile_feature(&feature, content, uri))
}

fn is_blank(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|l| l.is_empty() || l.starts_with('#'))
}

/// Compile a parsed feature into pickles ordered by declaration line
fn compile_feature(feature: &Feature, content: &str, uri: &str) -> Vec<Pickle> {
    let info = Arc::new(FeatureInfo {
        uri: uri.to_string(),
        keyword: feature.keyword.trim().to_string(),
        name: feature.name.trim().to_string(),
        description: clean_description(feature.description.as_deref()),
        line: feature.position.line,
        tags: normalize_tags(&feature.tags),
    });

    let feature_background: Vec<PickleStep> = feature
        .background
        .as_ref()
        .map(|bg| background_steps(&bg.steps))
        .unwrap_or_default();

    let mut scenarios: Vec<(Option<&Rule>, &Scenario)> =
        feature.scenarios.iter().map(|s| (None, s)).collect();
    for rule in &feature.rules {
        scenarios.extend(rule.scenarios.iter().map(|s| (Some(rule), s)));
    }
    scenarios.sort_by_key(|(_, s)| s.position.line);

    let mut pickles = Vec::new();
    for (rule, scenario) in scenarios {
        let mut background = feature_background.clone();
        let mut inherited_tags = info.tags.clone();

        if let Some(rule) = rule {
            if let Some(bg) = &rule.background {
                background.extend(background_steps(&bg.steps));
            }
            inherited_tags.extend(normalize_tags(&rule.tags));
        }

        let ctx = ScenarioContext {
            content,
            feature: &info,
            rule: rule.map(|r| r.name.trim().to_string()),
            background: &background,
            inherited_tags: &inherited_tags,
        };

        if scenario.examples.is_empty() {
            pickles.push(ctx.plain(scenario));
        } else {
            pickles.extend(ctx.outline(scenario));
        }
    }

    debug!("Compiled {} pickle(s) from {}", pickles.len(), uri);
    pickles
}

struct ScenarioContext<'a> {
    content: &'a str,
    feature: &'a Arc<FeatureInfo>,
    rule: Option<String>,
    background: &'a [PickleStep],
    inherited_tags: &'a [String],
}

impl ScenarioContext<'_> {
    fn plain(&self, scenario: &Scenario) -> Pickle {
        let mut steps = self.background.to_vec();
        steps.extend(scenario.steps.iter().map(|s| convert_step(s, false)));

        Pickle {
            feature: Arc::clone(self.feature),
            rule: self.rule.clone(),
            keyword: scenario.keyword.trim().to_string(),
            name: scenario.name.trim().to_string(),
            description: clean_description(scenario.description.as_deref()),
            line: scenario.position.line,
            example_line: None,
            tags: merge_tags(self.inherited_tags, &normalize_tags(&scenario.tags)),
            steps,
        }
    }

    fn outline(&self, scenario: &Scenario) -> Vec<Pickle> {
        let mut pickles = Vec::new();
        let scenario_tags = merge_tags(self.inherited_tags, &normalize_tags(&scenario.tags));

        for examples in &scenario.examples {
            let Some(table) = examples.table.as_ref() else {
                continue;
            };
            let Some((header, rows)) = table.rows.split_first() else {
                continue;
            };
            let tags = merge_tags(&scenario_tags, &normalize_tags(&examples.tags));
            let row_lines = table_row_lines(self.content, table.position.line);

            for (i, row) in rows.iter().enumerate() {
                let values: Vec<(&str, &str)> = header
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(String::as_str))
                    .collect();
                // Index 0 of row_lines is the header
                let example_line = row_lines
                    .get(i + 1)
                    .copied()
                    .unwrap_or(table.position.line + i + 1);

                let mut steps = self.background.to_vec();
                steps.extend(scenario.steps.iter().map(|s| {
                    let mut step = convert_step(s, false);
                    step.text = substitute(&step.text, &values);
                    step.docstring = step.docstring.map(|d| substitute(&d, &values));
                    step.table = step.table.map(|rows| {
                        rows.into_iter()
                            .map(|r| r.into_iter().map(|c| substitute(&c, &values)).collect())
                            .collect()
                    });
                    step
                }));

                pickles.push(Pickle {
                    feature: Arc::clone(self.feature),
                    rule: self.rule.clone(),
                    keyword: scenario.keyword.trim().to_string(),
                    name: substitute(scenario.name.trim(), &values),
                    description: clean_description(scenario.description.as_deref()),
                    line: scenario.position.line,
                    example_line: Some(example_line),
                    tags: tags.clone(),
                    steps,
                });
            }
        }

        pickles
    }
}

fn background_steps(steps: &[Step]) -> Vec<PickleStep> {
    steps.iter().map(|s| convert_step(s, true)).collect()
}

fn convert_step(step: &Step, background: bool) -> PickleStep {
    let mut converted = PickleStep::new(step.keyword.trim(), step.value.trim(), step.position.line);
    converted.docstring = step.docstring.clone();
    converted.table = step.table.as_ref().map(|t| t.rows.clone());
    converted.background = background;
    converted
}

/// 1-based lines of the table starting at `start`, header first.
///
/// Blank and comment lines inside the table are not rows.
fn table_row_lines(content: &str, start: usize) -> Vec<usize> {
    content
        .lines()
        .enumerate()
        .skip(start.saturating_sub(1))
        .map(|(i, line)| (i + 1, line.trim()))
        .take_while(|(_, line)| line.is_empty() || line.starts_with('#') || line.starts_with('|'))
        .filter(|(_, line)| line.starts_with('|'))
        .map(|(n, _)| n)
        .collect()
}

/// Replace `<name>` placeholders with example values in one pass.
///
/// Substituted values are never scanned again, so a value containing
/// `<other>` is kept literally.
fn substitute(text: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('>').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(header, _)| *header == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('<');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Strip any leading `@` so tags compare uniformly
fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim().trim_start_matches('@').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn merge_tags(base: &[String], extra: &[String]) -> Vec<String> {
    let mut merged = base.to_vec();
    for tag in extra {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
