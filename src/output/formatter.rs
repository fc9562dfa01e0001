//! Console formatters
//!
//! Pretty, progress and summary output for terminals or plain files.

use std::fmt::Write;
use std::path::PathBuf;

use super::{Plugin, Sink};
use crate::error::RunnerResult;
use crate::models::{FeatureInfo, PickleStep, RunReport, ScenarioResult, Status, StepResult};

/// Console plugin flavour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleStyle {
    Pretty,
    Progress,
    Summary,
}

/// Renders results as console text
pub struct ConsoleFormatter {
    colorize: bool,
}

impl ConsoleFormatter {
    pub fn new() -> Self {
        Self { colorize: true }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn paint(&self, status: Status, text: &str) -> String {
        if self.colorize {
            format!("\x1b[{}m{}\x1b[0m", status.ansi_color(), text)
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.colorize {
            format!("\x1b[90m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn format_feature(&self, feature: &FeatureInfo) -> String {
        let mut output = String::new();
        if !feature.tags.is_empty() {
            let tags: Vec<String> = feature.tags.iter().map(|t| format!("@{t}")).collect();
            writeln!(output, "{}", tags.join(" ")).ok();
        }
        writeln!(output, "{}: {}", feature.keyword, feature.name).ok();
        output
    }

    pub fn format_rule(&self, name: &str) -> String {
        format!("\n  Rule: {name}\n")
    }

    pub fn format_scenario(&self, result: &ScenarioResult) -> String {
        let mut output = String::new();
        let pickle = &result.pickle;

        writeln!(output).ok();
        if !pickle.tags.is_empty() {
            writeln!(output, "  {}", pickle.display_tags().join(" ")).ok();
        }
        let header = format!("{}: {}", pickle.keyword, pickle.name);
        writeln!(
            output,
            "  {}  {}",
            self.paint(result.status, &header),
            self.dim(&format!("# {}", pickle.location()))
        )
        .ok();

        for hook in result.before.iter().filter(|h| h.status != Status::Passed) {
            let line = format!("{} Before hook '{}'", hook.status.symbol(), hook.name);
            writeln!(output, "    {}", self.paint(hook.status, &line)).ok();
            if let Some(err) = &hook.error {
                self.write_error(&mut output, hook.status, err);
            }
        }

        for step in &result.steps {
            self.write_step(&mut output, step);
        }

        for hook in result.after.iter().filter(|h| h.status != Status::Passed) {
            let line = format!("{} After hook '{}'", hook.status.symbol(), hook.name);
            writeln!(output, "    {}", self.paint(hook.status, &line)).ok();
            if let Some(err) = &hook.error {
                self.write_error(&mut output, hook.status, err);
            }
        }

        output
    }

    fn write_step(&self, output: &mut String, result: &StepResult) {
        let line = format!(
            "{} {} {}",
            result.status.symbol(),
            result.step.keyword,
            result.step.text
        );
        match &result.matched {
            Some(pattern) => writeln!(
                output,
                "    {}  {}",
                self.paint(result.status, &line),
                self.dim(&format!("# {pattern}"))
            ),
            None => writeln!(output, "    {}", self.paint(result.status, &line)),
        }
        .ok();

        write_step_argument(output, &result.step);

        if let Some(err) = &result.error {
            self.write_error(output, result.status, err);
        }
    }

    fn write_error(&self, output: &mut String, status: Status, error: &str) {
        for line in error.lines() {
            writeln!(output, "      {}", self.paint(status, line)).ok();
        }
    }

    /// One character per step
    pub fn format_progress(&self, result: &ScenarioResult) -> String {
        let mut output = String::new();
        for hook in result.before.iter().filter(|h| h.status.is_failure()) {
            output.push_str(&self.paint(hook.status, &hook.status.progress_char().to_string()));
        }
        for step in &result.steps {
            output.push_str(&self.paint(step.status, &step.status.progress_char().to_string()));
        }
        for hook in result.after.iter().filter(|h| h.status.is_failure()) {
            output.push_str(&self.paint(hook.status, &hook.status.progress_char().to_string()));
        }
        output
    }

    /// Counters, failing scenarios and snippets
    pub fn format_summary(&self, report: &RunReport) -> String {
        let mut output = String::new();

        let failures: Vec<&ScenarioResult> = report.failures().collect();
        if !failures.is_empty() {
            writeln!(output, "\nFailing scenarios:").ok();
            for result in failures {
                writeln!(
                    output,
                    "  {} {}",
                    self.paint(result.status, &result.pickle.location()),
                    self.dim(&format!("# {}", result.pickle.name))
                )
                .ok();
            }
        }

        writeln!(output).ok();
        writeln!(
            output,
            "{} scenarios{}",
            report.scenario_counts().total,
            self.format_breakdown(&report.scenario_counts())
        )
        .ok();
        writeln!(
            output,
            "{} steps{}",
            report.step_counts().total,
            self.format_breakdown(&report.step_counts())
        )
        .ok();
        writeln!(output, "{:.3}s", report.duration().as_secs_f64()).ok();

        let snippets = report.snippets();
        if !snippets.is_empty() {
            writeln!(
                output,
                "\nYou can implement missing steps with the snippets below:\n"
            )
            .ok();
            for snippet in snippets {
                writeln!(output, "{}", self.paint(Status::Undefined, snippet)).ok();
                writeln!(output).ok();
            }
        }

        output
    }

    fn format_breakdown(&self, counts: &crate::models::StatusCounts) -> String {
        let parts: Vec<String> = Status::all()
            .iter()
            .filter(|s| counts.get(**s) > 0)
            .map(|s| self.paint(*s, &format!("{} {}", counts.get(*s), s)))
            .collect();
        if parts.is_empty() {
            String::new()
        } else {
            format!(" ({})", parts.join(", "))
        }
    }
}

impl Default for ConsoleFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_step_argument(output: &mut String, step: &PickleStep) {
    if let Some(doc) = &step.docstring {
        writeln!(output, "        \"\"\"").ok();
        for line in doc.lines() {
            writeln!(output, "        {line}").ok();
        }
        writeln!(output, "        \"\"\"").ok();
    }
    if let Some(table) = &step.table {
        let columns = table.iter().map(Vec::len).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|c| {
                table
                    .iter()
                    .filter_map(|row| row.get(c))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        for row in table {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{cell:<w$}"))
                .collect();
            writeln!(output, "        | {} |", cells.join(" | ")).ok();
        }
    }
}

/// Console plugin for `pretty`, `progress` and `summary`
pub struct ConsolePlugin {
    style: ConsoleStyle,
    formatter: ConsoleFormatter,
    sink: Sink,
    current_feature: Option<String>,
    current_rule: Option<String>,
}

impl ConsolePlugin {
    pub fn new(style: ConsoleStyle, colorize: bool, destination: Option<PathBuf>) -> Self {
        let formatter = if colorize {
            ConsoleFormatter::new()
        } else {
            ConsoleFormatter::new().no_color()
        };
        Self {
            style,
            formatter,
            sink: Sink::for_destination(destination.as_deref()),
            current_feature: None,
            current_rule: None,
        }
    }
}

impl Plugin for ConsolePlugin {
    fn name(&self) -> &str {
        match self.style {
            ConsoleStyle::Pretty => "pretty",
            ConsoleStyle::Progress => "progress",
            ConsoleStyle::Summary => "summary",
        }
    }

    fn on_scenario_finished(&mut self, result: &ScenarioResult) -> RunnerResult<()> {
        match self.style {
            ConsoleStyle::Pretty => {
                let feature = &result.pickle.feature;
                if self.current_feature.as_deref() != Some(feature.uri.as_str()) {
                    self.current_feature = Some(feature.uri.clone());
                    self.current_rule = None;
                    let header = self.formatter.format_feature(feature);
                    self.sink.write(&format!("\n{header}"))?;
                }
                if result.pickle.rule != self.current_rule {
                    self.current_rule = result.pickle.rule.clone();
                    if let Some(rule) = &self.current_rule {
                        let header = self.formatter.format_rule(rule);
                        self.sink.write(&header)?;
                    }
                }
                let text = self.formatter.format_scenario(result);
                self.sink.write(&text)
            }
            ConsoleStyle::Progress => {
                let text = self.formatter.format_progress(result);
                self.sink.write(&text)
            }
            ConsoleStyle::Summary => Ok(()),
        }
    }

    fn on_run_finished(&mut self, report: &RunReport) -> RunnerResult<()> {
        if self.style == ConsoleStyle::Progress {
            self.sink.write("\n")?;
        }
        let summary = self.formatter.format_summary(report);
        self.sink.write(&summary)?;
        self.sink.finish()
    }
}
