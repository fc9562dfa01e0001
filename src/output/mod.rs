//! Report plugins
//!
//! Every runner owns one `Reporter` that fans scenario results out to the
//! configured plugins. Plugins are declared as `name[:destination]`.

mod formatter;
mod html;
mod json;
mod rerun;

use formatter::{ConsolePlugin, ConsoleStyle};
use html::HtmlPlugin;
use json::JsonPlugin;
use rerun::RerunPlugin;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::models::{RunReport, ScenarioResult};

/// Known plugin names
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Pretty,
    Progress,
    Summary,
    Html,
    Json,
    Rerun,
}

impl PluginKind {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(PluginKind::Pretty),
            "progress" => Some(PluginKind::Progress),
            "summary" => Some(PluginKind::Summary),
            "html" => Some(PluginKind::Html),
            "json" => Some(PluginKind::Json),
            "rerun" => Some(PluginKind::Rerun),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PluginKind::Pretty => "pretty",
            PluginKind::Progress => "progress",
            PluginKind::Summary => "summary",
            PluginKind::Html => "html",
            PluginKind::Json => "json",
            PluginKind::Rerun => "rerun",
        }
    }

    pub fn all() -> Vec<PluginKind> {
        vec![
            PluginKind::Pretty,
            PluginKind::Progress,
            PluginKind::Summary,
            PluginKind::Html,
            PluginKind::Json,
            PluginKind::Rerun,
        ]
    }

    /// File plugins have no stdout default
    pub fn requires_destination(&self) -> bool {
        matches!(self, PluginKind::Html | PluginKind::Json | PluginKind::Rerun)
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed `name[:destination]` plugin declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginSpec {
    pub kind: PluginKind,
    pub destination: Option<PathBuf>,
}

impl PluginSpec {
    pub fn new(kind: PluginKind, destination: Option<PathBuf>) -> Self {
        Self { kind, destination }
    }
}

impl FromStr for PluginSpec {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, destination) = match s.split_once(':') {
            Some((name, dest)) => (name, Some(dest.trim())),
            None => (s, None),
        };

        let kind = PluginKind::from_name(name).ok_or_else(|| {
            RunnerError::config(format!(
                "Unknown plugin '{}'. Available: {}",
                name,
                PluginKind::all()
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;

        let destination = match destination {
            Some("") => {
                return Err(RunnerError::config(format!(
                    "Plugin '{name}' has an empty destination"
                )))
            }
            Some(dest) => Some(PathBuf::from(dest)),
            None if kind.requires_destination() => {
                return Err(RunnerError::config(format!(
                    "Plugin '{name}' requires a destination, e.g. {name}:reports/out.{name}"
                )))
            }
            None => None,
        };

        Ok(Self { kind, destination })
    }
}

impl fmt::Display for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.destination {
            Some(dest) => write!(f, "{}:{}", self.kind, dest.display()),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A report emitter
pub trait Plugin: Send {
    fn name(&self) -> &str;

    fn on_run_started(&mut self, _runner: &str) -> RunnerResult<()> {
        Ok(())
    }

    fn on_scenario_finished(&mut self, _result: &ScenarioResult) -> RunnerResult<()> {
        Ok(())
    }

    fn on_run_finished(&mut self, report: &RunReport) -> RunnerResult<()>;
}

/// Where console output goes
pub enum Sink {
    Stdout,
    /// Buffered, written once when the run finishes
    File { path: PathBuf, buffer: String },
}

impl Sink {
    pub fn for_destination(destination: Option<&Path>) -> Self {
        match destination {
            Some(path) => Sink::File {
                path: path.to_path_buf(),
                buffer: String::new(),
            },
            None => Sink::Stdout,
        }
    }

    pub fn write(&mut self, text: &str) -> RunnerResult<()> {
        match self {
            Sink::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes())
                    .and_then(|_| out.flush())
                    .map_err(|e| RunnerError::io("<stdout>", e))
            }
            Sink::File { buffer, .. } => {
                buffer.push_str(text);
                Ok(())
            }
        }
    }

    pub fn finish(&mut self) -> RunnerResult<()> {
        match self {
            Sink::Stdout => Ok(()),
            Sink::File { path, buffer } => write_report_file(path, buffer),
        }
    }
}

/// Write a report, creating parent directories as needed
pub fn write_report_file(path: &Path, content: &str) -> RunnerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RunnerError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| RunnerError::io(path, e))?;
    debug!("Wrote report {}", path.display());
    Ok(())
}

/// Fans results out to every configured plugin, in declaration order
pub struct Reporter {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Reporter {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn from_specs(specs: &[PluginSpec], monochrome: bool) -> Self {
        let plugins = specs
            .iter()
            .map(|spec| -> Box<dyn Plugin> {
                let dest = spec.destination.clone();
                match spec.kind {
                    PluginKind::Pretty | PluginKind::Progress | PluginKind::Summary => {
                        let style = match spec.kind {
                            PluginKind::Pretty => ConsoleStyle::Pretty,
                            PluginKind::Progress => ConsoleStyle::Progress,
                            _ => ConsoleStyle::Summary,
                        };
                        // Files never get colour codes
                        let colorize = !monochrome && dest.is_none();
                        Box::new(ConsolePlugin::new(style, colorize, dest))
                    }
                    PluginKind::Html => Box::new(HtmlPlugin::new(dest.unwrap_or_default())),
                    PluginKind::Json => Box::new(JsonPlugin::new(dest.unwrap_or_default())),
                    PluginKind::Rerun => Box::new(RerunPlugin::new(dest.unwrap_or_default())),
                }
            })
            .collect();
        Self::new(plugins)
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn run_started(&mut self, runner: &str) -> RunnerResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_run_started(runner)?;
        }
        Ok(())
    }

    pub fn scenario_finished(&mut self, result: &ScenarioResult) -> RunnerResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_scenario_finished(result)?;
        }
        Ok(())
    }

    /// Every plugin gets to finish even if an earlier one failed
    pub fn run_finished(&mut self, report: &RunReport) -> RunnerResult<()> {
        let mut first_error = None;
        for plugin in &mut self.plugins {
            if let Err(e) = plugin.on_run_finished(report) {
                tracing::error!("Plugin '{}' failed: {}", plugin.name(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Escape text for HTML element content and attribute values
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result_fixtures::scenario;
    use crate::models::Status;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_plugin_spec_parse() {
        let spec: PluginSpec = "pretty".parse().unwrap();
        assert_eq!(spec, PluginSpec::new(PluginKind::Pretty, None));

        let spec: PluginSpec = "json:reports/cucumber-api.json".parse().unwrap();
        assert_eq!(spec.kind, PluginKind::Json);
        assert_eq!(
            spec.destination,
            Some(PathBuf::from("reports/cucumber-api.json"))
        );
        assert_eq!(spec.to_string(), "json:reports/cucumber-api.json");

        let spec: PluginSpec = "HTML:out/r.html".parse().unwrap();
        assert_eq!(spec.kind, PluginKind::Html);
    }

    #[test]
    fn test_plugin_spec_errors() {
        for bad in ["xml:out.xml", "json", "html", "rerun", "json:"] {
            let err = bad.parse::<PluginSpec>().unwrap_err();
            assert!(
                matches!(err, RunnerError::Configuration(_)),
                "{bad} should be a configuration error"
            );
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_reporter_writes_every_file_plugin() {
        let dir = tempdir().unwrap();
        let specs: Vec<PluginSpec> = [
            format!("html:{}", dir.path().join("a/report.html").display()),
            format!("json:{}", dir.path().join("b/report.json").display()),
            format!("rerun:{}", dir.path().join("rerun.txt").display()),
            format!("pretty:{}", dir.path().join("pretty.txt").display()),
        ]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

        let mut reporter = Reporter::from_specs(&specs, false);
        assert_eq!(reporter.plugin_count(), 4);

        let results = vec![
            scenario("works", &[Status::Passed]),
            scenario("breaks", &[Status::Failed]),
        ];
        reporter.run_started("api").unwrap();
        for r in &results {
            reporter.scenario_finished(r).unwrap();
        }
        reporter
            .run_finished(&RunReport::new("api", Utc::now(), results))
            .unwrap();

        assert!(dir.path().join("a/report.html").exists());
        assert!(dir.path().join("b/report.json").exists());
        let rerun = std::fs::read_to_string(dir.path().join("rerun.txt")).unwrap();
        assert_eq!(rerun.trim(), "features/sample.feature:3");

        let pretty = std::fs::read_to_string(dir.path().join("pretty.txt")).unwrap();
        assert!(pretty.contains("breaks"));
        assert!(!pretty.contains("\x1b["), "file output must not be coloured");
    }
}
