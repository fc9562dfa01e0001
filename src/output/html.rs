//! Self-contained HTML report

use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::path::PathBuf;

use super::{html_escape, write_report_file, Plugin};
use crate::error::RunnerResult;
use crate::models::{HookResult, RunReport, ScenarioResult, Status, StatusCounts, StepResult};

/// Render a run as a single HTML page with inline styles
pub fn render_html(report: &RunReport) -> String {
    let mut output = String::new();
    let title = format!("Cucumber Report - {}", report.runner);

    writeln!(
        output,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}
        h2 {{ color: #555; margin-top: 30px; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ padding: 8px 12px; text-align: left; border-bottom: 1px solid #ddd; }}
        th {{ background: #007bff; color: white; }}
        .stat-card {{ display: inline-block; background: #f8f9fa; padding: 20px; margin: 10px; border-radius: 8px; min-width: 150px; text-align: center; }}
        .stat-value {{ font-size: 24px; font-weight: bold; color: #007bff; }}
        .stat-label {{ color: #666; font-size: 14px; }}
        .scenario {{ border-left: 4px solid #ccc; margin: 16px 0; padding: 8px 16px; background: #fafafa; }}
        .scenario.passed {{ border-color: #28a745; }}
        .scenario.failed {{ border-color: #dc3545; }}
        .scenario.undefined, .scenario.ambiguous {{ border-color: #ffc107; }}
        .scenario.skipped {{ border-color: #17a2b8; }}
        .tag {{ color: #6f42c1; font-size: 12px; margin-right: 6px; }}
        .location {{ color: #999; font-size: 12px; }}
        .rule {{ color: #555; font-size: 13px; font-style: italic; }}
        .passed {{ color: #28a745; }}
        .failed {{ color: #dc3545; }}
        .undefined, .ambiguous {{ color: #c69500; }}
        .skipped {{ color: #17a2b8; }}
        ul.steps {{ list-style: none; padding-left: 8px; }}
        pre {{ background: #f1f1f1; padding: 8px; overflow-x: auto; }}
        pre.error {{ background: #fdecea; color: #a71d2a; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{}</h1>
        <p>Started {} &middot; finished {} &middot; {:.3}s</p>"#,
        html_escape(&title),
        html_escape(&title),
        format_datetime(&report.started_at),
        format_datetime(&report.finished_at),
        report.duration().as_secs_f64()
    )
    .ok();

    write_counts(&mut output, "Scenarios", &report.scenario_counts());
    write_counts(&mut output, "Steps", &report.step_counts());

    for (feature, scenarios) in report.by_feature() {
        writeln!(
            output,
            r#"        <h2>{}: {} <span class="location">{}</span></h2>"#,
            html_escape(&feature.keyword),
            html_escape(&feature.name),
            html_escape(&feature.uri)
        )
        .ok();
        if let Some(desc) = &feature.description {
            writeln!(output, "        <p>{}</p>", html_escape(desc)).ok();
        }
        for result in scenarios {
            write_scenario(&mut output, result);
        }
    }

    let snippets = report.snippets();
    if !snippets.is_empty() {
        writeln!(output, "        <h2>Missing step definitions</h2>").ok();
        for snippet in snippets {
            writeln!(output, "        <pre>{}</pre>", html_escape(snippet)).ok();
        }
    }

    writeln!(
        output,
        r#"    </div>
</body>
</html>"#
    )
    .ok();
    output
}

fn write_counts(output: &mut String, label: &str, counts: &StatusCounts) {
    writeln!(output, "        <h2>{label}</h2>").ok();
    writeln!(
        output,
        r#"        <div class="stat-card"><div class="stat-value">{}</div><div class="stat-label">total</div></div>"#,
        counts.total
    )
    .ok();
    writeln!(
        output,
        r#"        <div class="stat-card"><div class="stat-value">{:.1}%</div><div class="stat-label">pass rate</div></div>"#,
        counts.pass_rate()
    )
    .ok();
    for status in Status::all() {
        writeln!(
            output,
            r#"        <div class="stat-card"><div class="stat-value {}">{}</div><div class="stat-label">{}</div></div>"#,
            status,
            counts.get(status),
            status
        )
        .ok();
    }
}

fn write_scenario(output: &mut String, result: &ScenarioResult) {
    let pickle = &result.pickle;
    writeln!(output, r#"        <div class="scenario {}">"#, result.status).ok();

    if !pickle.tags.is_empty() {
        let tags: Vec<String> = pickle
            .display_tags()
            .iter()
            .map(|t| format!(r#"<span class="tag">{}</span>"#, html_escape(t)))
            .collect();
        writeln!(output, "            <div>{}</div>", tags.join("")).ok();
    }

    if let Some(rule) = &pickle.rule {
        writeln!(output, r#"            <div class="rule">Rule: {}</div>"#, html_escape(rule)).ok();
    }

    writeln!(
        output,
        r#"            <h3><span class="{}">{}</span> {}: {} <span class="location">{}</span></h3>"#,
        result.status,
        result.status,
        html_escape(&pickle.keyword),
        html_escape(&pickle.name),
        html_escape(&pickle.location())
    )
    .ok();

    writeln!(output, r#"            <ul class="steps">"#).ok();
    for hook in &result.before {
        write_hook(output, hook);
    }
    for step in &result.steps {
        write_step(output, step);
    }
    for hook in &result.after {
        write_hook(output, hook);
    }
    writeln!(output, "            </ul>").ok();
    writeln!(output, "        </div>").ok();
}

fn write_step(output: &mut String, result: &StepResult) {
    writeln!(
        output,
        r#"                <li><span class="{}">{}</span> <b>{}</b> {} <span class="location">{}ms</span>"#,
        result.status,
        result.status,
        html_escape(&result.step.keyword),
        html_escape(&result.step.text),
        result.duration.as_millis()
    )
    .ok();

    if let Some(doc) = &result.step.docstring {
        writeln!(output, "                    <pre>{}</pre>", html_escape(doc)).ok();
    }
    if let Some(table) = &result.step.table {
        writeln!(output, "                    <table>").ok();
        for row in table {
            let cells: Vec<String> = row
                .iter()
                .map(|c| format!("<td>{}</td>", html_escape(c)))
                .collect();
            writeln!(output, "                        <tr>{}</tr>", cells.join("")).ok();
        }
        writeln!(output, "                    </table>").ok();
    }
    if let Some(err) = &result.error {
        writeln!(
            output,
            r#"                    <pre class="error">{}</pre>"#,
            html_escape(err)
        )
        .ok();
    }
    writeln!(output, "                </li>").ok();
}

fn write_hook(output: &mut String, hook: &HookResult) {
    writeln!(
        output,
        r#"                <li><span class="{}">{}</span> <i>{} hook '{}'</i>"#,
        hook.status,
        hook.status,
        hook.kind,
        html_escape(&hook.name)
    )
    .ok();
    if let Some(err) = &hook.error {
        writeln!(
            output,
            r#"                    <pre class="error">{}</pre>"#,
            html_escape(err)
        )
        .ok();
    }
    writeln!(output, "                </li>").ok();
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub struct HtmlPlugin {
    path: PathBuf,
}

impl HtmlPlugin {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Plugin for HtmlPlugin {
    fn name(&self) -> &str {
        "html"
    }

    fn on_run_finished(&mut self, report: &RunReport) -> RunnerResult<()> {
        write_report_file(&self.path, &render_html(report))
    }
}
