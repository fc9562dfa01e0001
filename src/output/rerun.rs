//! Rerun file: one `uri:line[:line...]` entry per file with non-passing scenarios
//!
//! The output can be fed straight back as feature roots.

use std::path::PathBuf;

use super::{write_report_file, Plugin};
use crate::error::RunnerResult;
use crate::models::RunReport;

pub fn render_rerun(report: &RunReport) -> String {
    let mut entries: Vec<(&str, Vec<usize>)> = Vec::new();
    for result in report.failures() {
        let uri = result.pickle.feature.uri.as_str();
        let line = result.pickle.effective_line();
        match entries.iter_mut().find(|(u, _)| *u == uri) {
            Some((_, lines)) => lines.push(line),
            None => entries.push((uri, vec![line])),
        }
    }

    entries
        .into_iter()
        .map(|(uri, lines)| {
            let lines: Vec<String> = lines.iter().map(usize::to_string).collect();
            format!("{}:{}\n", uri, lines.join(":"))
        })
        .collect()
}

pub struct RerunPlugin {
    path: PathBuf,
}

impl RerunPlugin {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Plugin for RerunPlugin {
    fn name(&self) -> &str {
        "rerun"
    }

    fn on_run_finished(&mut self, report: &RunReport) -> RunnerResult<()> {
        write_report_file(&self.path, &render_rerun(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result_fixtures::scenario;
    use crate::models::Status;
    use chrono::Utc;

    #[test]
    fn test_groups_lines_per_file() {
        let mut outline_row = scenario("row", &[Status::Failed]);
        outline_row.pickle.example_line = Some(14);

        let report = RunReport::new(
            "api",
            Utc::now(),
            vec![
                scenario("fine", &[Status::Passed]),
                scenario("broken", &[Status::Undefined]),
                outline_row,
            ],
        );
        assert_eq!(render_rerun(&report), "features/sample.feature:3:14\n");
    }

    #[test]
    fn test_skipped_is_not_rerun() {
        let report = RunReport::new("api", Utc::now(), vec![scenario("dry", &[Status::Skipped])]);
        assert_eq!(render_rerun(&report), "");
    }
}
