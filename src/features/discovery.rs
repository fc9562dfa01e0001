//! Feature file discovery
//!
//! Resolves configured feature roots into an ordered, de-duplicated list of
//! `.feature` files, keeping any `path:LINE` selectors.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};

/// Feature file extension
const FEATURE_EXT: &str = "feature";

/// One feature file to compile, with optional line selectors
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureSource {
    pub path: PathBuf,
    /// Lines selecting scenarios or example rows; empty selects everything
    pub lines: Vec<usize>,
}

impl FeatureSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
        }
    }

    pub fn uri(&self) -> String {
        self.path.display().to_string().replace('\\', "/")
    }

    pub fn selects_all(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Split `path:12:40` into the path and its line selectors
pub fn split_line_selectors(root: &str) -> (String, Vec<usize>) {
    let mut path = root;
    let mut lines = Vec::new();

    while let Some((head, tail)) = path.rsplit_once(':') {
        match tail.parse::<usize>() {
            Ok(line) if !head.is_empty() => {
                lines.push(line);
                path = head;
            }
            _ => break,
        }
    }

    lines.reverse();
    (path.to_string(), lines)
}

/// Enumerate every feature file under the given roots.
///
/// Directories are searched recursively and their files sorted by path.
/// A root that does not exist is a configuration error.
pub fn discover(roots: &[String]) -> RunnerResult<Vec<FeatureSource>> {
    let mut sources: Vec<FeatureSource> = Vec::new();

    for root in roots {
        let (path, lines) = split_line_selectors(root);
        let path = PathBuf::from(path);

        if !path.exists() {
            return Err(RunnerError::config(format!(
                "Feature root does not exist: {}",
                path.display()
            )));
        }

        let files = if path.is_dir() {
            if !lines.is_empty() {
                return Err(RunnerError::config(format!(
                    "Line selectors only apply to files, not directories: {root}"
                )));
            }
            feature_files_in(&path)?
        } else {
            vec![path]
        };

        for file in files {
            merge_source(&mut sources, file, &lines);
        }
    }

    debug!("Discovered {} feature file(s)", sources.len());
    Ok(sources)
}

fn merge_source(sources: &mut Vec<FeatureSource>, file: PathBuf, lines: &[usize]) {
    match sources.iter_mut().find(|s| s.path == file) {
        Some(existing) => {
            // An unrestricted occurrence wins over line selectors
            if existing.selects_all() {
                return;
            }
            if lines.is_empty() {
                existing.lines.clear();
            } else {
                for line in lines {
                    if !existing.lines.contains(line) {
                        existing.lines.push(*line);
                    }
                }
            }
        }
        None => sources.push(FeatureSource {
            path: file,
            lines: lines.to_vec(),
        }),
    }
}

/// Recursively list `*.feature` files under a directory, sorted by path
fn feature_files_in(dir: &Path) -> RunnerResult<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&dir.display().to_string());
    let pattern = format!("{}/**/*.{FEATURE_EXT}", base.trim_end_matches('/'));

    let entries = glob::glob(&pattern).map_err(|e| {
        RunnerError::config(format!("Invalid feature root '{}': {e}", dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            RunnerError::io(path, e.into())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
