//! Error taxonomy for runner configuration, parsing and execution
//!
//! `RunnerError` aborts a run before any scenario executes.
//! `ExecutionError` is recorded against a single step or hook and never
//! stops the remaining scenarios.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report '{plugin}' failed: {message}")]
    Report { plugin: String, message: String },
}

impl RunnerError {
    pub fn config(message: impl Into<String>) -> Self {
        RunnerError::Configuration(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunnerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn report(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        RunnerError::Report {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Per-step failure recorded in scenario results
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Undefined step: {step}")]
    Undefined { step: String },

    #[error("Ambiguous step: '{step}' matches {}", .patterns.join(", "))]
    Ambiguous { step: String, patterns: Vec<String> },

    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("Hook '{hook}' failed: {message}")]
    HookFailed { hook: String, message: String },

    #[error("Step '{step}' panicked: {message}")]
    Panicked { step: String, message: String },
}

pub type RunnerResult<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_names_step() {
        let err = ExecutionError::Undefined {
            step: "I have 3 cukes".to_string(),
        };
        assert_eq!(err.to_string(), "Undefined step: I have 3 cukes");
    }

    #[test]
    fn test_ambiguous_lists_patterns() {
        let err = ExecutionError::Ambiguous {
            step: "I wait".to_string(),
            patterns: vec!["I wait".to_string(), "I {word}".to_string()],
        };
        assert!(err.to_string().contains("I wait, I {word}"));
    }
}
