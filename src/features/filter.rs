//! Scenario selection by tag expression and name
//!
//! Tag expressions use the Cucumber syntax (`@a and not (@b or @c)`) and are
//! parsed by `gherkin::tagexpr`.

use gherkin::tagexpr::TagOperation;
use regex::Regex;
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::models::Pickle;

/// Parse a tag expression, rejecting malformed input as a configuration error
pub fn parse_tag_expression(expr: &str) -> RunnerResult<TagOperation> {
    expr.trim()
        .parse::<TagOperation>()
        .map_err(|e| RunnerError::config(format!("Invalid tag expression '{expr}': {e}")))
}

/// Combined tag and name filter
pub struct ScenarioFilter {
    tags: Option<TagOperation>,
    tag_source: Option<String>,
    names: Vec<Regex>,
}

impl ScenarioFilter {
    /// Filter that retains everything
    pub fn all() -> Self {
        Self {
            tags: None,
            tag_source: None,
            names: Vec::new(),
        }
    }

    pub fn new(tags: Option<&str>, names: &[String]) -> RunnerResult<Self> {
        let tag_source = tags.map(str::trim).filter(|t| !t.is_empty());
        let tags = tag_source.map(parse_tag_expression).transpose()?;

        let names = names
            .iter()
            .map(|n| {
                Regex::new(n).map_err(|e| {
                    RunnerError::config(format!("Invalid scenario name pattern '{n}': {e}"))
                })
            })
            .collect::<RunnerResult<Vec<_>>>()?;

        Ok(Self {
            tags,
            tag_source: tag_source.map(str::to_string),
            names,
        })
    }

    pub fn matches_tags(&self, tags: &[String]) -> bool {
        match &self.tags {
            Some(op) => eval_tags(op, tags),
            None => true,
        }
    }

    pub fn matches(&self, pickle: &Pickle) -> bool {
        if !self.matches_tags(&pickle.tags) {
            return false;
        }
        self.names.is_empty() || self.names.iter().any(|re| re.is_match(&pickle.name))
    }

    pub fn apply(&self, pickles: Vec<Pickle>) -> Vec<Pickle> {
        let before = pickles.len();
        let kept: Vec<Pickle> = pickles.into_iter().filter(|p| self.matches(p)).collect();
        debug!(
            "Filter {:?} kept {}/{} scenario(s)",
            self.tag_source,
            kept.len(),
            before
        );
        kept
    }
}

/// Evaluate a tag expression against a scenario's tags.
///
/// Tags are compared without their `@` prefix on either side.
pub fn eval_tags(op: &TagOperation, tags: &[String]) -> bool {
    match op {
        TagOperation::And(left, right) => eval_tags(left, tags) && eval_tags(right, tags),
        TagOperation::Or(left, right) => eval_tags(left, tags) || eval_tags(right, tags),
        TagOperation::Not(inner) => !eval_tags(inner, tags),
        TagOperation::Tag(wanted) => {
            let wanted = wanted.trim_start_matches('@');
            tags.iter().any(|t| t.trim_start_matches('@') == wanted)
        }
    }
}
