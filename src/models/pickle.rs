//! Executable scenario models
//!
//! A feature file compiles into a list of pickles: one per scenario, or one
//! per example row for scenario outlines. Background steps are already
//! merged in front of the scenario's own steps.

use std::fmt;
use std::sync::Arc;

/// Feature-level metadata shared by every pickle compiled from one file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureInfo {
    /// Path of the feature file as given by discovery
    pub uri: String,
    pub keyword: String,
    pub name: String,
    pub description: Option<String>,
    pub line: usize,
    /// Tags without the leading `@`
    pub tags: Vec<String>,
}

impl FeatureInfo {
    /// Stable identifier used by the JSON report
    pub fn id(&self) -> String {
        slugify(&self.name)
    }
}

/// A single step ready for execution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickleStep {
    /// Keyword exactly as written (`Given`, `And`, `*`, ...)
    pub keyword: String,
    /// Step text with outline placeholders substituted
    pub text: String,
    pub line: usize,
    pub docstring: Option<String>,
    pub table: Option<Vec<Vec<String>>>,
    /// True when the step came from a `Background:` block
    pub background: bool,
}

impl PickleStep {
    pub fn new(keyword: impl Into<String>, text: impl Into<String>, line: usize) -> Self {
        Self {
            keyword: keyword.into().trim().to_string(),
            text: text.into(),
            line,
            docstring: None,
            table: None,
            background: false,
        }
    }
}

impl fmt::Display for PickleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.text)
    }
}

/// A compiled, executable scenario
#[derive(Clone, Debug)]
pub struct Pickle {
    pub feature: Arc<FeatureInfo>,
    /// Name of the enclosing `Rule:` block, if any
    pub rule: Option<String>,
    pub keyword: String,
    pub name: String,
    pub description: Option<String>,
    /// Line of the `Scenario:` / `Scenario Outline:` header
    pub line: usize,
    /// Line of the example row this pickle was expanded from
    pub example_line: Option<usize>,
    /// Feature, rule, scenario and examples tags without `@`
    pub tags: Vec<String>,
    pub steps: Vec<PickleStep>,
}

impl Pickle {
    /// Line that identifies this pickle in `path:line` selectors and rerun files
    pub fn effective_line(&self) -> usize {
        self.example_line.unwrap_or(self.line)
    }

    /// `uri:line` of this pickle
    pub fn location(&self) -> String {
        format!("{}:{}", self.feature.uri, self.effective_line())
    }

    /// Stable identifier used by the JSON report
    pub fn id(&self) -> String {
        let mut id = format!("{};{}", self.feature.id(), slugify(&self.name));
        if let Some(row) = self.example_line {
            id.push_str(&format!(";{row}"));
        }
        id
    }

    /// Tags rendered with their `@` prefix
    pub fn display_tags(&self) -> Vec<String> {
        self.tags.iter().map(|t| format!("@{t}")).collect()
    }

    #[cfg(test)]
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim_start_matches('@');
        self.tags.iter().any(|t| t == tag)
    }
}

impl fmt::Display for Pickle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.keyword, self.name, self.location())
    }
}

/// Lowercase, dash-separated identifier
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}


#[cfg(test)]
mod tests {
    use super::fixtures::pickle;
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("User Login -- happy path!"), "user-login-happy-path");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_pickle_location_prefers_example_row() {
        let mut p = pickle("Adds numbers", &["api"], &["I add 1 and 2"]);
        assert_eq!(p.location(), "features/sample.feature:3");

        p.example_line = Some(12);
        assert_eq!(p.location(), "features/sample.feature:12");
        assert_eq!(p.id(), "sample;adds-numbers;12");
    }

    #[test]
    fn test_has_tag_accepts_prefixed_name() {
        let p = pickle("Tagged", &["@web"], &[]);
        assert!(p.has_tag("@web"));
        assert!(p.has_tag("web"));
        assert!(!p.has_tag("api"));
        assert_eq!(p.display_tags(), vec!["@web".to_string()]);
    }
}
