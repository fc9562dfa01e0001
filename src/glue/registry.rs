//! Step definition registry
//!
//! Holds step definitions and scenario hooks contributed by glue
//! locations and resolves step text to exactly one definition.

use futures::future::BoxFuture;
use gherkin::tagexpr::TagOperation;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::expression::StepExpression;
use super::world::World;
use crate::error::RunnerResult;
use crate::features::{eval_tags, parse_tag_expression};
use crate::models::HookKind;

/// Future returned by step and hook handlers
pub type StepFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// Async step handler
pub type StepHandler =
    Arc<dyn for<'a> Fn(&'a mut World, StepContext) -> StepFuture<'a> + Send + Sync>;

/// Async hook handler
pub type HookHandler = Arc<dyn for<'a> Fn(&'a mut World) -> StepFuture<'a> + Send + Sync>;

/// Arguments handed to a step handler
#[derive(Clone, Debug, Default)]
pub struct StepContext {
    /// Full step text
    pub text: String,
    /// One value per pattern parameter
    pub args: Vec<String>,
    pub docstring: Option<String>,
    pub table: Option<Vec<Vec<String>>>,
}

impl StepContext {
    pub fn arg(&self, index: usize) -> anyhow::Result<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow::anyhow!("Step has no argument #{index}"))
    }

    /// Parse an argument into any `FromStr` type
    pub fn parse<T>(&self, index: usize) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.arg(index)?;
        raw.parse::<T>()
            .map_err(|e| anyhow::anyhow!("Cannot parse argument '{raw}': {e}"))
    }

    pub fn docstring(&self) -> anyhow::Result<&str> {
        self.docstring
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Step requires a doc string"))
    }

    pub fn table(&self) -> anyhow::Result<&[Vec<String>]> {
        self.table
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Step requires a data table"))
    }
}

/// A registered step definition
pub struct StepDefinition {
    pub expression: StepExpression,
    pub handler: StepHandler,
    /// Glue location that registered it
    pub location: String,
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("expression", &self.expression.source())
            .field("location", &self.location)
            .finish()
    }
}

/// A scenario hook
pub struct Hook {
    pub kind: HookKind,
    pub name: String,
    tags: Option<TagOperation>,
    pub handler: HookHandler,
}

impl Hook {
    /// Hooks without a tag expression apply to every scenario
    pub fn applies_to(&self, tags: &[String]) -> bool {
        self.tags.as_ref().map_or(true, |op| eval_tags(op, tags))
    }
}

/// Outcome of resolving a step against the registry
#[derive(Debug)]
pub enum StepMatch<'r> {
    Matched {
        definition: &'r StepDefinition,
        args: Vec<String>,
    },
    Undefined,
    Ambiguous(Vec<String>),
}

/// Step definitions and hooks for one run
#[derive(Default)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
    hooks: Vec<Hook>,
    location: String,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute subsequent registrations to a glue location
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    /// Register a step definition
    pub fn step<F>(&mut self, pattern: &str, handler: F) -> RunnerResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut World, StepContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        let expression = StepExpression::parse(pattern)?;
        debug!("Registered step '{}' from {}", pattern, self.location);
        self.steps.push(StepDefinition {
            expression,
            handler: Arc::new(handler),
            location: self.location.clone(),
        });
        Ok(self)
    }

    pub fn given<F>(&mut self, pattern: &str, handler: F) -> RunnerResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut World, StepContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.step(pattern, handler)
    }

    pub fn when<F>(&mut self, pattern: &str, handler: F) -> RunnerResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut World, StepContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.step(pattern, handler)
    }

    pub fn then<F>(&mut self, pattern: &str, handler: F) -> RunnerResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut World, StepContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.step(pattern, handler)
    }

    /// Register a hook, optionally restricted by a tag expression
    pub fn hook<F>(
        &mut self,
        kind: HookKind,
        name: &str,
        tags: Option<&str>,
        handler: F,
    ) -> RunnerResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut World) -> StepFuture<'a> + Send + Sync + 'static,
    {
        let tags = tags.map(parse_tag_expression).transpose()?;
        self.hooks.push(Hook {
            kind,
            name: name.to_string(),
            tags,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn before<F>(&mut self, name: &str, tags: Option<&str>, handler: F) -> RunnerResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut World) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.hook(HookKind::Before, name, tags, handler)
    }

    pub fn after<F>(&mut self, name: &str, tags: Option<&str>, handler: F) -> RunnerResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut World) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.hook(HookKind::After, name, tags, handler)
    }

    /// Resolve step text to exactly one definition
    pub fn find(&self, text: &str) -> StepMatch<'_> {
        let mut matches: Vec<(&StepDefinition, Vec<String>)> = self
            .steps
            .iter()
            .filter_map(|d| d.expression.captures(text).map(|args| (d, args)))
            .collect();

        match matches.len() {
            0 => StepMatch::Undefined,
            1 => {
                let (definition, args) = matches.remove(0);
                StepMatch::Matched { definition, args }
            }
            _ => StepMatch::Ambiguous(
                matches
                    .iter()
                    .map(|(d, _)| d.expression.source().to_string())
                    .collect(),
            ),
        }
    }

    /// Hooks of one kind that apply to the given tags, in registration order
    pub fn hooks_for(&self, kind: HookKind, tags: &[String]) -> Vec<&Hook> {
        self.hooks
            .iter()
            .filter(|h| h.kind == kind && h.applies_to(tags))
            .collect()
    }

    pub fn definitions(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
