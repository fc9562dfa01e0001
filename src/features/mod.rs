//! Feature loading pipeline
//!
//! Discovery, Gherkin compilation and scenario filtering.

mod discovery;
mod filter;
mod parser;

pub use filter::{eval_tags, parse_tag_expression, ScenarioFilter};

use discovery::discover;
use parser::compile_source;

use crate::error::RunnerResult;
use crate::models::Pickle;

/// Discover, compile and filter every scenario under the given roots.
///
/// Pickles come back in file order, then declaration order.
pub fn load_pickles(roots: &[String], filter: &ScenarioFilter) -> RunnerResult<Vec<Pickle>> {
    let sources = discover(roots)?;

    let mut pickles = Vec::new();
    for source in &sources {
        pickles.extend(compile_source(source)?);
    }

    Ok(filter.apply(pickles))
}
