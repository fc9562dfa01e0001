//! Data models for scenario execution
//!
//! Compiled pickles on the input side, step and scenario results on the
//! output side.

mod pickle;
mod test_result;

pub use pickle::{FeatureInfo, Pickle, PickleStep};
pub use test_result::{
    HookKind, HookResult, RunReport, ScenarioResult, Status, StatusCounts, StepResult,
};

#[cfg(test)]
pub(crate) use pickle::fixtures as pickle_fixtures;
#[cfg(test)]
pub(crate) use test_result::fixtures as result_fixtures;
