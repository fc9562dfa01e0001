//! Scenario execution engine
//!
//! Runs the scenarios selected by a runner manifest, sequentially or with
//! bounded, order-preserving concurrency.

mod parallel;
mod runner;
mod scenario;

pub use runner::{Runner, RunnerOutcome, Suite};
