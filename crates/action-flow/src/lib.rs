//! Scenario sequencing layer
//!
//! Drives an ordered list of named steps against one exclusively owned
//! browser session: acquire, navigate, wait for readiness, run every step with
//! partial-failure containment, release on every exit path, and report.

pub mod errors;
pub mod executor;
pub mod report;
pub mod strategies;
pub mod types;

pub use errors::RunError;
pub use executor::{ScenarioRunner, Sequencer, SequencerOptions, REPORT_FILE};
pub use report::{render_human, render_json, Summary};
pub use strategies::{DefaultOutcomePolicy, Disposition, OutcomePolicy, Resolution};
pub use types::{
    Action, ActionRecord, ActionSpec, Readiness, RunReport, RunState, Scenario, Settle, Step,
    StepRecord,
};
