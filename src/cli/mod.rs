pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod import;
pub mod inspect;
pub mod output;
pub mod run;
pub mod runtime;
pub mod scenario;

pub use import::{cmd_import_bib, ImportBibArgs};
pub use inspect::{cmd_inspect, execute_inspect, InspectArgs};
pub use run::{cmd_run, execute_run, RunArgs};
pub use scenario::{cmd_scenario, ScenarioArgs};
