use clap::Subcommand;

use super::config::ConfigArgs;
use super::import::ImportBibArgs;
use super::inspect::InspectArgs;
use super::run::RunArgs;
use super::scenario::ScenarioArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Run a capture scenario against the target application
    Run(RunArgs),

    /// Load the application once and dump its screenshot, markup and controls
    Inspect(InspectArgs),

    /// List or print capture scenarios
    Scenario(ScenarioArgs),

    /// Convert a BibTeX file into publication pages
    ImportBib(ImportBibArgs),

    /// Inspect snapflow configuration
    Config(ConfigArgs),
}
