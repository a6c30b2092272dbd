use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::Config;
use crate::scenarios::{self, BUILTIN};

#[derive(Args, Clone, Debug)]
pub struct ScenarioArgs {
    #[command(subcommand)]
    pub action: ScenarioAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ScenarioAction {
    /// List built-in scenarios
    List,

    /// Print a scenario as YAML, a starting point for custom scenario files
    Show {
        /// Built-in name or scenario file
        name: String,
    },
}

pub fn cmd_scenario(args: ScenarioArgs, config: &Config) -> Result<()> {
    match args.action {
        ScenarioAction::List => {
            for name in BUILTIN {
                if let Some(scenario) =
                    scenarios::builtin(name, &config.app_url, config.wait.readiness_timeout_ms)
                {
                    println!(
                        "{:<8} {} steps, {} captures  {}",
                        scenario.name,
                        scenario.ordered_steps().count(),
                        scenario.expected_artifacts().len(),
                        scenario.description
                    );
                }
            }
        }
        ScenarioAction::Show { name } => {
            let scenario = scenarios::resolve(&name, config)?;
            scenario.validate()?;
            print!("{}", serde_yaml::to_string(&scenario)?);
        }
    }
    Ok(())
}
