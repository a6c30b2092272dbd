use super::config::cmd_config;
use super::env::CliArgs;
use super::import::cmd_import_bib;
use super::inspect::cmd_inspect;
use super::run::cmd_run;
use super::scenario::cmd_scenario;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

/// Runs the selected subcommand and returns the process exit code.
pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<i32> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx.config()).await,
        Commands::Inspect(args) => cmd_inspect(args, ctx.config()).await.map(|()| 0),
        Commands::Scenario(args) => cmd_scenario(args, ctx.config()).map(|()| 0),
        Commands::ImportBib(args) => cmd_import_bib(args, ctx.config()).await.map(|()| 0),
        Commands::Config(args) => cmd_config(args, ctx).await.map(|()| 0),
    }
}
