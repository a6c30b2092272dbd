use std::path::PathBuf;
use std::sync::Arc;

use action_flow::{render_human, render_json, RunReport, ScenarioRunner, Sequencer};
use anyhow::{Context, Result};
use cdp_adapter::{BrowserProvider, ChromiumProvider};
use clap::Args;
use snapflow_artifact_store::ArtifactStore;
use snapflow_core_types::Viewport;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::output::ReportFormat;
use crate::config::Config;
use crate::scenarios;

#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Built-in scenario name or scenario YAML file (defaults to the configured one)
    #[arg(short, long)]
    pub scenario: Option<String>,

    /// Target application URL
    #[arg(long)]
    pub url: Option<String>,

    /// Run directory for captures and the run report
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Expose the DevTools protocol on this port
    #[arg(long)]
    pub debug_port: Option<u16>,

    /// Viewport as WIDTHxHEIGHT, e.g. 1920x1080
    #[arg(long)]
    pub viewport: Option<Viewport>,

    /// Report format printed on stdout
    #[arg(long, value_enum, default_value = "human")]
    pub report: ReportFormat,
}

impl RunArgs {
    /// Command-line flags take precedence over file and environment values.
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.app_url = url.clone();
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if self.headful {
            config.browser.headless = false;
        }
        if let Some(port) = self.debug_port {
            config.browser.debug_port = Some(port);
        }
        if let Some(viewport) = self.viewport {
            config.browser.viewport = viewport;
        }
        if let Some(scenario) = &self.scenario {
            config.scenario = scenario.clone();
        }
    }
}

pub async fn cmd_run(args: RunArgs, config: &Config) -> Result<i32> {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping run");
            watcher.cancel();
        }
    });

    let format = args.report;
    let provider: Arc<dyn BrowserProvider> = Arc::new(ChromiumProvider::new());
    let report = execute_run(&args, config, provider, cancel).await?;

    let rendered = match format {
        ReportFormat::Human => render_human(&report),
        ReportFormat::Json => render_json(&report).context("serializing run report")?,
    };
    println!("{rendered}");
    Ok(report.exit_code())
}

/// Resolves configuration and scenario, then drives one run on `provider`.
///
/// Configuration problems and launch failures are errors; every run that got
/// a session comes back as a report, completed or aborted.
pub async fn execute_run(
    args: &RunArgs,
    config: &Config,
    provider: Arc<dyn BrowserProvider>,
    cancel: CancellationToken,
) -> Result<RunReport> {
    let mut config = config.clone();
    args.apply(&mut config);
    config.validate()?;

    let mut scenario = scenarios::resolve(&config.scenario, &config)?;
    if let Some(url) = &args.url {
        scenario.target_url = url.clone();
    }

    info!(
        scenario = %scenario.name,
        url = %scenario.target_url,
        out = %config.output_dir.display(),
        provider = provider.name(),
        "Starting capture run"
    );

    let store = Arc::new(ArtifactStore::new(&config.output_dir));
    let sequencer = Sequencer::new(provider, store, config.sequencer_options());
    let report = sequencer.run(&scenario, cancel).await?;
    Ok(report)
}
