//! Configuration management module
//!
//! Layering, lowest to highest: built-in defaults, the YAML file, `SNAPFLOW_*`
//! environment variables, then command-line flags.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use action_flow::{types::validate_url, RunError, SequencerOptions};
use action_primitives::WaitPolicy;
use cdp_adapter::LaunchConfig;
use serde::{Deserialize, Serialize};
use snapflow_core_types::Viewport;
use tracing::warn;

pub const DEFAULT_APP_URL: &str =
    "https://christopher-m-castille.shinyapps.io/correlation-learning-app/";
pub const MIN_POLL_INTERVAL_MS: u64 = 50;
pub const MAX_POLL_INTERVAL_MS: u64 = 5_000;

pub const ENV_APP_URL: &str = "SNAPFLOW_APP_URL";
pub const ENV_OUTPUT_DIR: &str = "SNAPFLOW_OUTPUT_DIR";
pub const ENV_HEADLESS: &str = "SNAPFLOW_HEADLESS";
pub const ENV_CHROME: &str = "SNAPFLOW_CHROME";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target application URL used by the built-in scenarios
    pub app_url: String,

    /// Run directory for captures and the run report
    pub output_dir: PathBuf,

    /// Built-in scenario name or path to a scenario YAML file
    pub scenario: String,

    pub browser: BrowserSettings,

    pub wait: WaitSettings,

    pub publications: PublicationSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_url: DEFAULT_APP_URL.to_string(),
            output_dir: PathBuf::from("screenshots"),
            scenario: "guided".to_string(),
            browser: BrowserSettings::default(),
            wait: WaitSettings::default(),
            publications: PublicationSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub sandbox_disabled: bool,
    pub shared_memory_disabled: bool,
    pub gpu_disabled: bool,
    pub viewport: Viewport,
    pub debug_port: Option<u16>,
    pub executable: Option<PathBuf>,
    pub request_timeout_ms: u64,
    pub launch_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        let launch = LaunchConfig::default();
        Self {
            headless: launch.headless,
            sandbox_disabled: launch.sandbox_disabled,
            shared_memory_disabled: launch.shared_memory_disabled,
            gpu_disabled: launch.gpu_disabled,
            viewport: launch.viewport,
            debug_port: launch.debug_port,
            executable: launch.executable,
            request_timeout_ms: launch.request_timeout_ms,
            launch_timeout_ms: launch.launch_timeout_ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    pub poll_interval_ms: u64,
    pub readiness_timeout_ms: u64,
    /// How long primitives look for an element before treating it as absent
    pub element_timeout_ms: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            readiness_timeout_ms: 30_000,
            element_timeout_ms: 2_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationSettings {
    pub output_dir: PathBuf,
}

impl Default for PublicationSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("content/publication"),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Applies `SNAPFLOW_*` variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_APP_URL).filter(|v| !v.trim().is_empty()) {
            self.app_url = url.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            match parse_flag(&raw) {
                Some(flag) => self.browser.headless = flag,
                None => warn!(value = %raw, "ignoring unrecognised {ENV_HEADLESS}"),
            }
        }
        if let Some(chrome) = lookup(ENV_CHROME).filter(|v| !v.trim().is_empty()) {
            self.browser.executable = Some(PathBuf::from(chrome.trim()));
        }
    }

    /// Everything checked here fails before a browser is launched.
    pub fn validate(&self) -> Result<(), RunError> {
        validate_url(&self.app_url)?;
        self.browser
            .viewport
            .validate()
            .map_err(|err| RunError::Configuration(err.to_string()))?;

        let poll = self.wait.poll_interval_ms;
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&poll) {
            return Err(RunError::Configuration(format!(
                "poll interval {poll}ms outside {MIN_POLL_INTERVAL_MS}..={MAX_POLL_INTERVAL_MS}ms"
            )));
        }
        if self.wait.readiness_timeout_ms == 0 || self.wait.element_timeout_ms == 0 {
            return Err(RunError::Configuration(
                "wait timeouts must be positive".to_string(),
            ));
        }
        self.launch_config()
            .validate()
            .map_err(|err| RunError::Configuration(err.to_string()))
    }

    pub fn launch_config(&self) -> LaunchConfig {
        let browser = &self.browser;
        LaunchConfig {
            executable: browser.executable.clone(),
            headless: browser.headless,
            sandbox_disabled: browser.sandbox_disabled,
            shared_memory_disabled: browser.shared_memory_disabled,
            gpu_disabled: browser.gpu_disabled,
            viewport: browser.viewport,
            debug_port: browser.debug_port,
            user_data_dir: None,
            request_timeout_ms: browser.request_timeout_ms,
            launch_timeout_ms: browser.launch_timeout_ms,
        }
    }

    pub fn lookup_policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_millis(self.wait.element_timeout_ms),
            Duration::from_millis(self.wait.poll_interval_ms),
        )
    }

    pub fn sequencer_options(&self) -> SequencerOptions {
        SequencerOptions {
            launch: self.launch_config(),
            lookup: self.lookup_policy(),
            persist_report: true,
        }
    }
}
