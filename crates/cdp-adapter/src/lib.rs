//! Browser capability provider for snapflow.
//!
//! The sequencer never talks to Chromium directly. It drives the
//! [`BrowserProvider`] / [`BrowserSession`] / [`ElementHandle`] traits defined in
//! [`provider`], which this crate implements on top of the Chrome DevTools
//! Protocol ([`chromium`]) and, behind the `stub` feature, as a scripted
//! in-memory DOM for tests ([`stub`]).

use std::{env, path::PathBuf};
use which::which;

pub mod chromium;
pub mod provider;
#[cfg(any(test, feature = "stub"))]
pub mod stub;
mod util;

pub use chromium::ChromiumProvider;
pub use config::LaunchConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use provider::{BrowserProvider, BrowserSession, ElementHandle};

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the provider.
    #[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdapterErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("browser session disconnected")]
        Disconnected,
        #[error("target element not found")]
        TargetNotFound,
        #[error("operation not supported by provider")]
        Unsupported,
        #[error("script evaluation failed")]
        Script,
        #[error("element interaction failed")]
        Interaction,
        #[error("invalid launch configuration")]
        InvalidConfig,
        #[error("browser launch failed")]
        Launch,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        /// The session can no longer be trusted; callers must stop driving it.
        pub fn is_session_fault(&self) -> bool {
            matches!(
                self.kind,
                AdapterErrorKind::Disconnected | AdapterErrorKind::Launch
            )
        }

        pub fn is_target_gone(&self) -> bool {
            matches!(self.kind, AdapterErrorKind::TargetNotFound)
        }

        pub fn is_unsupported(&self) -> bool {
            matches!(self.kind, AdapterErrorKind::Unsupported)
        }
    }
}

pub mod config {
    use crate::error::{AdapterError, AdapterErrorKind};
    use serde::{Deserialize, Serialize};
    use snapflow_core_types::Viewport;
    use std::path::PathBuf;

    /// Launch options recognised by every provider.
    ///
    /// Engine flags are plain options rather than baked-in policy; the defaults
    /// match an unattended container run (headless, no sandbox, no /dev/shm, no GPU).
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct LaunchConfig {
        pub executable: Option<PathBuf>,
        pub headless: bool,
        pub sandbox_disabled: bool,
        pub shared_memory_disabled: bool,
        pub gpu_disabled: bool,
        pub viewport: Viewport,
        pub debug_port: Option<u16>,
        pub user_data_dir: Option<PathBuf>,
        pub request_timeout_ms: u64,
        pub launch_timeout_ms: u64,
    }

    impl Default for LaunchConfig {
        fn default() -> Self {
            Self {
                executable: None,
                headless: true,
                sandbox_disabled: true,
                shared_memory_disabled: true,
                gpu_disabled: true,
                viewport: Viewport::default(),
                debug_port: None,
                user_data_dir: None,
                request_timeout_ms: 30_000,
                launch_timeout_ms: 20_000,
            }
        }
    }

    impl LaunchConfig {
        pub fn validate(&self) -> Result<(), AdapterError> {
            self.viewport.validate().map_err(|err| {
                AdapterError::new(AdapterErrorKind::InvalidConfig).with_hint(err.to_string())
            })?;
            if self.debug_port == Some(0) {
                return Err(AdapterError::new(AdapterErrorKind::InvalidConfig)
                    .with_hint("debug_port must be between 1 and 65535"));
            }
            if self.request_timeout_ms == 0 || self.launch_timeout_ms == 0 {
                return Err(AdapterError::new(AdapterErrorKind::InvalidConfig)
                    .with_hint("timeouts must be positive"));
            }
            if let Some(path) = &self.executable {
                if !path.exists() {
                    return Err(AdapterError::new(AdapterErrorKind::InvalidConfig)
                        .with_hint(format!(
                            "chrome executable not found at {}; \
                             set SNAPFLOW_CHROME to the full path",
                            path.display()
                        )));
                }
            }
            Ok(())
        }

        /// Configured executable, falling back to discovery on the host.
        pub fn resolve_executable(&self) -> Option<PathBuf> {
            self.executable
                .clone()
                .or_else(crate::detect_chrome_executable)
        }

        /// Engine switches implied by the flags, in a stable order.
        pub fn engine_args(&self) -> Vec<String> {
            let mut args = Vec::new();
            if self.shared_memory_disabled {
                args.push("--disable-dev-shm-usage".to_string());
            }
            if self.gpu_disabled {
                args.push("--disable-gpu".to_string());
            }
            args.push(format!(
                "--window-size={},{}",
                self.viewport.width, self.viewport.height
            ));
            args.push("--no-first-run".to_string());
            args.push("--no-default-browser-check".to_string());
            if self.headless {
                args.push("--hide-scrollbars".to_string());
                args.push("--mute-audio".to_string());
            }
            args
        }
    }
}

/// Engine binaries looked up on `PATH`, most specific first.
const CHROME_BINARIES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Install locations that are usually not on `PATH`.
const CHROME_INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/chrome",
    "/snap/bin/chromium",
];

/// `SNAPFLOW_CHROME` when it points at a file, then `PATH`, then install paths.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    let from_env = env::var("SNAPFLOW_CHROME")
        .ok()
        .map(|raw| PathBuf::from(raw.trim()))
        .filter(|path| !path.as_os_str().is_empty() && path.is_file());

    from_env
        .or_else(|| CHROME_BINARIES.iter().find_map(|name| which(name).ok()))
        .or_else(|| {
            CHROME_INSTALL_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|path| path.is_file())
        })
}

#[cfg(test)]
mod tests {
    use super::config::LaunchConfig;
    use super::error::{AdapterError, AdapterErrorKind};
    use super::{detect_chrome_executable, CHROME_BINARIES};
    use serial_test::serial;
    use snapflow_core_types::Viewport;
    use std::env;

    #[test]
    fn executable_names_not_empty() {
        assert!(!CHROME_BINARIES.is_empty());
    }

    #[test]
    #[serial]
    fn env_override_wins_when_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake-chrome");
        std::fs::write(&fake, b"#!/bin/sh\n").unwrap();
        env::set_var("SNAPFLOW_CHROME", &fake);
        let detected = detect_chrome_executable();
        env::remove_var("SNAPFLOW_CHROME");
        assert_eq!(detected, Some(fake));
    }

    #[test]
    fn default_launch_config_is_valid() {
        let cfg = LaunchConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.headless);
        assert_eq!(cfg.viewport, Viewport::new(1920, 1080));
        let args = cfg.engine_args();
        assert!(args.contains(&"--disable-gpu".to_string()));
        assert!(args.contains(&"--disable-dev-shm-usage".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
    }

    #[test]
    fn invalid_launch_configs_are_rejected() {
        let mut cfg = LaunchConfig {
            viewport: Viewport::new(0, 600),
            ..LaunchConfig::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err().kind,
            AdapterErrorKind::InvalidConfig
        );

        cfg.viewport = Viewport::default();
        cfg.debug_port = Some(0);
        assert!(cfg.validate().is_err());

        cfg.debug_port = Some(9222);
        cfg.executable = Some("/definitely/not/here/chrome".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn session_fault_classification() {
        assert!(AdapterError::new(AdapterErrorKind::Disconnected).is_session_fault());
        assert!(AdapterError::new(AdapterErrorKind::Launch).is_session_fault());
        assert!(!AdapterError::new(AdapterErrorKind::TargetNotFound).is_session_fault());
        let err = AdapterError::new(AdapterErrorKind::Script).with_hint("boom");
        assert_eq!(err.to_string(), "script evaluation failed: boom");
    }
}
