//! Run-level error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that end a run, or prevent it from starting.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RunError {
    /// Scenario or launch configuration rejected before a session exists
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The browser session could not be acquired
    #[error("Session launch failed: {0}")]
    Launch(String),

    /// The readiness anchor never appeared
    #[error("Readiness timeout: {0}")]
    ReadinessTimeout(String),

    /// The session failed mid-run
    #[error("Provider fault: {0}")]
    ProviderFault(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl RunError {
    /// Whether the error happened before any session was acquired.
    pub fn is_pre_session(&self) -> bool {
        matches!(self, RunError::Configuration(_) | RunError::Launch(_))
    }
}

impl From<action_primitives::ActionError> for RunError {
    fn from(err: action_primitives::ActionError) -> Self {
        match err {
            action_primitives::ActionError::Interrupted(_) => RunError::Cancelled,
            other => RunError::ProviderFault(other.to_string()),
        }
    }
}

impl From<cdp_adapter::AdapterError> for RunError {
    fn from(err: cdp_adapter::AdapterError) -> Self {
        match err.kind {
            cdp_adapter::AdapterErrorKind::InvalidConfig => {
                RunError::Configuration(err.to_string())
            }
            cdp_adapter::AdapterErrorKind::Launch => RunError::Launch(err.to_string()),
            _ => RunError::ProviderFault(err.to_string()),
        }
    }
}
