//! Error types for action primitives

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reasons an action can resolve to.
///
/// Only [`ActionError::ProviderFault`] is fatal for a run; everything else is
/// contained by the step that owns the action.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ActionError {
    /// A required element could not be located
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The browser session itself failed (disconnect, crash, navigation failure)
    #[error("Provider fault: {0}")]
    ProviderFault(String),

    /// An explicit wait ran out of time
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// The captured frame could not be persisted
    #[error("Capture write failed: {0}")]
    CaptureWrite(String),

    /// The provider rejected an interaction with a located element
    #[error("Interaction failed: {0}")]
    Interaction(String),

    /// Operation was cancelled
    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ActionError {
    /// Whether the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionError::ProviderFault(_))
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::ProviderFault(_) => 3,
            ActionError::CaptureWrite(_) | ActionError::Interrupted(_) => 2,
            ActionError::ElementNotFound(_)
            | ActionError::WaitTimeout(_)
            | ActionError::Interaction(_) => 1,
            ActionError::InvalidInput(_) => 0,
        }
    }
}
