//! Core data types for action primitives

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapflow_artifact_store::Artifact;
use snapflow_core_types::ActionId;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::ActionError;
use crate::waiting::WaitPolicy;

/// Execution context for action primitives
///
/// Carries the run's cancellation token, a fresh id per action for log
/// correlation, and the policy used when locating elements.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    /// Cancellation token for cooperative cancellation
    pub cancel_token: CancellationToken,

    /// Unique identifier for this action
    pub action_id: ActionId,

    /// How long primitives poll for an element before treating it as absent
    pub lookup: WaitPolicy,
}

impl ExecCtx {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            cancel_token,
            action_id: ActionId::new(),
            lookup: WaitPolicy::default(),
        }
    }

    pub fn with_lookup(mut self, lookup: WaitPolicy) -> Self {
        self.lookup = lookup;
        self
    }

    /// Same token and policy, new action id.
    pub fn fork(&self) -> Self {
        Self {
            cancel_token: self.cancel_token.clone(),
            action_id: ActionId::new(),
            lookup: self.lookup,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The target element was not on the page
    ElementAbsent,
    /// The provider cannot perform the interaction
    Unsupported,
    /// The desired state already held, nothing to do
    AlreadySatisfied,
    /// An optional action failed and was downgraded
    OptionalFailure,
    /// A conditional action's guard did not hold
    ConditionNotMet,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::ElementAbsent => "element absent",
            SkipReason::Unsupported => "unsupported by provider",
            SkipReason::AlreadySatisfied => "already satisfied",
            SkipReason::OptionalFailure => "optional action failed",
            SkipReason::ConditionNotMet => "condition not met",
        };
        f.write_str(text)
    }
}

/// Tri-state result of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Skipped { reason: SkipReason },
    Failed { error: ActionError },
}

impl Outcome {
    pub fn skipped(reason: SkipReason) -> Self {
        Outcome::Skipped { reason }
    }

    pub fn failed(error: ActionError) -> Self {
        Outcome::Failed { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn error(&self) -> Option<&ActionError> {
        match self {
            Outcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.error().map(ActionError::is_fatal).unwrap_or(false)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Skipped { reason } => write!(f, "skipped ({reason})"),
            Outcome::Failed { error } => write!(f, "failed ({error})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Navigate,
    SetValue,
    Invoke,
    ScrollIntoView,
    Hover,
    Capture,
    WaitFor,
    EnsureSelected,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Navigate => "navigate",
            PrimitiveKind::SetValue => "set_value",
            PrimitiveKind::Invoke => "invoke",
            PrimitiveKind::ScrollIntoView => "scroll_into_view",
            PrimitiveKind::Hover => "hover",
            PrimitiveKind::Capture => "capture",
            PrimitiveKind::WaitFor => "wait_for",
            PrimitiveKind::EnsureSelected => "ensure_selected",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when a primitive ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub action_id: ActionId,

    pub kind: PrimitiveKind,

    /// Selector, URL or artifact name the primitive acted on
    pub target: String,

    pub outcome: Outcome,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,

    pub latency_ms: u64,

    /// Set by a successful capture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

impl ActionReport {
    pub fn new(
        ctx: &ExecCtx,
        kind: PrimitiveKind,
        target: impl Into<String>,
        outcome: Outcome,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            action_id: ctx.action_id.clone(),
            kind,
            target: target.into(),
            outcome,
            started_at,
            finished_at: Utc::now(),
            latency_ms: elapsed.as_millis() as u64,
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Emits the completion event at a level that matches the outcome.
    pub(crate) fn log_completion(&self) {
        match &self.outcome {
            Outcome::Success => info!(
                action_id = %self.action_id,
                kind = %self.kind,
                target = %self.target,
                latency_ms = self.latency_ms,
                "{} completed successfully",
                self.kind
            ),
            Outcome::Skipped { reason } => info!(
                action_id = %self.action_id,
                kind = %self.kind,
                target = %self.target,
                reason = %reason,
                "{} skipped",
                self.kind
            ),
            Outcome::Failed { error } => warn!(
                action_id = %self.action_id,
                kind = %self.kind,
                target = %self.target,
                severity = error.severity(),
                error = %error,
                "{} failed",
                self.kind
            ),
        }
    }
}
