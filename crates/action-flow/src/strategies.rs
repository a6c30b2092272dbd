//! Outcome handling strategies

use action_primitives::{ActionError, Outcome, SkipReason};
use tracing::{debug, warn};

/// What the sequencer does after an action resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Continue with the next action of the step
    Proceed,

    /// Skip the remaining actions of the step, the run goes on
    StopStep,

    /// Release the session and end the run as aborted
    AbortRun,
}

/// Result of applying the policy to one action outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub disposition: Disposition,
}

impl Resolution {
    fn new(outcome: Outcome, disposition: Disposition) -> Self {
        Self {
            outcome,
            disposition,
        }
    }
}

/// Outcome policy trait
///
/// Turns what a primitive reported into what the step records, given whether
/// the action was declared optional.
pub trait OutcomePolicy: Send + Sync {
    fn resolve(&self, optional: bool, target: &str, outcome: Outcome) -> Resolution;
}

/// Default outcome policy implementation
///
/// - fatal errors and interruptions abort the run
/// - a required action whose element is absent fails with `ElementNotFound`
/// - any other failure of a required action stops its step
/// - failures of optional actions are downgraded to `Skipped`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOutcomePolicy;

impl DefaultOutcomePolicy {
    pub fn new() -> Self {
        Self
    }
}

impl OutcomePolicy for DefaultOutcomePolicy {
    fn resolve(&self, optional: bool, target: &str, outcome: Outcome) -> Resolution {
        match outcome {
            Outcome::Failed { error } if error.is_fatal() => {
                warn!(target = %target, error = %error, "provider fault, aborting run");
                Resolution::new(Outcome::failed(error), Disposition::AbortRun)
            }
            Outcome::Failed {
                error: error @ ActionError::Interrupted(_),
            } => Resolution::new(Outcome::failed(error), Disposition::AbortRun),
            Outcome::Failed { error } if optional => {
                debug!(
                    target = %target,
                    error = %error,
                    "optional action failed, downgrading to skipped"
                );
                Resolution::new(
                    Outcome::skipped(SkipReason::OptionalFailure),
                    Disposition::Proceed,
                )
            }
            Outcome::Failed { error } => {
                warn!(target = %target, error = %error, "required action failed, stopping step");
                Resolution::new(Outcome::failed(error), Disposition::StopStep)
            }
            Outcome::Skipped {
                reason: SkipReason::ElementAbsent,
            } if !optional => {
                warn!(target = %target, "required element absent, stopping step");
                Resolution::new(
                    Outcome::failed(ActionError::ElementNotFound(target.to_string())),
                    Disposition::StopStep,
                )
            }
            Outcome::Skipped { reason } => {
                if optional && reason == SkipReason::ElementAbsent {
                    debug!(target = %target, "optional element absent");
                }
                Resolution::new(Outcome::skipped(reason), Disposition::Proceed)
            }
            Outcome::Success => Resolution::new(Outcome::Success, Disposition::Proceed),
        }
    }
}
