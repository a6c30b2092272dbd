//! Action primitives implementation
//!
//! Every primitive is total: it always returns an [`ActionReport`], and an
//! absent element becomes `Skipped` rather than an error. Only provider-level
//! faults surface as a fatal `Failed(ProviderFault)`.
//!
//! 1. navigate - load the target URL
//! 2. set_control_value - assign a control's value through script
//! 3. invoke / ensure_selected - click, or click only when the state differs
//! 4. bring_into_view - scroll an element into the viewport
//! 5. simulate_hover - move the virtual pointer over an element
//! 6. capture - persist a viewport frame as a named artifact
//! 7. wait_for / element_present - explicit waits and presence checks

mod capture;
mod click;
mod hover;
mod navigate;
mod scroll;
mod set_value;
mod wait;

pub use capture::*;
pub use click::*;
pub use hover::*;
pub use navigate::*;
pub use scroll::*;
pub use set_value::*;
pub use wait::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{AdapterError, BrowserSession, ElementHandle};
use snapflow_artifact_store::ArtifactStore;
use snapflow_core_types::Selector;

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx, Outcome, SkipReason},
    waiting::{wait_for_element, WaitOutcome},
};

/// Action primitives trait
///
/// The session is borrowed per call; it stays exclusively owned by whoever
/// drives the run.
#[async_trait]
pub trait ActionPrimitives: Send + Sync {
    async fn navigate(&self, ctx: &ExecCtx, session: &dyn BrowserSession, url: &str)
        -> ActionReport;

    async fn set_control_value(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
        value: &str,
    ) -> ActionReport;

    async fn invoke(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
    ) -> ActionReport;

    async fn bring_into_view(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
    ) -> ActionReport;

    async fn simulate_hover(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
    ) -> ActionReport;

    async fn capture(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        artifact_name: &str,
    ) -> ActionReport;

    async fn wait_for(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
        timeout: Duration,
    ) -> ActionReport;

    async fn ensure_selected(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
        desired: bool,
    ) -> ActionReport;

    /// Single, non-waiting presence check.
    async fn element_present(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
    ) -> Result<bool, ActionError>;
}

/// Default implementation of action primitives
pub struct DefaultActionPrimitives {
    store: Arc<ArtifactStore>,
}

impl DefaultActionPrimitives {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }
}

#[async_trait]
impl ActionPrimitives for DefaultActionPrimitives {
    async fn navigate(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        url: &str,
    ) -> ActionReport {
        execute_navigate(ctx, session, url).await
    }

    async fn set_control_value(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
        value: &str,
    ) -> ActionReport {
        execute_set_control_value(ctx, session, selector, value).await
    }

    async fn invoke(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
    ) -> ActionReport {
        execute_invoke(ctx, session, selector).await
    }

    async fn bring_into_view(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
    ) -> ActionReport {
        execute_bring_into_view(ctx, session, selector).await
    }

    async fn simulate_hover(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
    ) -> ActionReport {
        execute_simulate_hover(ctx, session, selector).await
    }

    async fn capture(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        artifact_name: &str,
    ) -> ActionReport {
        execute_capture(&self.store, ctx, session, artifact_name).await
    }

    async fn wait_for(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
        timeout: Duration,
    ) -> ActionReport {
        execute_wait_for(ctx, session, selector, timeout).await
    }

    async fn ensure_selected(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
        desired: bool,
    ) -> ActionReport {
        execute_ensure_selected(ctx, session, selector, desired).await
    }

    async fn element_present(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
    ) -> Result<bool, ActionError> {
        check_presence(ctx, session, selector).await
    }
}

/// Classifies a provider error raised while acting on a located element.
pub(crate) fn outcome_from_adapter(err: AdapterError) -> Outcome {
    if err.is_session_fault() {
        Outcome::failed(ActionError::ProviderFault(err.to_string()))
    } else if err.is_target_gone() {
        Outcome::skipped(SkipReason::ElementAbsent)
    } else if err.is_unsupported() {
        Outcome::skipped(SkipReason::Unsupported)
    } else {
        Outcome::failed(ActionError::Interaction(err.to_string()))
    }
}

/// Locates `selector` within the context's lookup policy. `Err` carries the
/// outcome the primitive should report without going further.
pub(crate) async fn locate(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    selector: &Selector,
) -> Result<Box<dyn ElementHandle>, Outcome> {
    match wait_for_element(session, selector, &ctx.lookup, &ctx.cancel_token).await {
        WaitOutcome::Satisfied { value, .. } => Ok(value),
        WaitOutcome::TimedOut { .. } => Err(Outcome::skipped(SkipReason::ElementAbsent)),
        WaitOutcome::Cancelled { .. } => Err(Outcome::failed(ActionError::Interrupted(
            format!("lookup of {selector} cancelled"),
        ))),
        WaitOutcome::Faulted { error, .. } => {
            Err(Outcome::failed(ActionError::ProviderFault(error)))
        }
    }
}
