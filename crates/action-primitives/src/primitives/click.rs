//! Click primitives - invoke an action control, or drive a toggle to a state

use crate::{
    errors::ActionError,
    primitives::{locate, outcome_from_adapter},
    types::{ActionReport, ExecCtx, Outcome, PrimitiveKind, SkipReason},
};
use cdp_adapter::{BrowserSession, ElementHandle};
use chrono::Utc;
use snapflow_core_types::Selector;
use std::time::Instant;
use tracing::{debug, info};

/// Execute invoke primitive
pub async fn execute_invoke(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    selector: &Selector,
) -> ActionReport {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        selector = %selector,
        "Executing invoke primitive"
    );

    let outcome = match locate(ctx, session, selector).await {
        Ok(element) => {
            debug!("Clicking element");
            match element.click().await {
                Ok(()) => Outcome::Success,
                Err(err) => outcome_from_adapter(err),
            }
        }
        Err(outcome) => outcome,
    };

    let report = ActionReport::new(
        ctx,
        PrimitiveKind::Invoke,
        selector.to_string(),
        outcome,
        started_at,
        start_instant.elapsed(),
    );
    report.log_completion();
    report
}

/// Execute ensure_selected primitive
///
/// Clicks only when the element's selected state differs from `desired`, then
/// confirms the state actually changed.
pub async fn execute_ensure_selected(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    selector: &Selector,
    desired: bool,
) -> ActionReport {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        selector = %selector,
        desired,
        "Executing ensure_selected primitive"
    );

    let outcome = match locate(ctx, session, selector).await {
        Ok(element) => toggle_to(element.as_ref(), selector, desired).await,
        Err(outcome) => outcome,
    };

    let report = ActionReport::new(
        ctx,
        PrimitiveKind::EnsureSelected,
        selector.to_string(),
        outcome,
        started_at,
        start_instant.elapsed(),
    );
    report.log_completion();
    report
}

async fn toggle_to(element: &dyn ElementHandle, selector: &Selector, desired: bool) -> Outcome {
    let current = match element.is_selected().await {
        Ok(current) => current,
        Err(err) => return outcome_from_adapter(err),
    };
    if current == desired {
        debug!(selected = current, "Toggle already in desired state");
        return Outcome::skipped(SkipReason::AlreadySatisfied);
    }
    if let Err(err) = element.click().await {
        return outcome_from_adapter(err);
    }
    match element.is_selected().await {
        Ok(now) if now == desired => Outcome::Success,
        Ok(_) => Outcome::failed(ActionError::Interaction(format!(
            "{selector} did not change selection state after click"
        ))),
        Err(err) => outcome_from_adapter(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::test_support::*;
    use cdp_adapter::stub::StubDom;

    #[tokio::test]
    async fn invoke_clicks_present_control() {
        let button = Selector::id("generate_plot");
        let provider = provider(StubDom::new().with_element(&button));
        let session = session_for(&provider).await;
        let report = execute_invoke(&fast_ctx(), session.as_ref(), &button).await;
        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(provider.clicks(), vec!["#generate_plot"]);
    }

    #[tokio::test]
    async fn invoke_absent_control_is_skipped() {
        let provider = provider(StubDom::new());
        let session = session_for(&provider).await;
        let report =
            execute_invoke(&fast_ctx(), session.as_ref(), &Selector::id("consent_yes")).await;
        assert_eq!(report.outcome, Outcome::skipped(SkipReason::ElementAbsent));
    }

    #[tokio::test]
    async fn rejected_click_is_an_interaction_failure() {
        let button = Selector::id("submit_guess");
        let provider = provider(StubDom::new().with_broken_click(&button));
        let session = session_for(&provider).await;
        let report = execute_invoke(&fast_ctx(), session.as_ref(), &button).await;
        assert!(matches!(
            report.outcome.error(),
            Some(ActionError::Interaction(_))
        ));
        assert!(!report.outcome.is_fatal());
    }

    #[tokio::test]
    async fn ensure_selected_clicks_only_when_needed() {
        let toggle = Selector::id("show_trendline");
        let provider = provider(StubDom::new().with_toggle(&toggle, false));
        let session = session_for(&provider).await;

        let first = execute_ensure_selected(&fast_ctx(), session.as_ref(), &toggle, true).await;
        assert_eq!(first.outcome, Outcome::Success);
        assert_eq!(provider.is_selected(&toggle), Some(true));

        let second = execute_ensure_selected(&fast_ctx(), session.as_ref(), &toggle, true).await;
        assert_eq!(second.outcome, Outcome::skipped(SkipReason::AlreadySatisfied));
        assert_eq!(provider.clicks().len(), 1);
    }
}
