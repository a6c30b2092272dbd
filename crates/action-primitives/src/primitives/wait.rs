//! Wait primitives - explicit waits and presence checks

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx, Outcome, PrimitiveKind},
    waiting::{wait_for_element, WaitOutcome},
};
use cdp_adapter::BrowserSession;
use chrono::Utc;
use snapflow_core_types::Selector;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Execute wait_for primitive
///
/// A timeout is an ordinary (non-fatal) failure; the caller decides whether it matters.
pub async fn execute_wait_for(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    selector: &Selector,
    timeout: Duration,
) -> ActionReport {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        selector = %selector,
        timeout_ms = timeout.as_millis() as u64,
        "Executing wait_for primitive"
    );

    let policy = ctx.lookup.with_timeout(timeout);
    let outcome = match wait_for_element(session, selector, &policy, &ctx.cancel_token).await {
        WaitOutcome::Satisfied { .. } => Outcome::Success,
        WaitOutcome::TimedOut {
            elapsed,
            last_error,
            ..
        } => {
            let mut detail = format!("{selector} not present after {}ms", elapsed.as_millis());
            if let Some(err) = last_error {
                detail.push_str(&format!(" (last error: {err})"));
            }
            Outcome::failed(ActionError::WaitTimeout(detail))
        }
        WaitOutcome::Cancelled { .. } => Outcome::failed(ActionError::Interrupted(format!(
            "wait for {selector} cancelled"
        ))),
        WaitOutcome::Faulted { error, .. } => Outcome::failed(ActionError::ProviderFault(error)),
    };

    let report = ActionReport::new(
        ctx,
        PrimitiveKind::WaitFor,
        selector.to_string(),
        outcome,
        started_at,
        start_instant.elapsed(),
    );
    report.log_completion();
    report
}

/// Single presence check. Lookup errors that leave the session usable read
/// as "absent"; session faults propagate.
pub async fn check_presence(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    selector: &Selector,
) -> Result<bool, ActionError> {
    match session.find_element(selector).await {
        Ok(found) => {
            debug!(
                action_id = %ctx.action_id,
                selector = %selector,
                present = found.is_some(),
                "Presence check"
            );
            Ok(found.is_some())
        }
        Err(err) if err.is_session_fault() => Err(ActionError::ProviderFault(err.to_string())),
        Err(err) => {
            debug!(
                action_id = %ctx.action_id,
                selector = %selector,
                error = %err,
                "Presence check failed, treating as absent"
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::test_support::*;
    use cdp_adapter::stub::StubDom;

    #[tokio::test]
    async fn wait_for_late_element_succeeds() {
        let feedback = Selector::id("feedback_text");
        let provider = provider(StubDom::new().with_late_element(&feedback, 2));
        let session = session_for(&provider).await;
        let report = execute_wait_for(
            &fast_ctx(),
            session.as_ref(),
            &feedback,
            Duration::from_millis(500),
        )
        .await;
        assert_eq!(report.outcome, Outcome::Success);
    }

    #[tokio::test]
    async fn wait_for_missing_element_times_out_non_fatally() {
        let provider = provider(StubDom::new());
        let session = session_for(&provider).await;
        let report = execute_wait_for(
            &fast_ctx(),
            session.as_ref(),
            &Selector::id("feedback_text"),
            Duration::from_millis(120),
        )
        .await;
        assert!(matches!(
            report.outcome.error(),
            Some(ActionError::WaitTimeout(_))
        ));
        assert!(!report.outcome.is_fatal());
    }

    #[tokio::test]
    async fn wait_for_cancelled_is_interrupted() {
        let provider = provider(StubDom::new());
        let session = session_for(&provider).await;
        let ctx = fast_ctx();
        ctx.cancel_token.cancel();
        let report = execute_wait_for(
            &ctx,
            session.as_ref(),
            &Selector::id("feedback_text"),
            Duration::from_secs(30),
        )
        .await;
        assert!(matches!(
            report.outcome.error(),
            Some(ActionError::Interrupted(_))
        ));
    }

    #[tokio::test]
    async fn presence_check_reports_faults() {
        let feedback = Selector::id("feedback_text");
        let provider = provider(StubDom::new().with_element(&feedback)).disconnect_after(2);
        let session = session_for(&provider).await;
        let ctx = fast_ctx();
        assert!(check_presence(&ctx, session.as_ref(), &feedback).await.unwrap());
        assert!(!check_presence(&ctx, session.as_ref(), &Selector::id("other")).await.unwrap());
        assert!(check_presence(&ctx, session.as_ref(), &feedback)
            .await
            .unwrap_err()
            .is_fatal());
    }
}
