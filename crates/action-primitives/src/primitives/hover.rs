//! Hover primitive - move the virtual pointer over an element

use crate::{
    primitives::{locate, outcome_from_adapter},
    types::{ActionReport, ExecCtx, Outcome, PrimitiveKind},
};
use cdp_adapter::BrowserSession;
use chrono::Utc;
use snapflow_core_types::Selector;
use std::time::Instant;
use tracing::info;

/// Execute simulate_hover primitive
///
/// Providers that cannot move a pointer yield `Skipped(Unsupported)`.
pub async fn execute_simulate_hover(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    selector: &Selector,
) -> ActionReport {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        selector = %selector,
        "Executing simulate_hover primitive"
    );

    let outcome = match locate(ctx, session, selector).await {
        Ok(element) => match element.hover().await {
            Ok(()) => Outcome::Success,
            Err(err) => outcome_from_adapter(err),
        },
        Err(outcome) => outcome,
    };

    let report = ActionReport::new(
        ctx,
        PrimitiveKind::Hover,
        selector.to_string(),
        outcome,
        started_at,
        start_instant.elapsed(),
    );
    report.log_completion();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::test_support::*;
    use crate::types::SkipReason;
    use cdp_adapter::stub::StubDom;

    #[tokio::test]
    async fn hover_succeeds_on_capable_provider() {
        let plot = Selector::id("scatter_plot");
        let provider = provider(StubDom::new().with_element(&plot));
        let session = session_for(&provider).await;
        let report = execute_simulate_hover(&fast_ctx(), session.as_ref(), &plot).await;
        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(provider.hovers(), vec!["#scatter_plot"]);
    }

    #[tokio::test]
    async fn hover_without_pointer_support_is_skipped() {
        let plot = Selector::id("scatter_plot");
        let provider = provider(StubDom::new().with_element(&plot)).without_hover();
        let session = session_for(&provider).await;
        let report = execute_simulate_hover(&fast_ctx(), session.as_ref(), &plot).await;
        assert_eq!(report.outcome, Outcome::skipped(SkipReason::Unsupported));
    }
}
