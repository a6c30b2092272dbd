//! Scroll primitive - bring an element into the viewport

use crate::{
    primitives::{locate, outcome_from_adapter},
    types::{ActionReport, ExecCtx, Outcome, PrimitiveKind},
};
use cdp_adapter::BrowserSession;
use chrono::Utc;
use snapflow_core_types::Selector;
use std::time::Instant;
use tracing::info;

pub async fn execute_bring_into_view(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    selector: &Selector,
) -> ActionReport {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        selector = %selector,
        "Executing bring_into_view primitive"
    );

    let outcome = match locate(ctx, session, selector).await {
        Ok(element) => match element.scroll_into_view().await {
            Ok(()) => Outcome::Success,
            Err(err) => outcome_from_adapter(err),
        },
        Err(outcome) => outcome,
    };

    let report = ActionReport::new(
        ctx,
        PrimitiveKind::ScrollIntoView,
        selector.to_string(),
        outcome,
        started_at,
        start_instant.elapsed(),
    );
    report.log_completion();
    report
}
