//! Set-value primitive - assign a control's value through script

use crate::{
    primitives::{locate, outcome_from_adapter},
    types::{ActionReport, ExecCtx, Outcome, PrimitiveKind},
};
use cdp_adapter::BrowserSession;
use chrono::Utc;
use snapflow_core_types::Selector;
use std::time::Instant;
use tracing::{debug, info};

/// Execute set_control_value primitive
///
/// Writes the value property directly (no simulated keystrokes) and lets the
/// provider fire `input`/`change` so the application reacts as if typed.
pub async fn execute_set_control_value(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    selector: &Selector,
    value: &str,
) -> ActionReport {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        selector = %selector,
        value = %value,
        "Executing set_control_value primitive"
    );

    let outcome = match locate(ctx, session, selector).await {
        Ok(element) => {
            debug!("Assigning control value");
            match element.set_attribute_or_value("value", value).await {
                Ok(()) => Outcome::Success,
                Err(err) => outcome_from_adapter(err),
            }
        }
        Err(outcome) => outcome,
    };

    let report = ActionReport::new(
        ctx,
        PrimitiveKind::SetValue,
        selector.to_string(),
        outcome,
        started_at,
        start_instant.elapsed(),
    );
    report.log_completion();
    report
}
