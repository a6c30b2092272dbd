//! Navigate primitive - load the target URL

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx, Outcome, PrimitiveKind},
};
use cdp_adapter::BrowserSession;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

/// Execute navigate primitive
///
/// Unlike the element primitives, any provider error here is a
/// `ProviderFault`: nothing later in the run can be trusted without a loaded
/// document.
pub async fn execute_navigate(
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    url: &str,
) -> ActionReport {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        url = %url,
        "Executing navigate primitive"
    );

    let outcome = if url.trim().is_empty() {
        Outcome::failed(ActionError::InvalidInput("URL cannot be empty".to_string()))
    } else if ctx.is_cancelled() {
        Outcome::failed(ActionError::Interrupted("Context cancelled".to_string()))
    } else {
        debug!("Issuing navigation");
        match session.navigate(url).await {
            Ok(()) => Outcome::Success,
            Err(err) => Outcome::failed(ActionError::ProviderFault(format!(
                "navigation to {url} failed: {err}"
            ))),
        }
    };

    let report = ActionReport::new(
        ctx,
        PrimitiveKind::Navigate,
        url,
        outcome,
        started_at,
        start_instant.elapsed(),
    );
    report.log_completion();
    report
}
