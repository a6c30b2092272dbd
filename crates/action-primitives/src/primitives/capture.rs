//! Capture primitive - persist a viewport frame as a named artifact

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx, Outcome, PrimitiveKind},
};
use cdp_adapter::BrowserSession;
use chrono::Utc;
use snapflow_artifact_store::ArtifactStore;
use std::time::Instant;
use tracing::{debug, info};

/// Execute capture primitive
///
/// Always attempts the capture, whatever state the page is in. Fails only if
/// the provider errors or the frame cannot be written.
pub async fn execute_capture(
    store: &ArtifactStore,
    ctx: &ExecCtx,
    session: &dyn BrowserSession,
    artifact_name: &str,
) -> ActionReport {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        artifact = %artifact_name,
        "Executing capture primitive"
    );

    let (outcome, artifact) = match session.capture_frame().await {
        Ok(frame) => {
            debug!(bytes = frame.len(), "Frame captured");
            match store.save(artifact_name, &frame) {
                Ok(artifact) => (Outcome::Success, Some(artifact)),
                Err(err) => (
                    Outcome::failed(ActionError::CaptureWrite(format!(
                        "{artifact_name}: {err}"
                    ))),
                    None,
                ),
            }
        }
        Err(err) if err.is_session_fault() => (
            Outcome::failed(ActionError::ProviderFault(err.to_string())),
            None,
        ),
        Err(err) => (
            Outcome::failed(ActionError::Interaction(format!("capture failed: {err}"))),
            None,
        ),
    };

    let mut report = ActionReport::new(
        ctx,
        PrimitiveKind::Capture,
        artifact_name,
        outcome,
        started_at,
        start_instant.elapsed(),
    );
    if let Some(artifact) = artifact {
        report = report.with_artifact(artifact);
    }
    report.log_completion();
    report
}
