//! Run report rendering

use std::fmt::Write as _;

use action_primitives::Outcome;

use crate::types::{RunReport, StepRecord};

/// Step-level tally of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub steps: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub artifacts: usize,
}

impl Summary {
    pub fn of(report: &RunReport) -> Self {
        Self {
            steps: report.steps.len(),
            succeeded: report.count(Outcome::is_success),
            skipped: report.count(Outcome::is_skipped),
            failed: report.count(|o| matches!(o, Outcome::Failed { .. })),
            artifacts: report.artifacts().count(),
        }
    }
}

fn artifact_column(step: &StepRecord) -> String {
    if step.artifacts.is_empty() {
        "-".to_string()
    } else {
        step.artifacts
            .iter()
            .map(|a| a.file_path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Ordered `step -> outcome -> artifact` table for terminals and logs.
pub fn render_human(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Run {} ({}) against {}: {}",
        report.run_id, report.scenario, report.target_url, report.state
    );

    if report.steps.is_empty() {
        let _ = writeln!(out, "  no steps executed");
    } else {
        let width = report
            .steps
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(4)
            .max(4);
        let _ = writeln!(out, "  {:>2}  {:<width$}  {:<40}  artifact", "#", "step", "outcome");
        for (idx, step) in report.steps.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:>2}  {:<width$}  {:<40}  {}",
                idx + 1,
                step.name,
                step.outcome.to_string(),
                artifact_column(step)
            );
        }
    }

    let summary = Summary::of(report);
    let _ = writeln!(
        out,
        "Summary: {} steps, {} succeeded, {} skipped, {} failed; {} artifacts",
        summary.steps, summary.succeeded, summary.skipped, summary.failed, summary.artifacts
    );
    if let Some(reason) = &report.abort {
        let _ = writeln!(out, "Aborted: {reason}");
    }
    if let Some(err) = &report.release_error {
        let _ = writeln!(out, "Session release failed: {err}");
    }
    out
}

pub fn render_json(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RunError;
    use crate::types::{ActionRecord, Readiness, RunState, Scenario, Step};
    use action_primitives::{ActionError, SkipReason};
    use snapflow_core_types::{RunId, Selector};

    fn report() -> RunReport {
        let scenario = Scenario {
            name: "guided".into(),
            description: String::new(),
            target_url: "http://localhost:8080/".into(),
            readiness: Readiness {
                anchor: Selector::id("user_correlation"),
                timeout_ms: 1_000,
            },
            consent: None,
            steps: vec![Step::new("main", vec![])],
        };
        let mut report = RunReport::new(RunId("run-1".into()), &scenario);
        for (name, outcome) in [
            ("consent", Outcome::skipped(SkipReason::ElementAbsent)),
            ("main_interface", Outcome::Success),
            (
                "phase1",
                Outcome::failed(ActionError::ElementNotFound("id:submit_guess".into())),
            ),
        ] {
            let mut step = crate::types::StepRecord::new(name);
            step.push(ActionRecord {
                label: name.into(),
                optional: false,
                outcome,
                original: None,
                report: None,
                settled: None,
            });
            report.steps.push(step.finish());
        }
        report.transition(RunState::SessionAcquired);
        report.transition(RunState::Running);
        report.transition(RunState::Completed);
        report
    }

    #[test]
    fn human_report_lists_steps_in_order() {
        let text = render_human(&report());
        assert!(text.starts_with("Run run-1 (guided)"));
        let consent = text.find("consent").unwrap();
        let main = text.find("main_interface").unwrap();
        let phase1 = text.find("phase1").unwrap();
        assert!(consent < main && main < phase1);
        assert!(text.contains("skipped (element absent)"));
        assert!(text.contains("Summary: 3 steps, 1 succeeded, 1 skipped, 1 failed; 0 artifacts"));
        assert!(!text.contains("Aborted:"));
    }

    #[test]
    fn aborted_reason_is_shown() {
        let mut report = report();
        report.abort = Some(RunError::Cancelled);
        assert!(render_human(&report).contains("Aborted: Run cancelled"));
    }

    #[test]
    fn json_report_carries_state_and_outcomes() {
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&report()).unwrap()).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["steps"][0]["outcome"]["status"], "skipped");
        assert_eq!(json["steps"][2]["outcome"]["error"]["kind"], "element_not_found");
        assert_eq!(json["transitions"].as_array().unwrap().len(), 4);
    }
}
