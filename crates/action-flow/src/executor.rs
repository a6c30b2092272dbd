//! Scenario sequencer implementation

use std::sync::Arc;
use std::time::Duration;

use action_primitives::{
    settle_delay, wait_for_element, ActionPrimitives, ActionReport, DefaultActionPrimitives,
    ExecCtx, Outcome, SkipReason, WaitOutcome, WaitPolicy,
};
use async_recursion::async_recursion;
use async_trait::async_trait;
use cdp_adapter::{AdapterErrorKind, BrowserProvider, BrowserSession, LaunchConfig};
use chrono::Utc;
use snapflow_artifact_store::ArtifactStore;
use snapflow_core_types::{RunId, Selector};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::RunError;
use crate::strategies::{DefaultOutcomePolicy, Disposition, OutcomePolicy};
use crate::types::*;

/// Stable name of the persisted run report inside the run directory.
pub const REPORT_FILE: &str = "run-report.json";

/// Scenario runner trait
#[async_trait]
pub trait ScenarioRunner: Send + Sync {
    /// Run a scenario from session acquisition to release.
    ///
    /// `Err` is only returned when no session could be acquired; every run
    /// that got a session yields a report, `Completed` or `Aborted`.
    async fn run(
        &self,
        scenario: &Scenario,
        cancel: CancellationToken,
    ) -> Result<RunReport, RunError>;

    /// Validate scenario structure
    fn validate(&self, scenario: &Scenario) -> Result<(), RunError>;
}

#[derive(Debug, Clone)]
pub struct SequencerOptions {
    /// Engine configuration for the session
    pub launch: LaunchConfig,

    /// Element lookup policy for primitives; its poll interval drives every wait
    pub lookup: WaitPolicy,

    /// Write `run-report.json` into the run directory when the run ends
    pub persist_report: bool,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            launch: LaunchConfig::default(),
            lookup: WaitPolicy::default(),
            persist_report: true,
        }
    }
}

/// Drives one scenario against one exclusively owned session.
pub struct Sequencer {
    provider: Arc<dyn BrowserProvider>,
    primitives: Arc<dyn ActionPrimitives>,
    store: Arc<ArtifactStore>,
    policy: Arc<dyn OutcomePolicy>,
    options: SequencerOptions,
}

impl Sequencer {
    /// Create a new sequencer with the default primitives and outcome policy
    pub fn new(
        provider: Arc<dyn BrowserProvider>,
        store: Arc<ArtifactStore>,
        options: SequencerOptions,
    ) -> Self {
        Self {
            provider,
            primitives: Arc::new(DefaultActionPrimitives::new(Arc::clone(&store))),
            store,
            policy: Arc::new(DefaultOutcomePolicy::new()),
            options,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn OutcomePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_primitives(mut self, primitives: Arc<dyn ActionPrimitives>) -> Self {
        self.primitives = primitives;
        self
    }

    pub fn options(&self) -> &SequencerOptions {
        &self.options
    }

    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, RunError> {
        self.provider
            .launch(&self.options.launch)
            .await
            .map_err(|err| match err.kind {
                AdapterErrorKind::InvalidConfig => RunError::Configuration(err.to_string()),
                _ => RunError::Launch(err.to_string()),
            })
    }

    /// Navigation, readiness and every step. Returns the abort reason, if any.
    async fn drive(
        &self,
        scenario: &Scenario,
        session: &dyn BrowserSession,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<(), RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }
        let ctx = ExecCtx::new(cancel.clone()).with_lookup(self.options.lookup);

        let navigation = self
            .primitives
            .navigate(&ctx.fork(), session, &scenario.target_url)
            .await;
        if let Outcome::Failed { error } = navigation.outcome {
            return Err(error.into());
        }

        self.await_readiness(&scenario.readiness, session, cancel)
            .await?;
        report.transition(RunState::Running);

        for step in scenario.ordered_steps() {
            if cancel.is_cancelled() {
                info!(step = %step.name, "cancellation requested, stopping before step");
                return Err(RunError::Cancelled);
            }
            let (record, abort) = self.run_step(&ctx, session, step).await;
            report.steps.push(record);
            if let Some(err) = abort {
                return Err(err);
            }
        }
        Ok(())
    }

    async fn await_readiness(
        &self,
        readiness: &Readiness,
        session: &dyn BrowserSession,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        let policy = self
            .options
            .lookup
            .with_timeout(Duration::from_millis(readiness.timeout_ms));
        info!(
            anchor = %readiness.anchor,
            timeout_ms = readiness.timeout_ms,
            "Waiting for application readiness"
        );

        match wait_for_element(session, &readiness.anchor, &policy, cancel).await {
            WaitOutcome::Satisfied { elapsed, .. } => {
                info!(
                    anchor = %readiness.anchor,
                    latency_ms = elapsed.as_millis() as u64,
                    "Application ready"
                );
                Ok(())
            }
            WaitOutcome::TimedOut {
                elapsed,
                last_error,
                ..
            } => {
                let mut reason = format!(
                    "{} not present after {}ms",
                    readiness.anchor,
                    elapsed.as_millis()
                );
                if let Some(err) = last_error {
                    reason.push_str(&format!(" (last error: {err})"));
                }
                Err(RunError::ReadinessTimeout(reason))
            }
            WaitOutcome::Cancelled { .. } => Err(RunError::Cancelled),
            WaitOutcome::Faulted { error, .. } => Err(RunError::ProviderFault(error)),
        }
    }

    async fn run_step(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        step: &Step,
    ) -> (StepRecord, Option<RunError>) {
        info!(step = %step.name, actions = step.actions.len(), "Executing step");
        let mut record = StepRecord::new(&step.name);
        let abort = self
            .run_actions(ctx, session, &step.actions, &mut record)
            .await
            .err();
        let record = record.finish();

        match &record.outcome {
            Outcome::Failed { error } => warn!(
                step = %record.name,
                latency_ms = record.latency_ms,
                error = %error,
                "Step failed"
            ),
            outcome => info!(
                step = %record.name,
                latency_ms = record.latency_ms,
                artifacts = record.artifacts.len(),
                outcome = %outcome,
                "Step completed"
            ),
        }
        (record, abort)
    }

    /// Runs `actions` in order. `Ok(StopStep)` means a required action failed.
    #[async_recursion]
    async fn run_actions(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        actions: &[ActionSpec],
        record: &mut StepRecord,
    ) -> Result<Disposition, RunError> {
        for spec in actions {
            if let Action::Unless {
                present,
                actions: nested,
            } = &spec.action
            {
                match self
                    .primitives
                    .element_present(&ctx.fork(), session, present)
                    .await
                {
                    Ok(true) => {
                        debug!(present = %present, "condition element present, skipping block");
                        record.push(ActionRecord {
                            label: spec.label(),
                            optional: spec.optional,
                            outcome: Outcome::skipped(SkipReason::ConditionNotMet),
                            original: None,
                            report: None,
                            settled: None,
                        });
                    }
                    Ok(false) => {
                        if self.run_actions(ctx, session, nested, record).await?
                            == Disposition::StopStep
                        {
                            return Ok(Disposition::StopStep);
                        }
                    }
                    Err(error) => {
                        let disposition = self.apply(
                            spec,
                            present.to_string(),
                            Outcome::failed(error),
                            None,
                            record,
                        )?;
                        if disposition == Disposition::StopStep {
                            return Ok(disposition);
                        }
                    }
                }
                continue;
            }

            let Some(report) = self.dispatch(&ctx.fork(), session, &spec.action).await else {
                continue;
            };
            let target = report.target.clone();
            let outcome = report.outcome.clone();
            let succeeded = outcome.is_success();

            let disposition = self.apply(spec, target, outcome, Some(report), record)?;
            if succeeded && !spec.settle.is_none() {
                let settled = self.settle(ctx, session, &spec.settle).await?;
                if let Some(last) = record.actions.last_mut() {
                    last.settled = Some(settled);
                }
            }
            if disposition == Disposition::StopStep {
                return Ok(disposition);
            }
        }
        Ok(Disposition::Proceed)
    }

    /// Resolves an outcome through the policy and records it.
    fn apply(
        &self,
        spec: &ActionSpec,
        target: String,
        outcome: Outcome,
        report: Option<ActionReport>,
        record: &mut StepRecord,
    ) -> Result<Disposition, RunError> {
        let resolution = self.policy.resolve(spec.optional, &target, outcome.clone());
        let original = (resolution.outcome != outcome).then_some(outcome);
        let disposition = resolution.disposition;
        let abort = match (&resolution.outcome, disposition) {
            (Outcome::Failed { error }, Disposition::AbortRun) => {
                Some(RunError::from(error.clone()))
            }
            (_, Disposition::AbortRun) => Some(RunError::ProviderFault(target.clone())),
            _ => None,
        };

        record.push(ActionRecord {
            label: spec.label(),
            optional: spec.optional,
            outcome: resolution.outcome,
            original,
            report,
            settled: None,
        });

        match abort {
            Some(err) => Err(err),
            None => Ok(disposition),
        }
    }

    /// Runs the primitive behind `action`. Conditional blocks are expanded by
    /// the caller and yield `None`.
    async fn dispatch(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        action: &Action,
    ) -> Option<ActionReport> {
        let primitives = &self.primitives;
        let report = match action {
            Action::Navigate { url } => primitives.navigate(ctx, session, url).await,
            Action::SetValue { selector, value } => {
                primitives
                    .set_control_value(ctx, session, selector, value)
                    .await
            }
            Action::Invoke { selector } => primitives.invoke(ctx, session, selector).await,
            Action::WaitFor {
                selector,
                timeout_ms,
            } => {
                primitives
                    .wait_for(ctx, session, selector, Duration::from_millis(*timeout_ms))
                    .await
            }
            Action::ScrollIntoView { selector } => {
                primitives.bring_into_view(ctx, session, selector).await
            }
            Action::Hover { selector } => primitives.simulate_hover(ctx, session, selector).await,
            Action::Capture { artifact } => primitives.capture(ctx, session, artifact).await,
            Action::Toggle { selector, selected } => {
                primitives
                    .ensure_selected(ctx, session, selector, *selected)
                    .await
            }
            Action::Unless { .. } => return None,
        };
        Some(report)
    }

    /// Lets the application catch up after a successful action.
    ///
    /// Returns whether the settle condition was observed; only cancellation
    /// and provider faults are errors.
    async fn settle(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        settle: &Settle,
    ) -> Result<bool, RunError> {
        match settle {
            Settle::None => Ok(true),
            Settle::Delay { ms } => {
                debug!(delay_ms = ms, "settling with fixed delay");
                if settle_delay(Duration::from_millis(*ms), &ctx.cancel_token).await {
                    Ok(true)
                } else {
                    Err(RunError::Cancelled)
                }
            }
            Settle::Until {
                selector,
                timeout_ms,
            } => self.settle_until(ctx, session, selector, *timeout_ms).await,
        }
    }

    async fn settle_until(
        &self,
        ctx: &ExecCtx,
        session: &dyn BrowserSession,
        selector: &Selector,
        timeout_ms: u64,
    ) -> Result<bool, RunError> {
        let policy = self
            .options
            .lookup
            .with_timeout(Duration::from_millis(timeout_ms));
        match wait_for_element(session, selector, &policy, &ctx.cancel_token).await {
            WaitOutcome::Satisfied { elapsed, .. } => {
                debug!(
                    selector = %selector,
                    latency_ms = elapsed.as_millis() as u64,
                    "settle condition observed"
                );
                Ok(true)
            }
            WaitOutcome::TimedOut { elapsed, .. } => {
                warn!(
                    selector = %selector,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "settle condition not observed, continuing"
                );
                Ok(false)
            }
            WaitOutcome::Cancelled { .. } => Err(RunError::Cancelled),
            WaitOutcome::Faulted { error, .. } => Err(RunError::ProviderFault(error)),
        }
    }

    async fn release(&self, session: &mut Box<dyn BrowserSession>, report: &mut RunReport) {
        match session.close().await {
            Ok(()) => debug!(run_id = %report.run_id, "session released"),
            Err(err) => {
                warn!(run_id = %report.run_id, error = %err, "session release failed");
                report.release_error = Some(err.to_string());
            }
        }
        report.release_attempted = true;
    }

    fn persist(&self, report: &RunReport) {
        if !self.options.persist_report {
            return;
        }
        match self.store.write_json(REPORT_FILE, report) {
            Ok(path) => debug!(path = %path.display(), "run report written"),
            Err(err) => warn!(error = %err, "failed to write run report"),
        }
    }
}

#[async_trait]
impl ScenarioRunner for Sequencer {
    async fn run(
        &self,
        scenario: &Scenario,
        cancel: CancellationToken,
    ) -> Result<RunReport, RunError> {
        self.validate(scenario)?;

        let mut report = RunReport::new(RunId::new(), scenario);
        info!(
            run_id = %report.run_id,
            scenario = %scenario.name,
            provider = self.provider.name(),
            steps = scenario.ordered_steps().count(),
            "Starting scenario run"
        );

        let mut session = self.acquire().await?;
        report.session_acquired = true;
        report.transition(RunState::SessionAcquired);

        let result = self
            .drive(scenario, session.as_ref(), &cancel, &mut report)
            .await;

        self.release(&mut session, &mut report).await;

        match result {
            Ok(()) => report.transition(RunState::Completed),
            Err(err) => {
                warn!(run_id = %report.run_id, reason = %err, "Run aborted");
                report.abort = Some(err);
                report.transition(RunState::Aborted);
            }
        }
        report.finished_at = Some(Utc::now());

        info!(
            run_id = %report.run_id,
            state = %report.state,
            steps = report.steps.len(),
            artifacts = report.artifacts().count(),
            "Scenario run finished"
        );
        self.persist(&report);
        Ok(report)
    }

    fn validate(&self, scenario: &Scenario) -> Result<(), RunError> {
        scenario.validate()?;
        self.options
            .launch
            .validate()
            .map_err(|err| RunError::Configuration(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::ActionError;
    use cdp_adapter::stub::{StubDom, StubProvider};

    fn sel(id: &str) -> Selector {
        Selector::id(id)
    }

    fn fast_options() -> SequencerOptions {
        SequencerOptions {
            lookup: WaitPolicy::new(Duration::from_millis(100), Duration::from_millis(50)),
            ..SequencerOptions::default()
        }
    }

    fn sequencer(provider: &StubProvider, dir: &std::path::Path) -> Sequencer {
        Sequencer::new(
            Arc::new(provider.clone()),
            Arc::new(ArtifactStore::new(dir)),
            fast_options(),
        )
    }

    fn scenario(steps: Vec<Step>) -> Scenario {
        Scenario {
            name: "test".into(),
            description: String::new(),
            target_url: "http://localhost:8080/".into(),
            readiness: Readiness {
                anchor: sel("user_correlation"),
                timeout_ms: 500,
            },
            consent: Some(Step::new(
                "consent",
                vec![ActionSpec::invoke(sel("consent_yes")).optional()],
            )),
            steps,
        }
    }

    fn app_dom() -> StubDom {
        StubDom::new()
            .with_elements(&[
                sel("user_correlation"),
                sel("generate_plot"),
                sel("submit_guess"),
            ])
            .reveal_on_click(&sel("submit_guess"), &sel("feedback_text"))
    }

    fn guess_step(name: &str, value: &str, artifact: &str) -> Step {
        Step::new(
            name,
            vec![
                ActionSpec::set_value(sel("user_correlation"), value),
                ActionSpec::invoke(sel("generate_plot")),
                ActionSpec::invoke(sel("submit_guess"))
                    .settle_until(sel("feedback_text"), 200),
                ActionSpec::capture(artifact),
            ],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn completes_with_ordered_artifacts_and_skipped_consent() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom());
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![
            Step::new("main", vec![ActionSpec::capture("01_main")]),
            guess_step("phase1", "0.65", "02_phase1"),
        ]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(
            report.transitions,
            vec![
                RunState::Idle,
                RunState::SessionAcquired,
                RunState::Running,
                RunState::Completed
            ]
        );
        let names: Vec<_> = report.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["consent", "main", "phase1"]);
        assert_eq!(
            report.steps[0].outcome,
            Outcome::skipped(SkipReason::ElementAbsent)
        );
        let artifacts: Vec<_> = report.artifacts().map(|a| a.name.as_str()).collect();
        assert_eq!(artifacts, vec!["01_main", "02_phase1"]);
        assert_eq!(report.steps[2].artifacts.len(), 1);
        assert_eq!(report.steps[2].actions[2].settled, Some(true));
        assert_eq!(
            provider.value_of(&sel("user_correlation")).as_deref(),
            Some("0.65")
        );
        assert_eq!(provider.launches(), 1);
        assert_eq!(provider.closes(), 1);
        assert!(report.release_attempted);
        assert_eq!(report.exit_code(), 0);
        assert!(dir.path().join(REPORT_FILE).is_file());
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_timeout_aborts_before_any_step() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(StubDom::new());
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![Step::new("main", vec![ActionSpec::capture("01_main")])]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        assert_eq!(report.state, RunState::Aborted);
        assert!(matches!(report.abort, Some(RunError::ReadinessTimeout(_))));
        assert!(report.steps.is_empty());
        assert!(!report.transitions.contains(&RunState::Running));
        assert_eq!(provider.captures(), 0);
        assert_eq!(provider.closes(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn required_failure_is_contained_to_its_step() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom());
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![
            Step::new(
                "broken",
                vec![
                    ActionSpec::invoke(sel("missing_button")),
                    ActionSpec::capture("01_broken"),
                ],
            ),
            Step::new("after", vec![ActionSpec::capture("02_after")]),
        ]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        let broken = &report.steps[1];
        assert_eq!(
            broken.outcome,
            Outcome::failed(ActionError::ElementNotFound("id:missing_button".into()))
        );
        assert_eq!(broken.actions.len(), 1, "capture after the failure is not attempted");
        assert_eq!(report.steps[2].outcome, Outcome::Success);
        let artifacts: Vec<_> = report.artifacts().map(|a| a.name.as_str()).collect();
        assert_eq!(artifacts, vec!["02_after"]);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_fault_mid_step_aborts_and_releases_once() {
        let dir = tempfile::tempdir().unwrap();
        // navigate + readiness lookup + consent lookups succeed, then the session drops
        let provider = StubProvider::new(app_dom()).disconnect_after(6);
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![
            guess_step("phase1", "0.65", "01_phase1"),
            Step::new("never", vec![ActionSpec::capture("02_never")]),
        ]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        assert_eq!(report.state, RunState::Aborted);
        assert!(matches!(report.abort, Some(RunError::ProviderFault(_))));
        assert!(report.steps.iter().all(|s| s.name != "never"));
        assert!(report
            .steps
            .last()
            .map(|s| s.outcome.is_fatal())
            .unwrap_or(false));
        assert_eq!(provider.closes(), 1);
        assert!(report.release_attempted);
    }

    #[tokio::test(start_paused = true)]
    async fn close_failure_is_recorded_without_changing_the_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom()).fail_close();
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![Step::new("main", vec![ActionSpec::capture("01_main")])]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert!(report.abort.is_none());
        assert!(report.release_attempted);
        assert!(report
            .release_error
            .as_deref()
            .map(|err| err.contains("stub close failed"))
            .unwrap_or(false));
        assert_eq!(provider.closes(), 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn capture_failure_fails_only_its_step() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom()).fail_capture();
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![
            Step::new("main", vec![ActionSpec::capture("01_main")]),
            Step::new(
                "guess",
                vec![ActionSpec::set_value(sel("user_correlation"), "0.30")],
            ),
        ]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        match &report.steps[1].outcome {
            Outcome::Failed {
                error: ActionError::Interaction(msg),
            } => assert!(msg.starts_with("capture failed: "), "{msg}"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(report.steps[1].artifacts.is_empty());
        assert_eq!(report.steps[2].outcome, Outcome::Success);
        assert_eq!(
            provider.value_of(&sel("user_correlation")).as_deref(),
            Some("0.30")
        );
        assert_eq!(report.artifacts().count(), 0);
        assert_eq!(provider.captures(), 0);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom()).fail_navigation();
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![Step::new("main", vec![ActionSpec::capture("01_main")])]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        assert_eq!(report.state, RunState::Aborted);
        assert!(matches!(report.abort, Some(RunError::ProviderFault(_))));
        assert_eq!(provider.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_and_configuration_errors_are_returned() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom()).fail_launch();
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![Step::new("main", vec![ActionSpec::capture("01_main")])]);
        assert!(matches!(
            seq.run(&scenario, CancellationToken::new()).await,
            Err(RunError::Launch(_))
        ));

        let healthy = StubProvider::new(app_dom());
        let seq = sequencer(&healthy, dir.path());
        let mut invalid = scenario.clone();
        invalid.steps.clear();
        assert!(matches!(
            seq.run(&invalid, CancellationToken::new()).await,
            Err(RunError::Configuration(_))
        ));
        assert_eq!(healthy.launches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_still_releases() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom());
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![Step::new("main", vec![ActionSpec::capture("01_main")])]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = seq.run(&scenario, cancel).await.unwrap();

        assert_eq!(report.state, RunState::Aborted);
        assert_eq!(report.abort, Some(RunError::Cancelled));
        assert_eq!(provider.closes(), 1);
        assert!(provider.navigations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn conditional_block_runs_only_without_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom());
        let seq = sequencer(&provider, dir.path());
        let regenerate = |name: &str| {
            Step::new(
                name,
                vec![ActionSpec::unless(
                    sel("feedback_text"),
                    vec![ActionSpec::invoke(sel("generate_plot"))],
                )],
            )
        };
        let scenario = scenario(vec![
            regenerate("before"),
            Step::new("guess", vec![ActionSpec::invoke(sel("submit_guess"))]),
            regenerate("after"),
        ]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        assert_eq!(report.steps[1].outcome, Outcome::Success);
        assert_eq!(
            report.steps[3].outcome,
            Outcome::skipped(SkipReason::ConditionNotMet)
        );
        let plot_clicks = provider
            .clicks()
            .iter()
            .filter(|css| css.as_str() == "#generate_plot")
            .count();
        assert_eq!(plot_clicks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_timeout_is_recorded_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom());
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![Step::new(
            "plot",
            vec![
                ActionSpec::invoke(sel("generate_plot")).settle_until(sel("never_rendered"), 200),
                ActionSpec::capture("01_plot"),
            ],
        )]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        let step = &report.steps[1];
        assert_eq!(step.outcome, Outcome::Success);
        assert_eq!(step.actions[0].settled, Some(false));
        assert_eq!(step.artifacts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn optional_failures_are_downgraded() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom().with_broken_click(&sel("show_trendline")));
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![Step::new(
            "trend",
            vec![
                ActionSpec::invoke(sel("show_trendline")).optional(),
                ActionSpec::capture("01_trend"),
            ],
        )]);

        let report = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        let step = &report.steps[1];
        assert_eq!(step.outcome, Outcome::Success);
        assert_eq!(
            step.actions[0].outcome,
            Outcome::skipped(SkipReason::OptionalFailure)
        );
        assert!(matches!(
            step.actions[0].original,
            Some(Outcome::Failed {
                error: ActionError::Interaction(_)
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn rerun_overwrites_the_same_files() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom());
        let seq = sequencer(&provider, dir.path());
        let scenario = scenario(vec![Step::new("main", vec![ActionSpec::capture("01_main")])]);

        let first = seq.run(&scenario, CancellationToken::new()).await.unwrap();
        let second = seq.run(&scenario, CancellationToken::new()).await.unwrap();

        let paths = |r: &RunReport| r.artifacts().map(|a| a.file_path.clone()).collect::<Vec<_>>();
        assert_eq!(paths(&first), paths(&second));
        let mut files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["01_main.png", REPORT_FILE]);
        assert_eq!(provider.launches(), 2);
        assert_eq!(provider.closes(), 2);
    }
}
