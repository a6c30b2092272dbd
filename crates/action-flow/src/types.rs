//! Core types for scenario sequencing

use std::collections::HashSet;
use std::fmt;

use action_primitives::{ActionReport, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapflow_artifact_store::{
    fs::layout::{normalize_name, validate_name},
    Artifact,
};
use snapflow_core_types::{RunId, Selector};

use crate::errors::RunError;

/// Longest fixed settle delay a scenario may declare.
pub const MAX_SETTLE_DELAY_MS: u64 = 10_000;

/// One operation of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Navigate {
        url: String,
    },
    SetValue {
        selector: Selector,
        value: String,
    },
    Invoke {
        selector: Selector,
    },
    WaitFor {
        selector: Selector,
        timeout_ms: u64,
    },
    ScrollIntoView {
        selector: Selector,
    },
    Hover {
        selector: Selector,
    },
    Capture {
        artifact: String,
    },
    /// Drive a checkbox-like control to `selected`
    Toggle {
        selector: Selector,
        #[serde(default = "default_selected")]
        selected: bool,
    },
    /// Run `actions` only while `present` is absent from the page
    Unless {
        present: Selector,
        actions: Vec<ActionSpec>,
    },
}

fn default_selected() -> bool {
    true
}

impl Action {
    /// Short human label, e.g. `invoke id:generate_plot`.
    pub fn label(&self) -> String {
        match self {
            Action::Navigate { url } => format!("navigate {url}"),
            Action::SetValue { selector, value } => format!("set_value {selector} = {value}"),
            Action::Invoke { selector } => format!("invoke {selector}"),
            Action::WaitFor {
                selector,
                timeout_ms,
            } => format!("wait_for {selector} ({timeout_ms}ms)"),
            Action::ScrollIntoView { selector } => format!("scroll_into_view {selector}"),
            Action::Hover { selector } => format!("hover {selector}"),
            Action::Capture { artifact } => format!("capture {artifact}"),
            Action::Toggle { selector, selected } => format!("toggle {selector} -> {selected}"),
            Action::Unless { present, .. } => format!("unless {present}"),
        }
    }

    pub fn selector(&self) -> Option<&Selector> {
        match self {
            Action::SetValue { selector, .. }
            | Action::Invoke { selector }
            | Action::WaitFor { selector, .. }
            | Action::ScrollIntoView { selector }
            | Action::Hover { selector }
            | Action::Toggle { selector, .. } => Some(selector),
            Action::Unless { present, .. } => Some(present),
            Action::Navigate { .. } | Action::Capture { .. } => None,
        }
    }
}

/// How the sequencer lets the application catch up after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Settle {
    #[default]
    None,
    /// Fixed sleep, for effects the page gives no observable signal for
    Delay { ms: u64 },
    /// Poll until `selector` shows up
    Until { selector: Selector, timeout_ms: u64 },
}

impl Settle {
    pub fn is_none(&self) -> bool {
        matches!(self, Settle::None)
    }
}

/// An action plus how the sequencer treats it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(flatten)]
    pub action: Action,

    /// Failures of optional actions are downgraded to `Skipped`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Settle::is_none")]
    pub settle: Settle,
}

impl From<Action> for ActionSpec {
    fn from(action: Action) -> Self {
        Self {
            action,
            optional: false,
            settle: Settle::None,
        }
    }
}

impl ActionSpec {
    pub fn navigate(url: impl Into<String>) -> Self {
        Action::Navigate { url: url.into() }.into()
    }

    pub fn set_value(selector: Selector, value: impl Into<String>) -> Self {
        Action::SetValue {
            selector,
            value: value.into(),
        }
        .into()
    }

    pub fn invoke(selector: Selector) -> Self {
        Action::Invoke { selector }.into()
    }

    pub fn wait_for(selector: Selector, timeout_ms: u64) -> Self {
        Action::WaitFor {
            selector,
            timeout_ms,
        }
        .into()
    }

    pub fn scroll_into_view(selector: Selector) -> Self {
        Action::ScrollIntoView { selector }.into()
    }

    pub fn hover(selector: Selector) -> Self {
        Action::Hover { selector }.into()
    }

    pub fn capture(artifact: impl Into<String>) -> Self {
        Action::Capture {
            artifact: artifact.into(),
        }
        .into()
    }

    pub fn toggle(selector: Selector, selected: bool) -> Self {
        Action::Toggle { selector, selected }.into()
    }

    pub fn unless(present: Selector, actions: Vec<ActionSpec>) -> Self {
        Action::Unless { present, actions }.into()
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn settle_delay(mut self, ms: u64) -> Self {
        self.settle = Settle::Delay { ms };
        self
    }

    pub fn settle_until(mut self, selector: Selector, timeout_ms: u64) -> Self {
        self.settle = Settle::Until {
            selector,
            timeout_ms,
        };
        self
    }

    pub fn label(&self) -> String {
        if self.optional {
            format!("{} (optional)", self.action.label())
        } else {
            self.action.label()
        }
    }
}

/// A named, ordered unit of actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub actions: Vec<ActionSpec>,
}

impl Step {
    pub fn new(name: impl Into<String>, actions: Vec<ActionSpec>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }

    /// Artifact names this step captures, in declaration order.
    pub fn artifacts(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_artifacts(&self.actions, &mut names);
        names
    }
}

fn collect_artifacts<'a>(actions: &'a [ActionSpec], out: &mut Vec<&'a str>) {
    for spec in actions {
        match &spec.action {
            Action::Capture { artifact } => out.push(artifact.as_str()),
            Action::Unless { actions, .. } => collect_artifacts(actions, out),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    /// Element whose presence means the application has loaded
    pub anchor: Selector,
    pub timeout_ms: u64,
}

/// A complete capture script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub target_url: String,

    pub readiness: Readiness,

    /// Optional-only step executed once right after readiness
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent: Option<Step>,

    pub steps: Vec<Step>,
}

impl Scenario {
    /// Every step in execution order, consent first.
    pub fn ordered_steps(&self) -> impl Iterator<Item = &Step> {
        self.consent.iter().chain(self.steps.iter())
    }

    pub fn expected_artifacts(&self) -> Vec<&str> {
        self.ordered_steps().flat_map(|step| step.artifacts()).collect()
    }

    /// Checks everything that can be checked before a session is acquired.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.name.trim().is_empty() {
            return Err(config_err("scenario name cannot be empty"));
        }
        validate_url(&self.target_url)?;
        if self.readiness.timeout_ms == 0 {
            return Err(config_err("readiness timeout must be positive"));
        }
        validate_selector(&self.readiness.anchor)?;
        if self.steps.is_empty() {
            return Err(config_err("scenario has no steps"));
        }

        if let Some(consent) = &self.consent {
            if let Some(required) = first_required(&consent.actions) {
                return Err(config_err(format!(
                    "consent action '{}' must be optional",
                    required.label()
                )));
            }
        }

        let mut step_names = HashSet::new();
        let mut artifacts = HashSet::new();
        for step in self.ordered_steps() {
            if step.name.trim().is_empty() {
                return Err(config_err("step names cannot be empty"));
            }
            if !step_names.insert(step.name.as_str()) {
                return Err(config_err(format!("duplicate step name '{}'", step.name)));
            }
            if step.actions.is_empty() {
                return Err(config_err(format!("step '{}' has no actions", step.name)));
            }
            validate_actions(&step.name, &step.actions)?;
            for artifact in step.artifacts().into_iter().map(normalize_name) {
                validate_name(artifact).map_err(|err| {
                    config_err(format!("step '{}': {err}", step.name))
                })?;
                if !artifacts.insert(artifact) {
                    return Err(config_err(format!(
                        "artifact '{artifact}' is captured more than once"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn config_err(msg: impl Into<String>) -> RunError {
    RunError::Configuration(msg.into())
}

fn first_required(actions: &[ActionSpec]) -> Option<&ActionSpec> {
    actions.iter().find_map(|spec| match &spec.action {
        _ if !spec.optional => Some(spec),
        Action::Unless { actions, .. } => first_required(actions),
        _ => None,
    })
}

pub fn validate_url(raw: &str) -> Result<(), RunError> {
    let parsed = url::Url::parse(raw)
        .map_err(|err| config_err(format!("invalid url '{raw}': {err}")))?;
    match parsed.scheme() {
        "http" | "https" | "file" => Ok(()),
        other => Err(config_err(format!(
            "unsupported url scheme '{other}' in '{raw}'"
        ))),
    }
}

fn validate_selector(selector: &Selector) -> Result<(), RunError> {
    selector
        .validate()
        .map_err(|err| config_err(err.to_string()))
}

fn validate_actions(step: &str, actions: &[ActionSpec]) -> Result<(), RunError> {
    for spec in actions {
        if let Some(selector) = spec.action.selector() {
            validate_selector(selector)?;
        }
        match &spec.action {
            Action::Navigate { url } => validate_url(url)?,
            Action::WaitFor { timeout_ms: 0, .. } => {
                return Err(config_err(format!(
                    "step '{step}': wait_for timeout must be positive"
                )))
            }
            Action::Unless { actions, .. } => {
                if actions.is_empty() {
                    return Err(config_err(format!(
                        "step '{step}': conditional block has no actions"
                    )));
                }
                validate_actions(step, actions)?;
            }
            _ => {}
        }
        match &spec.settle {
            Settle::Delay { ms } if *ms > MAX_SETTLE_DELAY_MS => {
                return Err(config_err(format!(
                    "step '{step}': settle delay {ms}ms exceeds {MAX_SETTLE_DELAY_MS}ms"
                )))
            }
            Settle::Until { timeout_ms: 0, .. } => {
                return Err(config_err(format!(
                    "step '{step}': settle timeout must be positive"
                )))
            }
            Settle::Until { selector, .. } => validate_selector(selector)?,
            _ => {}
        }
    }
    Ok(())
}

/// Sequencer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    SessionAcquired,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunState::Idle => "idle",
            RunState::SessionAcquired => "session_acquired",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Aborted => "aborted",
        };
        f.write_str(text)
    }
}

/// Result of one action as seen by the sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub label: String,

    pub optional: bool,

    /// Outcome after the outcome policy was applied
    pub outcome: Outcome,

    /// What the primitive originally reported, when the policy changed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Outcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ActionReport>,

    /// `None` when no settle was configured or it did not apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled: Option<bool>,
}

/// Step execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,

    pub outcome: Outcome,

    pub actions: Vec<ActionRecord>,

    pub artifacts: Vec<Artifact>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub latency_ms: u64,
}

impl StepRecord {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            outcome: Outcome::Success,
            actions: Vec::new(),
            artifacts: Vec::new(),
            started_at: now,
            finished_at: now,
            latency_ms: 0,
        }
    }

    pub fn push(&mut self, record: ActionRecord) {
        if let Some(artifact) = record.report.as_ref().and_then(|r| r.artifact.clone()) {
            self.artifacts.push(artifact);
        }
        self.actions.push(record);
    }

    /// Derives the step outcome from its action records and stamps the finish time.
    ///
    /// Failed if any action failed, Skipped if every attempted action was
    /// skipped, Success otherwise.
    pub fn finish(mut self) -> Self {
        let first_failure = self
            .actions
            .iter()
            .find(|a| matches!(a.outcome, Outcome::Failed { .. }));
        self.outcome = if let Some(failed) = first_failure {
            failed.outcome.clone()
        } else if !self.actions.is_empty() && self.actions.iter().all(|a| a.outcome.is_skipped()) {
            self.actions[0].outcome.clone()
        } else {
            Outcome::Success
        };
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at).num_milliseconds().max(0) as u64;
        self
    }
}

/// Ordered record of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,

    pub scenario: String,

    pub target_url: String,

    pub state: RunState,

    /// Every state the run passed through, starting with `idle`
    pub transitions: Vec<RunState>,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    pub steps: Vec<StepRecord>,

    /// Why the run aborted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort: Option<RunError>,

    pub session_acquired: bool,

    /// `close` was called on the session. Whether it succeeded is told by
    /// `release_error`.
    pub release_attempted: bool,

    /// Error returned by `close`, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_error: Option<String>,
}

impl RunReport {
    pub fn new(run_id: RunId, scenario: &Scenario) -> Self {
        Self {
            run_id,
            scenario: scenario.name.clone(),
            target_url: scenario.target_url.clone(),
            state: RunState::Idle,
            transitions: vec![RunState::Idle],
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            abort: None,
            session_acquired: false,
            release_attempted: false,
            release_error: None,
        }
    }

    pub(crate) fn transition(&mut self, to: RunState) {
        tracing::debug!(
            run_id = %self.run_id,
            from = %self.state,
            to = %to,
            "run state transition"
        );
        self.state = to;
        self.transitions.push(to);
    }

    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Process exit status: success only for a completed run.
    pub fn exit_code(&self) -> i32 {
        if self.is_completed() {
            0
        } else {
            1
        }
    }

    /// All artifacts in step order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.steps.iter().flat_map(|step| step.artifacts.iter())
    }

    pub fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.steps.iter().filter(|step| pred(&step.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(id: &str) -> Selector {
        Selector::id(id)
    }

    fn scenario() -> Scenario {
        Scenario {
            name: "test".into(),
            description: String::new(),
            target_url: "http://localhost:8080/".into(),
            readiness: Readiness {
                anchor: sel("user_correlation"),
                timeout_ms: 1_000,
            },
            consent: Some(Step::new(
                "consent",
                vec![ActionSpec::invoke(sel("consent_yes")).optional()],
            )),
            steps: vec![
                Step::new("main", vec![ActionSpec::capture("01_main")]),
                Step::new(
                    "guess",
                    vec![
                        ActionSpec::set_value(sel("user_correlation"), "0.65"),
                        ActionSpec::unless(
                            sel("feedback_text"),
                            vec![ActionSpec::invoke(sel("submit_guess"))],
                        ),
                        ActionSpec::capture("02_guess"),
                    ],
                ),
            ],
        }
    }

    #[test]
    fn valid_scenario_passes() {
        let scenario = scenario();
        scenario.validate().unwrap();
        assert_eq!(scenario.expected_artifacts(), vec!["01_main", "02_guess"]);
        let names: Vec<_> = scenario.ordered_steps().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["consent", "main", "guess"]);
    }

    #[test]
    fn duplicate_names_are_configuration_errors() {
        let mut dup_step = scenario();
        dup_step.steps[1].name = "consent".into();
        assert!(matches!(dup_step.validate(), Err(RunError::Configuration(_))));

        let mut dup_artifact = scenario();
        dup_artifact.steps[1].actions[2] = ActionSpec::capture("01_main");
        assert!(matches!(
            dup_artifact.validate(),
            Err(RunError::Configuration(_))
        ));
    }

    #[test]
    fn consent_must_be_optional_and_settles_bounded() {
        let mut required_consent = scenario();
        required_consent.consent = Some(Step::new(
            "consent",
            vec![ActionSpec::invoke(sel("consent_yes"))],
        ));
        assert!(required_consent.validate().is_err());

        let mut long_settle = scenario();
        long_settle.steps[0].actions[0] = ActionSpec::capture("01_main").settle_delay(60_000);
        assert!(long_settle.validate().is_err());
    }

    #[test]
    fn url_and_artifact_name_checks() {
        let mut bad_url = scenario();
        bad_url.target_url = "ftp://example.com".into();
        assert!(bad_url.validate().is_err());

        let mut bad_name = scenario();
        bad_name.steps[0].actions[0] = ActionSpec::capture("../escape");
        assert!(bad_name.validate().is_err());
    }

    #[test]
    fn step_outcome_rules() {
        let record = |outcome: Outcome| ActionRecord {
            label: "x".into(),
            optional: false,
            outcome,
            original: None,
            report: None,
            settled: None,
        };
        let skipped = Outcome::skipped(action_primitives::SkipReason::ElementAbsent);

        let mut all_skipped = StepRecord::new("a");
        all_skipped.push(record(skipped.clone()));
        assert_eq!(all_skipped.finish().outcome, skipped);

        let mut mixed = StepRecord::new("b");
        mixed.push(record(skipped.clone()));
        mixed.push(record(Outcome::Success));
        assert_eq!(mixed.finish().outcome, Outcome::Success);

        let failure = Outcome::failed(action_primitives::ActionError::ElementNotFound("#x".into()));
        let mut failed = StepRecord::new("c");
        failed.push(record(Outcome::Success));
        failed.push(record(failure.clone()));
        assert_eq!(failed.finish().outcome, failure);
    }

    #[test]
    fn scenario_yaml_round_trip_shape() {
        let yaml = r#"
name: mini
target_url: http://localhost:8080/
readiness:
  anchor: { by: id, value: user_correlation }
  timeout_ms: 30000
steps:
  - name: main
    actions:
      - type: invoke
        selector: { by: id, value: generate_plot }
        optional: true
        settle: { mode: delay, ms: 3000 }
      - type: toggle
        selector: { by: id, value: show_trendline }
      - type: capture
        artifact: 01_main
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        scenario.validate().unwrap();
        let first = &scenario.steps[0].actions[0];
        assert!(first.optional);
        assert_eq!(first.settle, Settle::Delay { ms: 3000 });
        assert_eq!(
            scenario.steps[0].actions[1].action,
            Action::Toggle {
                selector: sel("show_trendline"),
                selected: true
            }
        );
    }
}
