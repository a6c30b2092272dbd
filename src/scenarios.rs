//! Built-in capture scenarios and scenario file loading.
//!
//! `guided` walks the learning app the way a student would, waiting on
//! observable signals (feedback text, BESD section) wherever the page offers
//! one. `quick` is the faster variant: every interaction is optional so a
//! capture is attempted for each view even when a control is missing.

use std::path::Path;

use action_flow::{ActionSpec, Readiness, RunError, Scenario, Step};
use anyhow::{anyhow, Context, Result};
use snapflow_core_types::Selector;
use tracing::debug;

use crate::config::Config;

pub const BUILTIN: &[&str] = &["guided", "quick"];

const ANCHOR: &str = "user_correlation";
const FEEDBACK_TIMEOUT_MS: u64 = 5_000;
const PLOT_DELAY_MS: u64 = 3_000;

fn id(raw: &str) -> Selector {
    Selector::id(raw)
}

fn consent() -> Step {
    Step::new(
        "consent",
        vec![ActionSpec::invoke(id("consent_yes"))
            .optional()
            .settle_delay(2_000)],
    )
}

fn main_interface() -> Step {
    Step::new(
        "main_interface",
        vec![
            ActionSpec::wait_for(Selector::css("h1"), 10_000),
            ActionSpec::wait_for(id(ANCHOR), 10_000).settle_delay(2_000),
            ActionSpec::capture("main_interface"),
        ],
    )
}

/// Enter a guess, draw the plot and submit it.
fn guess_actions(value: &str) -> Vec<ActionSpec> {
    vec![
        ActionSpec::set_value(id(ANCHOR), value),
        ActionSpec::invoke(id("generate_plot")).settle_delay(PLOT_DELAY_MS),
        ActionSpec::invoke(id("submit_guess"))
            .settle_until(id("feedback_text"), FEEDBACK_TIMEOUT_MS),
    ]
}

fn guess_step(name: &str, value: &str) -> Step {
    let mut actions = guess_actions(value);
    actions.push(ActionSpec::capture(name));
    Step::new(name, actions)
}

fn quick_guess_step(name: &str, value: &str) -> Step {
    let mut actions: Vec<_> = guess_actions(value)
        .into_iter()
        .map(ActionSpec::optional)
        .collect();
    actions.push(ActionSpec::capture(name));
    Step::new(name, actions)
}

fn guided(app_url: &str, readiness_timeout_ms: u64) -> Scenario {
    let besd = Step::new(
        "besd_visualization",
        vec![
            ActionSpec::unless(id("feedback_text"), guess_actions("0.50")),
            ActionSpec::scroll_into_view(id("besd_section"))
                .optional()
                .settle_delay(2_000),
            ActionSpec::capture("besd_visualization"),
        ],
    );

    let mut trend_line = vec![ActionSpec::toggle(id("show_trendline"), true)
        .optional()
        .settle_delay(1_000)];
    trend_line.extend(guess_actions("0.70"));
    trend_line.push(ActionSpec::capture("trend_line_example"));

    let hover = Step::new(
        "hover_information",
        vec![
            ActionSpec::set_value(id(ANCHOR), "0.60"),
            ActionSpec::invoke(id("generate_plot")).settle_delay(PLOT_DELAY_MS),
            ActionSpec::hover(id("scatter_plot"))
                .optional()
                .settle_delay(1_000),
            ActionSpec::capture("hover_information"),
        ],
    );

    Scenario {
        name: "guided".to_string(),
        description: "Full walkthrough of the correlation learning app".to_string(),
        target_url: app_url.to_string(),
        readiness: Readiness {
            anchor: id(ANCHOR),
            timeout_ms: readiness_timeout_ms,
        },
        consent: Some(consent()),
        steps: vec![
            main_interface(),
            guess_step("phase1_height_weight", "0.65"),
            guess_step("phase2_medical_example", "0.30"),
            guess_step("phase3_business_example", "0.40"),
            besd,
            Step::new("trend_line_example", trend_line),
            hover,
            guess_step("feedback_scoring", "0.67"),
        ],
    }
}

fn quick(app_url: &str, readiness_timeout_ms: u64) -> Scenario {
    Scenario {
        name: "quick".to_string(),
        description: "Capture every view, tolerating missing controls".to_string(),
        target_url: app_url.to_string(),
        readiness: Readiness {
            anchor: id(ANCHOR),
            timeout_ms: readiness_timeout_ms,
        },
        consent: Some(consent()),
        steps: vec![
            Step::new(
                "main_interface",
                vec![ActionSpec::capture("main_interface")],
            ),
            quick_guess_step("phase1_height_weight", "0.65"),
            quick_guess_step("phase2_medical_example", "0.30"),
            quick_guess_step("phase3_business_example", "0.40"),
            quick_guess_step("trend_line_example", "0.70"),
            quick_guess_step("feedback_scoring", "0.67"),
            Step::new(
                "besd_visualization",
                vec![
                    ActionSpec::scroll_into_view(id("besd_section"))
                        .optional()
                        .settle_delay(2_000),
                    ActionSpec::capture("besd_visualization"),
                ],
            ),
            Step::new(
                "hover_information",
                vec![
                    ActionSpec::scroll_into_view(id("scatter_plot"))
                        .optional()
                        .settle_delay(1_000),
                    ActionSpec::capture("hover_information"),
                ],
            ),
        ],
    }
}

/// Built-in scenario by name, aimed at `app_url`.
pub fn builtin(name: &str, app_url: &str, readiness_timeout_ms: u64) -> Option<Scenario> {
    match name {
        "guided" => Some(guided(app_url, readiness_timeout_ms)),
        "quick" => Some(quick(app_url, readiness_timeout_ms)),
        _ => None,
    }
}

/// Load a scenario from a YAML file.
pub fn load_file(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file {}", path.display()))?;
    let scenario: Scenario = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing scenario file {}", path.display()))?;
    debug!(path = %path.display(), name = %scenario.name, "loaded scenario file");
    Ok(scenario)
}

/// A built-in name or a path to a scenario file.
///
/// Built-ins target `config.app_url`; files carry their own target URL.
pub fn resolve(name_or_path: &str, config: &Config) -> Result<Scenario> {
    if let Some(scenario) = builtin(
        name_or_path,
        &config.app_url,
        config.wait.readiness_timeout_ms,
    ) {
        return Ok(scenario);
    }
    let path = Path::new(name_or_path);
    if path.is_file() {
        return load_file(path);
    }
    Err(anyhow!(RunError::Configuration(format!(
        "unknown scenario '{name_or_path}' (built-in: {})",
        BUILTIN.join(", ")
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::Action;

    #[test]
    fn builtins_are_valid() {
        for name in BUILTIN {
            let scenario = builtin(name, "http://localhost:3838/", 30_000).unwrap();
            scenario.validate().unwrap();
            assert_eq!(scenario.name, *name);
        }
        assert!(builtin("nope", "http://localhost/", 1).is_none());
    }

    #[test]
    fn guided_captures_in_walkthrough_order() {
        let scenario = builtin("guided", "http://localhost:3838/", 30_000).unwrap();
        assert_eq!(
            scenario.expected_artifacts(),
            vec![
                "main_interface",
                "phase1_height_weight",
                "phase2_medical_example",
                "phase3_business_example",
                "besd_visualization",
                "trend_line_example",
                "hover_information",
                "feedback_scoring",
            ]
        );
    }

    #[test]
    fn first_guess_sets_value_then_generates() {
        let scenario = builtin("guided", "http://localhost:3838/", 30_000).unwrap();
        let phase1 = &scenario.steps[1];
        assert_eq!(phase1.name, "phase1_height_weight");
        assert_eq!(
            phase1.actions[0].action,
            Action::SetValue {
                selector: Selector::id("user_correlation"),
                value: "0.65".into()
            }
        );
        assert!(matches!(
            phase1.actions[1].action,
            Action::Invoke { ref selector } if *selector == Selector::id("generate_plot")
        ));
    }

    #[test]
    fn quick_interactions_are_all_optional() {
        let scenario = builtin("quick", "http://localhost:3838/", 30_000).unwrap();
        for step in &scenario.steps {
            for spec in &step.actions {
                if !matches!(spec.action, Action::Capture { .. }) {
                    assert!(spec.optional, "{} in {}", spec.label(), step.name);
                }
            }
        }
    }

    #[test]
    fn resolve_loads_files_and_rejects_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let guided = builtin("guided", &config.app_url, 30_000).unwrap();
        let path = dir.path().join("guided.yaml");
        std::fs::write(&path, serde_yaml::to_string(&guided).unwrap()).unwrap();

        let loaded = resolve(path.to_str().unwrap(), &config).unwrap();
        assert_eq!(loaded, guided);

        let err = resolve("does-not-exist", &config).unwrap_err();
        assert!(err.to_string().contains("unknown scenario"));
    }
}
