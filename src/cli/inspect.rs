//! `snapflow inspect`: load the application once and dump what is on the page.
//!
//! Writes `app_loaded.png`, `page_source.html` and an element inventory
//! (`elements.json`) into the output directory. Used to find the ids a
//! scenario should target when the application markup changes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use action_flow::RunError;
use action_primitives::{wait_for_element, WaitOutcome};
use anyhow::Result;
use cdp_adapter::{BrowserProvider, BrowserSession, ChromiumProvider};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use snapflow_artifact_store::{Artifact, ArtifactStore};
use snapflow_core_types::Selector;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;

pub const SCREENSHOT: &str = "app_loaded";
pub const PAGE_SOURCE_FILE: &str = "page_source.html";
pub const INVENTORY_FILE: &str = "elements.json";

pub(crate) const PAGE_SOURCE_JS: &str = "return document.documentElement.outerHTML;";
pub(crate) const PAGE_META_JS: &str = "return { title: document.title, url: location.href };";
pub(crate) const DESCRIBE_JS: &str = r#"
const limit = arguments[1];
let nodes = Array.from(document.querySelectorAll(arguments[0]));
if (limit !== null) { nodes = nodes.slice(0, limit); }
return nodes.map((el) => ({
  tag: el.tagName.toLowerCase(),
  id: el.id || null,
  class: el.className && typeof el.className === 'string' ? el.className : null,
  type: el.getAttribute('type'),
  name: el.getAttribute('name'),
  text: (el.innerText || '').trim().slice(0, 80) || null,
}));
"#;

/// `(name, css, listing limit)` for each inventory section.
const CATEGORIES: &[(&str, &str, Option<usize>)] = &[
    ("inputs", "input", None),
    ("buttons", "button", None),
    ("divs_with_id", "div[id]", Some(20)),
    (
        "correlation",
        "[id*='correlation'], [class*='correlation']",
        None,
    ),
    ("sliders", "[id*='slider'], [class*='slider']", None),
    ("plots", "[id*='plot'], [class*='plot']", None),
];

#[derive(Args, Clone, Debug)]
pub struct InspectArgs {
    /// Target application URL (defaults to the configured one)
    #[arg(long)]
    pub url: Option<String>,

    /// Directory for the screenshot, page source and element inventory
    #[arg(short, long, value_name = "DIR", default_value = "debug")]
    pub out: PathBuf,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Element id to wait for before inspecting
    #[arg(long, default_value = "user_correlation")]
    pub anchor: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSummary {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
}

impl ElementSummary {
    fn describe(&self) -> String {
        let fields = [
            ("tag", &self.tag),
            ("id", &self.id),
            ("class", &self.class),
            ("type", &self.kind),
            ("name", &self.name),
            ("text", &self.text),
        ];
        fields
            .iter()
            .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label}={v}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CategoryInventory {
    pub name: String,
    pub selector: String,
    /// Matches found on the page; `elements` may list fewer.
    pub count: usize,
    pub elements: Vec<ElementSummary>,
}

/// Contents of `elements.json`.
#[derive(Clone, Debug, Serialize)]
pub struct Inventory {
    pub url: String,
    pub title: Option<String>,
    pub anchor: String,
    pub anchor_found: bool,
    pub categories: Vec<CategoryInventory>,
}

impl Inventory {
    pub fn category(&self, name: &str) -> Option<&CategoryInventory> {
        self.categories.iter().find(|c| c.name == name)
    }
}

#[derive(Debug)]
pub struct Inspection {
    pub inventory: Inventory,
    pub screenshot: Artifact,
    pub page_source: PathBuf,
    pub inventory_path: PathBuf,
}

pub async fn cmd_inspect(args: InspectArgs, config: &Config) -> Result<()> {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping inspection");
            watcher.cancel();
        }
    });

    let provider: Arc<dyn BrowserProvider> = Arc::new(ChromiumProvider::new());
    let inspection = execute_inspect(&args, config, provider, cancel).await?;

    let inventory = &inspection.inventory;
    println!("Page title: {}", inventory.title.as_deref().unwrap_or("(none)"));
    println!("URL: {}", inventory.url);
    if !inventory.anchor_found {
        println!("Anchor {} not found", inventory.anchor);
    }
    for category in &inventory.categories {
        println!();
        println!("{} ({})", category.name, category.count);
        for (idx, element) in category.elements.iter().enumerate() {
            println!("  {}. {}", idx + 1, element.describe());
        }
    }
    println!();
    println!("Screenshot: {}", inspection.screenshot.file_path.display());
    println!("Page source: {}", inspection.page_source.display());
    println!("Inventory: {}", inspection.inventory_path.display());
    Ok(())
}

/// Launches one session on `provider`, inspects the page and releases it.
pub async fn execute_inspect(
    args: &InspectArgs,
    config: &Config,
    provider: Arc<dyn BrowserProvider>,
    cancel: CancellationToken,
) -> Result<Inspection> {
    let mut config = config.clone();
    if let Some(url) = &args.url {
        config.app_url = url.clone();
    }
    if args.headful {
        config.browser.headless = false;
    }
    config.validate()?;
    let anchor = Selector::id(args.anchor.as_str());
    anchor
        .validate()
        .map_err(|err| RunError::Configuration(err.to_string()))?;

    info!(
        url = %config.app_url,
        out = %args.out.display(),
        provider = provider.name(),
        "Starting inspection"
    );

    let mut session = provider
        .launch(&config.launch_config())
        .await
        .map_err(RunError::from)?;
    let store = ArtifactStore::new(&args.out);
    let result = inspect_page(session.as_ref(), &config, &anchor, &store, &cancel).await;

    if let Err(err) = session.close().await {
        warn!(error = %err, "session release failed");
    }
    result
}

async fn inspect_page(
    session: &dyn BrowserSession,
    config: &Config,
    anchor: &Selector,
    store: &ArtifactStore,
    cancel: &CancellationToken,
) -> Result<Inspection> {
    session
        .navigate(&config.app_url)
        .await
        .map_err(RunError::from)?;

    let policy = config
        .lookup_policy()
        .with_timeout(Duration::from_millis(config.wait.readiness_timeout_ms));
    let anchor_found = match wait_for_element(session, anchor, &policy, cancel).await {
        WaitOutcome::Satisfied { .. } => true,
        WaitOutcome::TimedOut { elapsed, .. } => {
            warn!(
                anchor = %anchor,
                elapsed_ms = elapsed.as_millis() as u64,
                "anchor not found, inspecting the page as loaded"
            );
            false
        }
        WaitOutcome::Cancelled { .. } => return Err(RunError::Cancelled.into()),
        WaitOutcome::Faulted { error, .. } => return Err(RunError::ProviderFault(error).into()),
    };

    let meta = session
        .execute_script(PAGE_META_JS, Vec::new())
        .await
        .map_err(RunError::from)?;
    let title = meta
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let mut categories = Vec::with_capacity(CATEGORIES.len());
    for (name, css, limit) in CATEGORIES {
        let selector = Selector::css(*css);
        let count = session
            .find_elements(&selector)
            .await
            .map_err(RunError::from)?
            .len();
        let described = session
            .execute_script(DESCRIBE_JS, vec![json!(css), json!(limit)])
            .await
            .map_err(RunError::from)?;
        let elements: Vec<ElementSummary> = serde_json::from_value(described).unwrap_or_default();
        debug!(category = %name, count, listed = elements.len(), "inventoried");
        categories.push(CategoryInventory {
            name: name.to_string(),
            selector: css.to_string(),
            count,
            elements,
        });
    }

    let frame = session.capture_frame().await.map_err(RunError::from)?;
    let screenshot = store.save(SCREENSHOT, &frame)?;

    let source = session
        .execute_script(PAGE_SOURCE_JS, Vec::new())
        .await
        .map_err(RunError::from)?;
    let html = source.as_str().unwrap_or_default();
    if html.is_empty() {
        warn!("page source came back empty");
    }
    let page_source = store.write_text(PAGE_SOURCE_FILE, html)?;

    let inventory = Inventory {
        url: config.app_url.clone(),
        title,
        anchor: anchor.to_css(),
        anchor_found,
        categories,
    };
    let inventory_path = store.write_json(INVENTORY_FILE, &inventory)?;
    info!(
        screenshot = %screenshot.file_path.display(),
        page_source = %page_source.display(),
        "Inspection written"
    );

    Ok(Inspection {
        inventory,
        screenshot,
        page_source,
        inventory_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::stub::{StubDom, StubProvider};

    fn args(out: &std::path::Path) -> InspectArgs {
        InspectArgs {
            url: Some("http://localhost:3838/".into()),
            out: out.to_path_buf(),
            headful: false,
            anchor: "user_correlation".into(),
        }
    }

    fn app_dom() -> StubDom {
        StubDom::new()
            .with_elements(&[
                Selector::id("user_correlation"),
                Selector::css("input"),
                Selector::css("button"),
            ])
            .with_script_result(
                PAGE_SOURCE_JS,
                json!("<html><body><input id=\"user_correlation\"></body></html>"),
            )
            .with_script_result(PAGE_META_JS, json!({"title": "Correlation Learning"}))
    }

    #[tokio::test(start_paused = true)]
    async fn writes_screenshot_source_and_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("debug");
        let provider = StubProvider::new(app_dom());

        let inspection = execute_inspect(
            &args(&out),
            &Config::default(),
            Arc::new(provider.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(inspection.screenshot.file_path, out.join("app_loaded.png"));
        assert!(out.join("app_loaded.png").is_file());
        let html = std::fs::read_to_string(out.join(PAGE_SOURCE_FILE)).unwrap();
        assert!(html.contains("user_correlation"));

        let inventory = &inspection.inventory;
        assert!(inventory.anchor_found);
        assert_eq!(inventory.title.as_deref(), Some("Correlation Learning"));
        assert_eq!(inventory.categories.len(), CATEGORIES.len());
        assert_eq!(inventory.category("inputs").map(|c| c.count), Some(1));
        assert_eq!(inventory.category("buttons").map(|c| c.count), Some(1));
        assert_eq!(inventory.category("plots").map(|c| c.count), Some(0));

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(out.join(INVENTORY_FILE)).unwrap())
                .unwrap();
        assert_eq!(written["url"], "http://localhost:3838/");
        assert_eq!(written["categories"][0]["name"], "inputs");

        assert_eq!(provider.navigations(), vec!["http://localhost:3838/"]);
        assert!(provider.scripts().iter().any(|s| s == PAGE_SOURCE_JS));
        assert_eq!(provider.captures(), 1);
        assert_eq!(provider.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_anchor_still_dumps_the_page() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(StubDom::new());
        let mut config = Config::default();
        config.wait.readiness_timeout_ms = 1_000;

        let inspection = execute_inspect(
            &args(dir.path()),
            &config,
            Arc::new(provider.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(!inspection.inventory.anchor_found);
        assert!(inspection.inventory.title.is_none());
        assert!(dir.path().join("app_loaded.png").is_file());
        assert_eq!(std::fs::read_to_string(&inspection.page_source).unwrap(), "");
        assert_eq!(provider.closes(), 1);
    }

    #[tokio::test]
    async fn capture_fault_is_an_error_and_releases_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::new(app_dom()).fail_capture();

        let err = execute_inspect(
            &args(dir.path()),
            &Config::default(),
            Arc::new(provider.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::ProviderFault(_))
        ));
        assert_eq!(provider.closes(), 1);
        assert!(!dir.path().join(INVENTORY_FILE).exists());
    }

    #[test]
    fn element_summaries_read_script_output() {
        let value = json!([{"tag": "input", "id": "user_correlation", "type": "number"}]);
        let elements: Vec<ElementSummary> = serde_json::from_value(value).unwrap();
        assert_eq!(elements[0].kind.as_deref(), Some("number"));
        assert_eq!(
            elements[0].describe(),
            "tag=input, id=user_correlation, type=number"
        );
    }
}
