//! Scripted in-memory provider.
//!
//! A [`StubDom`] declares which selectors exist, when they appear and what
//! clicking them does; a [`StubProvider`] serves sessions over that DOM and
//! records every interaction so tests can assert on ordering and on how many
//! times a session was launched and released.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use snapflow_core_types::Selector;

use crate::config::LaunchConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::provider::{BrowserProvider, BrowserSession, ElementHandle};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Clone, Debug, Default)]
struct StubNode {
    visible: bool,
    /// Lookups that must happen before the node becomes visible.
    appear_after: u32,
    lookups: u32,
    toggle: bool,
    selected: bool,
    reveals: Vec<String>,
    value: Option<String>,
    attributes: HashMap<String, String>,
    click_fails: bool,
}

/// Declarative description of the page served by a [`StubProvider`].
#[derive(Clone, Debug, Default)]
pub struct StubDom {
    nodes: HashMap<String, StubNode>,
    /// Script source to the value it evaluates to; anything else yields `null`.
    scripts: HashMap<String, Value>,
}

impl StubDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element that is present from the first lookup.
    pub fn with_element(mut self, selector: &Selector) -> Self {
        self.nodes.insert(
            selector.to_css(),
            StubNode {
                visible: true,
                ..StubNode::default()
            },
        );
        self
    }

    pub fn with_elements<'a>(mut self, selectors: impl IntoIterator<Item = &'a Selector>) -> Self {
        for selector in selectors {
            self = self.with_element(selector);
        }
        self
    }

    /// Element that only shows up after `lookups` failed lookups.
    pub fn with_late_element(mut self, selector: &Selector, lookups: u32) -> Self {
        self.nodes.insert(
            selector.to_css(),
            StubNode {
                visible: true,
                appear_after: lookups,
                ..StubNode::default()
            },
        );
        self
    }

    /// Checkbox-like element whose selection flips on every click.
    pub fn with_toggle(mut self, selector: &Selector, selected: bool) -> Self {
        self.nodes.insert(
            selector.to_css(),
            StubNode {
                visible: true,
                toggle: true,
                selected,
                ..StubNode::default()
            },
        );
        self
    }

    /// Clicking `trigger` makes `revealed` present.
    pub fn reveal_on_click(mut self, trigger: &Selector, revealed: &Selector) -> Self {
        self.nodes
            .entry(revealed.to_css())
            .or_insert_with(StubNode::default);
        if let Some(node) = self.nodes.get_mut(&trigger.to_css()) {
            node.reveals.push(revealed.to_css());
        }
        self
    }

    pub fn with_script_result(mut self, source: &str, value: Value) -> Self {
        self.scripts.insert(source.to_string(), value);
        self
    }

    /// Element is present but every click on it fails.
    pub fn with_broken_click(mut self, selector: &Selector) -> Self {
        let node = self.nodes.entry(selector.to_css()).or_default();
        node.visible = true;
        node.click_fails = true;
        self
    }
}

#[derive(Clone, Debug, Default)]
struct Faults {
    fail_launch: bool,
    fail_navigation: bool,
    fail_capture: bool,
    hover_unsupported: bool,
    disconnect_after: Option<usize>,
    fail_close: bool,
}

#[derive(Debug, Default)]
struct StubState {
    dom: StubDom,
    faults: Faults,
    calls: usize,
    session_open: bool,
    launches: usize,
    closes: usize,
    captures: usize,
    navigations: Vec<String>,
    clicks: Vec<String>,
    values: Vec<(String, String, String)>,
    hovers: Vec<String>,
    scrolls: Vec<String>,
    scripts: Vec<String>,
    last_launch: Option<LaunchConfig>,
}

impl StubState {
    /// Counts one provider call and fails once the session is gone.
    fn enter(&mut self) -> Result<(), AdapterError> {
        if !self.session_open {
            return Err(AdapterError::new(AdapterErrorKind::Disconnected)
                .with_hint("stub session is closed"));
        }
        self.calls += 1;
        if let Some(limit) = self.faults.disconnect_after {
            if self.calls > limit {
                self.session_open = false;
                return Err(AdapterError::new(AdapterErrorKind::Disconnected)
                    .with_hint(format!("stub disconnected after {limit} calls")));
            }
        }
        Ok(())
    }

    fn lookup(&mut self, css: &str) -> bool {
        match self.dom.nodes.get_mut(css) {
            Some(node) if node.visible => {
                node.lookups += 1;
                node.lookups > node.appear_after
            }
            _ => false,
        }
    }

    fn node_mut(&mut self, css: &str) -> Result<&mut StubNode, AdapterError> {
        self.dom
            .nodes
            .get_mut(css)
            .filter(|node| node.visible)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("{css} is no longer attached"))
            })
    }
}

/// Provider serving sessions over a [`StubDom`].
#[derive(Clone, Debug)]
pub struct StubProvider {
    state: Arc<Mutex<StubState>>,
}

impl StubProvider {
    pub fn new(dom: StubDom) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                dom,
                ..StubState::default()
            })),
        }
    }

    fn with_faults(self, apply: impl FnOnce(&mut Faults)) -> Self {
        apply(&mut self.state.lock().faults);
        self
    }

    pub fn fail_launch(self) -> Self {
        self.with_faults(|f| f.fail_launch = true)
    }

    pub fn fail_navigation(self) -> Self {
        self.with_faults(|f| f.fail_navigation = true)
    }

    pub fn fail_capture(self) -> Self {
        self.with_faults(|f| f.fail_capture = true)
    }

    pub fn fail_close(self) -> Self {
        self.with_faults(|f| f.fail_close = true)
    }

    pub fn without_hover(self) -> Self {
        self.with_faults(|f| f.hover_unsupported = true)
    }

    /// The session drops after `calls` successful provider calls.
    pub fn disconnect_after(self, calls: usize) -> Self {
        self.with_faults(|f| f.disconnect_after = Some(calls))
    }

    /// Removes an element mid-run, as if the page re-rendered without it.
    pub fn remove_element(&self, selector: &Selector) {
        if let Some(node) = self.state.lock().dom.nodes.get_mut(&selector.to_css()) {
            node.visible = false;
        }
    }

    pub fn launches(&self) -> usize {
        self.state.lock().launches
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    pub fn captures(&self) -> usize {
        self.state.lock().captures
    }

    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    /// `(css, name, value)` for every attribute/value mutation.
    pub fn values(&self) -> Vec<(String, String, String)> {
        self.state.lock().values.clone()
    }

    pub fn hovers(&self) -> Vec<String> {
        self.state.lock().hovers.clone()
    }

    pub fn scrolls(&self) -> Vec<String> {
        self.state.lock().scrolls.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().scripts.clone()
    }

    pub fn is_selected(&self, selector: &Selector) -> Option<bool> {
        self.state
            .lock()
            .dom
            .nodes
            .get(&selector.to_css())
            .map(|node| node.selected)
    }

    pub fn value_of(&self, selector: &Selector) -> Option<String> {
        self.state
            .lock()
            .dom
            .nodes
            .get(&selector.to_css())
            .and_then(|node| node.value.clone())
    }

    pub fn last_launch_config(&self) -> Option<LaunchConfig> {
        self.state.lock().last_launch.clone()
    }
}

#[async_trait]
impl BrowserProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn BrowserSession>, AdapterError> {
        config.validate()?;
        let mut state = self.state.lock();
        if state.faults.fail_launch {
            return Err(
                AdapterError::new(AdapterErrorKind::Launch).with_hint("stub launch refused")
            );
        }
        state.launches += 1;
        state.session_open = true;
        state.calls = 0;
        state.last_launch = Some(config.clone());
        Ok(Box::new(StubSession {
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

struct StubSession {
    state: Arc<Mutex<StubState>>,
    closed: bool,
}

impl StubSession {
    fn handle(&self, selector: &Selector) -> Box<dyn ElementHandle> {
        Box::new(StubElement {
            selector: selector.clone(),
            css: selector.to_css(),
            state: Arc::clone(&self.state),
        })
    }
}

#[async_trait]
impl BrowserSession for StubSession {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.enter()?;
        if state.faults.fail_navigation {
            return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("stub navigation to {url} failed")));
        }
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn find_element(
        &self,
        selector: &Selector,
    ) -> Result<Option<Box<dyn ElementHandle>>, AdapterError> {
        let found = {
            let mut state = self.state.lock();
            state.enter()?;
            state.lookup(&selector.to_css())
        };
        Ok(found.then(|| self.handle(selector)))
    }

    async fn find_elements(
        &self,
        selector: &Selector,
    ) -> Result<Vec<Box<dyn ElementHandle>>, AdapterError> {
        Ok(self.find_element(selector).await?.into_iter().collect())
    }

    async fn execute_script(&self, source: &str, _args: Vec<Value>) -> Result<Value, AdapterError> {
        let mut state = self.state.lock();
        state.enter()?;
        state.scripts.push(source.to_string());
        Ok(state.dom.scripts.get(source).cloned().unwrap_or(Value::Null))
    }

    async fn capture_frame(&self) -> Result<Vec<u8>, AdapterError> {
        let mut state = self.state.lock();
        state.enter()?;
        if state.faults.fail_capture {
            return Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint("stub capture failed"));
        }
        state.captures += 1;
        let mut frame = PNG_SIGNATURE.to_vec();
        frame.extend_from_slice(&(state.captures as u32).to_be_bytes());
        Ok(frame)
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut state = self.state.lock();
        state.session_open = false;
        state.closes += 1;
        if state.faults.fail_close {
            return Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint("stub close failed"));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

struct StubElement {
    selector: Selector,
    css: String,
    state: Arc<Mutex<StubState>>,
}

#[async_trait]
impl ElementHandle for StubElement {
    fn selector(&self) -> &Selector {
        &self.selector
    }

    async fn set_attribute_or_value(&self, name: &str, value: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.enter()?;
        let node = state.node_mut(&self.css)?;
        if name == "value" {
            node.value = Some(value.to_string());
        } else {
            node.attributes.insert(name.to_string(), value.to_string());
        }
        state
            .values
            .push((self.css.clone(), name.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.enter()?;
        let node = state.node_mut(&self.css)?;
        if node.click_fails {
            return Err(AdapterError::new(AdapterErrorKind::Interaction)
                .with_hint(format!("{} is not clickable", self.css)));
        }
        if node.toggle {
            node.selected = !node.selected;
        }
        let reveals = node.reveals.clone();
        for css in reveals {
            if let Some(revealed) = state.dom.nodes.get_mut(&css) {
                revealed.visible = true;
            }
        }
        state.clicks.push(self.css.clone());
        Ok(())
    }

    async fn is_selected(&self) -> Result<bool, AdapterError> {
        let mut state = self.state.lock();
        state.enter()?;
        Ok(state.node_mut(&self.css)?.selected)
    }

    async fn scroll_into_view(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.enter()?;
        state.node_mut(&self.css)?;
        state.scrolls.push(self.css.clone());
        Ok(())
    }

    async fn hover(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.enter()?;
        if state.faults.hover_unsupported {
            return Err(AdapterError::new(AdapterErrorKind::Unsupported)
                .with_hint("stub cannot move a pointer"));
        }
        state.node_mut(&self.css)?;
        state.hovers.push(self.css.clone());
        Ok(())
    }
}
