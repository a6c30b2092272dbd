//! Chromium implementation of the capability provider, driven over CDP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use snapflow_core_types::Selector;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LaunchConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::provider::{BrowserProvider, BrowserSession, ElementHandle};
use crate::util::{set_attribute_fn, set_value_fn, wrap_script, IS_SELECTED_FN};

#[derive(Clone, Debug, Default)]
pub struct ChromiumProvider;

impl ChromiumProvider {
    pub fn new() -> Self {
        Self
    }

    fn browser_config(cfg: &LaunchConfig) -> Result<BrowserConfig, AdapterError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(cfg.request_timeout_ms))
            .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms))
            .window_size(cfg.viewport.width, cfg.viewport.height)
            .viewport(CdpViewport {
                width: cfg.viewport.width,
                height: cfg.viewport.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });

        if !cfg.headless {
            builder = builder.with_head();
        }
        if cfg.sandbox_disabled {
            builder = builder.no_sandbox();
        }
        if let Some(port) = cfg.debug_port {
            builder = builder.port(port);
        }
        builder = builder.args(cfg.engine_args());

        match cfg.resolve_executable() {
            Some(path) => builder = builder.chrome_executable(path),
            None => {
                return Err(AdapterError::new(AdapterErrorKind::Launch)
                    .with_hint("no chrome/chromium executable found; set SNAPFLOW_CHROME"))
            }
        }
        if let Some(dir) = &cfg.user_data_dir {
            builder = builder.user_data_dir(dir.clone());
        }

        builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::InvalidConfig)
                .with_hint(format!("browser config error: {err}"))
        })
    }
}

#[async_trait]
impl BrowserProvider for ChromiumProvider {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn launch(&self, cfg: &LaunchConfig) -> Result<Box<dyn BrowserSession>, AdapterError> {
        cfg.validate()?;
        let browser_cfg = Self::browser_config(cfg)?;

        let (browser, mut handler) = Browser::launch(browser_cfg).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let alive = Arc::new(AtomicBool::new(true));
        let handler_alive = Arc::clone(&alive);
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", ?err, "cdp handler event error");
                }
            }
            handler_alive.store(false, Ordering::Relaxed);
            debug!(target: "cdp-adapter", "cdp handler loop finished");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(AdapterError::new(AdapterErrorKind::Launch)
                    .with_hint(format!("failed to open initial page: {err}")));
            }
        };

        info!(
            target: "cdp-adapter",
            headless = cfg.headless,
            viewport = %cfg.viewport,
            "chromium session launched"
        );

        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task: Some(handler_task),
            alive,
            closed: false,
        }))
    }
}

pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
    closed: bool,
}

impl ChromiumSession {
    fn ensure_open(&self) -> Result<(), AdapterError> {
        if self.closed || !self.alive.load(Ordering::Relaxed) {
            return Err(AdapterError::new(AdapterErrorKind::Disconnected)
                .with_hint("browser session is no longer connected"));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        self.ensure_open()?;
        url::Url::parse(url).map_err(|err| {
            AdapterError::new(AdapterErrorKind::InvalidConfig)
                .with_hint(format!("invalid url '{url}': {err}"))
        })?;
        self.page.goto(url).await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn find_element(
        &self,
        selector: &Selector,
    ) -> Result<Option<Box<dyn ElementHandle>>, AdapterError> {
        Ok(self.find_elements(selector).await?.into_iter().next())
    }

    async fn find_elements(
        &self,
        selector: &Selector,
    ) -> Result<Vec<Box<dyn ElementHandle>>, AdapterError> {
        self.ensure_open()?;
        let elements = self
            .page
            .find_elements(selector.to_css())
            .await
            .map_err(map_cdp_error)?;
        Ok(elements
            .into_iter()
            .map(|element| {
                Box::new(ChromiumElement {
                    selector: selector.clone(),
                    element,
                }) as Box<dyn ElementHandle>
            })
            .collect())
    }

    async fn execute_script(&self, source: &str, args: Vec<Value>) -> Result<Value, AdapterError> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate(wrap_script(source, &args))
            .await
            .map_err(map_cdp_error)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn capture_frame(&self) -> Result<Vec<u8>, AdapterError> {
        self.ensure_open()?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        self.page.screenshot(params).await.map_err(map_cdp_error)
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut result = Ok(());
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                warn!(target: "cdp-adapter", ?err, "browser close command failed");
                result = Err(map_cdp_error(err));
            }
            if let Err(err) = browser.wait().await {
                warn!(target: "cdp-adapter", ?err, "waiting for chromium exit failed");
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        self.alive.store(false, Ordering::Relaxed);
        debug!(target: "cdp-adapter", "chromium session closed");
        result
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

struct ChromiumElement {
    selector: Selector,
    element: Element,
}

impl ChromiumElement {
    async fn call(&self, decl: String) -> Result<Option<Value>, AdapterError> {
        let returns = self
            .element
            .call_js_fn(decl, false)
            .await
            .map_err(map_cdp_error)?;
        Ok(returns.result.value)
    }
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    fn selector(&self) -> &Selector {
        &self.selector
    }

    async fn set_attribute_or_value(&self, name: &str, value: &str) -> Result<(), AdapterError> {
        let decl = if name == "value" {
            set_value_fn(value)
        } else {
            set_attribute_fn(name, value)
        };
        self.call(decl).await.map(|_| ())
    }

    async fn click(&self) -> Result<(), AdapterError> {
        self.element.click().await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn is_selected(&self) -> Result<bool, AdapterError> {
        let value = self.call(IS_SELECTED_FN.to_string()).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn scroll_into_view(&self) -> Result<(), AdapterError> {
        self.element.scroll_into_view().await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn hover(&self) -> Result<(), AdapterError> {
        self.element.hover().await.map_err(map_cdp_error)?;
        Ok(())
    }
}

fn is_missing_node(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("could not find node")
        || lower.contains("node is detached")
        || lower.contains("no node with given id")
}

pub(crate) fn map_cdp_error(err: CdpError) -> AdapterError {
    let hint = err.to_string();
    match err {
        CdpError::Timeout => AdapterError::new(AdapterErrorKind::NavTimeout)
            .with_hint(hint)
            .retriable(true),
        CdpError::NotFound | CdpError::FrameNotFound(_) => {
            AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint(hint)
        }
        CdpError::JavascriptException(_) => {
            AdapterError::new(AdapterErrorKind::Script).with_hint(hint)
        }
        CdpError::Serde(_) | CdpError::DecodeError(_) | CdpError::InvalidMessage(_, _) => {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(hint)
        }
        CdpError::Chrome(_) | CdpError::ChromeMessage(_) if is_missing_node(&hint) => {
            AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint(hint)
        }
        CdpError::Chrome(_) | CdpError::ChromeMessage(_) | CdpError::ScrollingFailed(_) => {
            AdapterError::new(AdapterErrorKind::Interaction).with_hint(hint)
        }
        CdpError::Url(_) => AdapterError::new(AdapterErrorKind::InvalidConfig).with_hint(hint),
        CdpError::LaunchExit(_, _) | CdpError::LaunchTimeout(_) | CdpError::LaunchIo(_, _) => {
            AdapterError::new(AdapterErrorKind::Launch).with_hint(hint)
        }
        CdpError::Ws(_)
        | CdpError::Io(_)
        | CdpError::ChannelSendError(_)
        | CdpError::NoResponse
        | CdpError::UnexpectedWsMessage(_) => {
            AdapterError::new(AdapterErrorKind::Disconnected)
                .with_hint(hint)
                .retriable(true)
        }
    }
}
