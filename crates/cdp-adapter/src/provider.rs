use async_trait::async_trait;
use serde_json::Value;
use snapflow_core_types::Selector;

use crate::config::LaunchConfig;
use crate::error::AdapterError;

/// Launches controllable browser sessions.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn BrowserSession>, AdapterError>;
}

/// One live browser session, exclusively owned by its caller.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError>;

    /// First element matching `selector`, or `None` when nothing matches.
    async fn find_element(
        &self,
        selector: &Selector,
    ) -> Result<Option<Box<dyn ElementHandle>>, AdapterError>;

    async fn find_elements(
        &self,
        selector: &Selector,
    ) -> Result<Vec<Box<dyn ElementHandle>>, AdapterError>;

    /// Runs `source` as a function body with `args` bound to `arguments`.
    async fn execute_script(&self, source: &str, args: Vec<Value>) -> Result<Value, AdapterError>;

    /// PNG of the current viewport.
    async fn capture_frame(&self) -> Result<Vec<u8>, AdapterError>;

    /// Releases the session. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), AdapterError>;

    fn is_closed(&self) -> bool;
}

#[async_trait]
pub trait ElementHandle: Send + Sync {
    fn selector(&self) -> &Selector;

    /// `name == "value"` sets the control's value property and fires
    /// `input`/`change`; any other name sets the attribute.
    async fn set_attribute_or_value(&self, name: &str, value: &str) -> Result<(), AdapterError>;

    async fn click(&self) -> Result<(), AdapterError>;

    async fn is_selected(&self) -> Result<bool, AdapterError>;

    async fn scroll_into_view(&self) -> Result<(), AdapterError>;

    async fn hover(&self) -> Result<(), AdapterError>;
}
