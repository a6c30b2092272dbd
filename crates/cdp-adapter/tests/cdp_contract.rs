//! Contract tests that drive the Chromium provider against a real browser.
//! They are ignored by default because they require Chrome/Chromium on the
//! host machine.

use std::env;

use cdp_adapter::{BrowserProvider, ChromiumProvider, LaunchConfig};
use serde_json::json;
use snapflow_core_types::Selector;

fn contract_enabled() -> bool {
    env::var("SNAPFLOW_CDP_CONTRACT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

const PAGE: &str = "data:text/html,<h1 id='title'>snapflow</h1>\
<input id='user_correlation' value=''>\
<input type='checkbox' id='show_trendline'>";

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set SNAPFLOW_CDP_CONTRACT=1"]
async fn contract_navigate_set_value_and_capture() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (SNAPFLOW_CDP_CONTRACT not enabled)");
        return;
    }

    let provider = ChromiumProvider::new();
    let mut session = provider
        .launch(&LaunchConfig::default())
        .await
        .expect("launch chromium");

    session.navigate(PAGE).await.expect("navigate");

    let input = session
        .find_element(&Selector::id("user_correlation"))
        .await
        .expect("query")
        .expect("input present");
    input
        .set_attribute_or_value("value", "0.65")
        .await
        .expect("set value");
    let value = session
        .execute_script(
            "return document.getElementById(arguments[0]).value;",
            vec![json!("user_correlation")],
        )
        .await
        .expect("script");
    assert_eq!(value, json!("0.65"));

    let toggle = session
        .find_element(&Selector::id("show_trendline"))
        .await
        .expect("query")
        .expect("checkbox present");
    assert!(!toggle.is_selected().await.expect("selected state"));
    toggle.click().await.expect("click");
    assert!(toggle.is_selected().await.expect("selected state"));

    assert!(session
        .find_element(&Selector::id("missing"))
        .await
        .expect("query")
        .is_none());

    let frame = session.capture_frame().await.expect("capture");
    assert!(frame.starts_with(&[0x89, b'P', b'N', b'G']));

    session.close().await.expect("close");
    session.close().await.expect("second close is a no-op");
}
