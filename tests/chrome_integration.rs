use browser_use::{LaunchOptions, Page, ServerConfig, ToolRegistry};
use serde_json::json;

const FORM: &str = "data:text/html,<html><body><h1>Sign up</h1>\
<input name='email' aria-label='Email'><button id='go'>Go</button>\
<iframe srcdoc='<button>Inner</button>'></iframe></body></html>";

fn chrome_page() -> Page {
    let config = ServerConfig::new().with_launch(LaunchOptions::new().headless(true));
    let engine = config.create_engine().expect("Failed to launch browser");
    Page::new(engine, &config)
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Chrome to be installed
async fn test_snapshot_references_and_code() {
    let mut page = chrome_page();
    let registry = ToolRegistry::with_defaults();

    let navigated = registry.execute("navigate", json!({"url": FORM}), &mut page).await;
    assert!(!navigated.is_error, "{:?}", navigated.result);
    let state = navigated.page_state.expect("navigate returns a snapshot");
    println!("{}", state);
    assert!(state.contains("Sign up"));
    assert!(state.contains("[ref=f0s1e"));

    let typed = registry
        .execute("type", json!({"selector": "input[name='email']", "text": "a@b.c"}), &mut page)
        .await;
    assert!(!typed.is_error, "{:?}", typed.result);
    assert!(typed.code.unwrap().contains(".fill(\"a@b.c\")"));

    let value = registry
        .execute(
            "evaluate",
            json!({"function": "() => document.querySelector('input').value"}),
            &mut page,
        )
        .await;
    assert!(value.result.unwrap().contains("a@b.c"));

    page.dispose().await.expect("Failed to dispose page");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_iframe_content_gets_child_frame_references() {
    let mut page = chrome_page();
    let registry = ToolRegistry::with_defaults();

    registry.execute("navigate", json!({"url": FORM}), &mut page).await;
    let snapshot = registry.execute("snapshot", json!({}), &mut page).await;
    let state = snapshot.page_state.unwrap();
    println!("{}", state);
    assert!(state.contains("Inner"));
    assert!(state.contains("[ref=f1s"));

    let diagnose = registry.execute("diagnose", json!({}), &mut page).await;
    assert!(diagnose.result.unwrap().contains("(child)"));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_screenshot_is_attached() {
    let mut page = chrome_page();
    let registry = ToolRegistry::with_defaults();

    registry.execute("navigate", json!({"url": FORM}), &mut page).await;
    let response = registry
        .execute(
            "take_screenshot",
            json!({"expectation": {"imageOptions": {"format": "jpeg", "maxWidth": 400}}}),
            &mut page,
        )
        .await;

    assert!(!response.is_error, "{:?}", response.result);
    assert_eq!(response.attachments.len(), 1);
    assert_eq!(response.attachments[0].mime_type, "image/jpeg");
}
