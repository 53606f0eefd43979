use browser_use::engine::{AxNode, ElementAction, FakeEngine, FrameInfo};
use browser_use::{ElementHandle, FrameId, Page, ServerConfig, ToolRegistry};
use serde_json::json;
use std::sync::Arc;

fn widget() -> FrameId {
    FrameId::new("widget")
}

fn page_with_iframe() -> (Arc<FakeEngine>, Page) {
    let engine = Arc::new(FakeEngine::new());
    engine.set_page("https://example.com/", "Example");
    engine.set_main_tree(vec![
        AxNode::new("heading", "Checkout"),
        AxNode::new("button", "Pay").with_handle(ElementHandle::new(FrameId::main(), "pay")),
        AxNode::new("iframe", "Card")
            .with_handle(ElementHandle::new(FrameId::main(), "card"))
            .with_child_frame(widget()),
    ]);
    engine.add_frame(
        widget(),
        FrameInfo {
            url: "https://pay.example.com/card".to_string(),
            name: Some("card".to_string()),
            parent: Some(FrameId::main()),
        },
        vec![AxNode::new("textbox", "Card number").with_handle(ElementHandle::new(widget(), "number"))],
    );
    engine.add_page("https://example.com/done", "Done", vec![AxNode::new("heading", "Thanks")]);

    let page = Page::new(engine.clone(), &ServerConfig::default());
    (engine, page)
}

#[tokio::test]
async fn test_iframe_reference_reaches_child_frame() {
    let (engine, mut page) = page_with_iframe();
    let registry = ToolRegistry::with_defaults();

    let snapshot = registry.execute("snapshot", json!({}), &mut page).await;
    let state = snapshot.page_state.expect("snapshot is included by default");
    assert!(state.contains("[ref=f1s1e1]"), "{}", state);

    let response = registry
        .execute(
            "type",
            json!({"ref": "f1s1e1", "text": "4242", "expectation": {"includeSnapshot": false}}),
            &mut page,
        )
        .await;

    assert!(!response.is_error, "{:?}", response.result);
    assert_eq!(
        engine.actions(),
        vec![(
            ElementHandle::new(widget(), "number"),
            ElementAction::Fill {
                text: "4242".to_string()
            }
        )]
    );
}

#[tokio::test]
async fn test_detached_frame_is_evicted_and_its_references_fail() {
    let (engine, mut page) = page_with_iframe();
    let registry = ToolRegistry::with_defaults();

    registry.execute("snapshot", json!({}), &mut page).await;
    engine.detach_frame(&widget());

    let diagnose = registry
        .execute("diagnose", json!({"expectation": {"includeSnapshot": false}}), &mut page)
        .await;
    let text = diagnose.result.unwrap();
    assert!(text.contains("evicted 1"), "{}", text);
    assert!(!page.frames().is_active(&widget()));

    let response = registry
        .execute(
            "click",
            json!({"ref": "f1s1e1", "expectation": {"includeSnapshot": false}}),
            &mut page,
        )
        .await;
    assert!(response.is_error);
    assert!(response.result.unwrap().contains("capture a new snapshot"));
    assert!(engine.actions().is_empty());
}

#[tokio::test]
async fn test_navigation_makes_old_references_stale() {
    let (engine, mut page) = page_with_iframe();
    let registry = ToolRegistry::with_defaults();

    registry.execute("snapshot", json!({}), &mut page).await;
    let navigated = registry
        .execute("navigate", json!({"url": "https://example.com/done"}), &mut page)
        .await;
    assert!(navigated.page_state.unwrap().contains("Thanks"));

    let response = registry.execute("click", json!({"ref": "f0s1e1"}), &mut page).await;
    assert!(response.is_error);
    let text = response.result.unwrap();
    assert!(text.contains("stale"), "{}", text);
    assert!(engine.actions().is_empty());
}

#[tokio::test]
async fn test_each_snapshot_is_a_new_generation() {
    let (_engine, mut page) = page_with_iframe();
    let registry = ToolRegistry::with_defaults();

    let first = registry.execute("snapshot", json!({}), &mut page).await;
    let second = registry.execute("snapshot", json!({}), &mut page).await;

    assert!(first.page_state.unwrap().contains("[ref=f0s1e1]"));
    let second = second.page_state.unwrap();
    assert!(second.contains("[ref=f0s2e1]"));
    assert!(!second.contains("s1e"));
}
