//! Integration tests for the bridge mount lifecycle.
//!
//! Covers materialization, the first state push, surface failures, the
//! teardown-during-render race and teardown ordering.

use std::sync::Arc;

use serde_json::{Value, json};
use skybridge_bridge::{
    IsolationKey, MountPhase, RenderedFrame, SandboxPolicy, SkybridgeProps,
};
use skybridge_core::{DisplayMode, JsonObject};
use skybridge_runtime::{
    CallbackResult, Callbacks, InboundMessage, OPENAI_RUNTIME_CODE, OpenAiRuntime, RuntimeOptions,
    openai_runtime,
};
use skybridge_test::prelude::*;

fn default_snapshot_with_query(query: &str) -> Value {
    json!({
        "theme": "light",
        "userAgent": {
            "device": { "type": "unknown" },
            "capabilities": { "hover": false, "touch": false }
        },
        "locale": "en-US",
        "maxHeight": 0,
        "displayMode": "inline",
        "safeArea": { "insets": { "top": 0, "bottom": 0, "left": 0, "right": 0 } },
        "toolInput": { "query": query },
        "toolOutput": null,
        "toolResponseMetadata": null,
        "widgetState": null
    })
}

async fn never_settles(_name: String, _args: JsonObject) -> CallbackResult<Value> {
    std::future::pending().await
}

#[tokio::test]
async fn test_first_message_is_full_default_snapshot() {
    setup_test_logging_default();
    let harness = BridgeHarness::new();
    let props = harness
        .props()
        .with_state(test_state("x").with_display_mode(DisplayMode::Inline));

    let (bridge, frame) = harness.mount_connected(props).await;

    assert_eq!(bridge.phase(), MountPhase::Connected);
    assert_eq!(
        frame.next_message().await,
        json!({ "type": "state", "state": default_snapshot_with_query("x") })
    );
    assert!(frame.is_silent().await);
}

#[tokio::test]
async fn test_render_request_carries_injected_payload_and_salt() {
    let harness = BridgeHarness::new();
    let (bridge, frame) = harness.mount_connected(harness.props()).await;

    let key = IsolationKey::derive(WIDGET_HTML);
    assert_eq!(bridge.isolation_key(), Some(key.clone()));

    let requests = harness.surface.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.salt, key);
    assert_eq!(request.product, "openskybridge");
    assert_eq!(request.sandbox, SandboxPolicy::default());

    let expected_head = format!("<head>{OPENAI_RUNTIME_CODE}<title>");
    assert!(frame.html().contains(&expected_head));
    assert_eq!(frame.html().matches(OPENAI_RUNTIME_CODE).count(), 1);
    assert_eq!(
        frame.origin(),
        format!("https://{}.openskybridge.sandbox.test", key.short())
    );
}

#[tokio::test]
async fn test_surface_failure_settles_in_failed_phase() {
    let harness = BridgeHarness::new();
    harness.surface.fail_with("renderer unavailable");

    let bridge = harness.mount(harness.props());

    assert_eq!(bridge.wait_connected().await, MountPhase::Failed);
    assert!(harness.surface.frames().is_empty());
    assert!(harness.hub.is_empty());
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn test_opaque_origin_fails_and_disposes_frame() {
    let harness = BridgeHarness::new();
    harness.surface.force_origin("null");

    let bridge = harness.mount(harness.props());

    assert_eq!(bridge.wait_connected().await, MountPhase::Failed);
    let frame = harness.surface.wait_for_frame(1).await;
    assert!(frame.is_disposed());
    assert_eq!(frame.sent_count(), 0);
    assert!(harness.hub.is_empty());
}

#[tokio::test]
async fn test_unmount_during_render_never_connects() {
    let harness = BridgeHarness::gated();
    let mut bridge = harness.mount(harness.props());

    harness.surface.wait_for_renders_started(1).await;
    assert_eq!(bridge.phase(), MountPhase::Rendering);

    bridge.unmount();
    assert_eq!(bridge.phase(), MountPhase::Disposed);

    harness.surface.release(1);
    let frame = harness.surface.wait_for_frame(1).await;
    eventually(|| frame.is_disposed()).await;

    assert_eq!(frame.dispose_calls(), 1);
    assert_eq!(frame.sent_count(), 0);
    assert!(harness.hub.is_empty());
    assert_eq!(bridge.phase(), MountPhase::Disposed);

    // Nothing is listening for the frame's origin.
    let delivered = harness.hub.dispatch(&InboundMessage::new(
        frame.origin(),
        json!({ "type": "call", "method": "requestClose" }),
    ));
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn test_unmount_is_idempotent() {
    let harness = BridgeHarness::new();
    let (mut bridge, frame) = harness.mount_connected(harness.props()).await;

    bridge.unmount();
    bridge.unmount();
    drop(bridge);

    assert!(frame.is_disposed());
    assert_eq!(frame.dispose_calls(), 1);
    assert!(harness.hub.is_empty());
}

#[tokio::test]
async fn test_drop_unmounts() {
    let harness = BridgeHarness::new();
    let (bridge, frame) = harness.mount_connected(harness.props()).await;
    assert_eq!(harness.hub.len(), 1);

    drop(bridge);

    assert!(frame.is_disposed());
    assert!(harness.hub.is_empty());
}

#[tokio::test]
async fn test_no_traffic_after_unmount() {
    let harness = BridgeHarness::new();
    let callbacks = RecordingCallbacks::new();
    let props = harness.props().with_callbacks(callbacks.clone());
    let (mut bridge, frame) = harness.mount_connected(props).await;
    frame.next_message().await;

    bridge.unmount();
    frame.guest_request("late", "callTool", weather_tool_args());
    frame.guest_call("requestClose", None);

    assert!(frame.is_silent().await);
    assert_eq!(callbacks.invocation_count(), 0);
    assert_eq!(frame.sent_after_dispose(), 0);
}

#[tokio::test]
async fn test_update_after_unmount_is_ignored() {
    let harness = BridgeHarness::new();
    let (mut bridge, frame) = harness.mount_connected(harness.props()).await;
    frame.next_message().await;

    bridge.unmount();
    bridge.update(SkybridgeProps::new(openai_runtime(), test_payload("other")));
    bridge.update_state(test_state("ignored"));

    assert_eq!(harness.surface.requests().len(), 1);
    assert_eq!(bridge.phase(), MountPhase::Disposed);
    assert_eq!(frame.sent_after_dispose(), 0);
}

#[tokio::test]
async fn test_pending_requests_rejected_before_surface_disposed() {
    let harness = BridgeHarness::new();
    let runtime = Arc::new(OpenAiRuntime::with_options(
        RuntimeOptions::default().rejecting_pending_on_disconnect(),
    ));
    let props = SkybridgeProps::new(runtime, WIDGET_HTML)
        .with_callbacks(Callbacks::new().on_call_tool(never_settles));
    let (mut bridge, frame) = harness.mount_connected(props).await;
    frame.next_message().await;

    frame.guest_request("slow", "callTool", weather_tool_args());
    eventually(|| bridge.pending_requests() == 1).await;

    bridge.unmount();

    assert_eq!(
        frame.next_message().await,
        json!({
            "type": "response",
            "id": "slow",
            "error": { "message": "Connection disconnected" }
        })
    );
    assert!(frame.is_disposed());
    assert_eq!(frame.sent_after_dispose(), 0);
    assert!(frame.is_silent().await);
}

#[tokio::test]
async fn test_pending_requests_left_unanswered_by_default() {
    let harness = BridgeHarness::new();
    let props = harness
        .props()
        .with_callbacks(Callbacks::new().on_call_tool(never_settles));
    let (mut bridge, frame) = harness.mount_connected(props).await;
    frame.next_message().await;

    frame.guest_request("slow", "callTool", weather_tool_args());
    eventually(|| bridge.pending_requests() == 1).await;

    bridge.unmount();

    assert!(frame.is_silent().await);
    assert_eq!(frame.sent_after_dispose(), 0);
}
