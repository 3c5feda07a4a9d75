//! OpenAI-style capability runtime.
//!
//! Emulates the `window.openai` object widgets expect: globals (theme,
//! locale, tool input/output, ...) plus `callTool`, `sendFollowUpMessage`,
//! `requestDisplayMode`, `setWidgetState`, `requestClose` and `openExternal`.
//!
//! The bootstrap script is embedded at compile time via `include_str!()`.

mod connection;
mod pending;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

pub use connection::OpenAiConnection;
use connection::ConnectionShared;

use crate::callbacks::HostCallbacks;
use crate::channel::MessageChannel;
use crate::runtime::{CapabilityRuntime, Connection, RuntimeOptions};

/// The guest bootstrap, wrapped in a script element.
pub const OPENAI_RUNTIME_CODE: &str =
    concat!("<script>", include_str!("../../bootstrap/openai_runtime.js"), "</script>");

/// The default capability runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiRuntime {
    options: RuntimeOptions,
}

impl OpenAiRuntime {
    /// Runtime name.
    pub const ID: &'static str = "openai";

    /// Create a runtime with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runtime with the given request policy.
    #[must_use]
    pub fn with_options(options: RuntimeOptions) -> Self {
        Self { options }
    }

    /// The request policy.
    #[must_use]
    pub fn options(&self) -> RuntimeOptions {
        self.options
    }
}

impl CapabilityRuntime for OpenAiRuntime {
    fn id(&self) -> &str {
        Self::ID
    }

    fn runtime_code(&self) -> &str {
        OPENAI_RUNTIME_CODE
    }

    fn request_options(&self) -> RuntimeOptions {
        self.options
    }

    /// Request tasks are spawned on the Tokio runtime current at this call,
    /// so the channel may deliver guest messages from any thread.
    fn connect(
        &self,
        channel: Arc<dyn MessageChannel>,
        callbacks: Arc<dyn HostCallbacks>,
    ) -> Box<dyn Connection> {
        let shared = Arc::new(ConnectionShared::new(
            Arc::clone(&channel),
            callbacks,
            self.options,
        ));
        let weak = Arc::downgrade(&shared);
        let subscription = channel.on_message(Arc::new(move |data: &Value| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_inbound(data);
            }
        }));
        debug!(runtime = Self::ID, "Runtime connected");
        Box::new(OpenAiConnection::new(shared, subscription))
    }
}

/// Shorthand for a shareable default [`OpenAiRuntime`].
#[must_use]
pub fn openai_runtime() -> Arc<dyn CapabilityRuntime> {
    Arc::new(OpenAiRuntime::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::Callbacks;
    use crate::channel::{ChannelAdapter, OutboundSink};
    use crate::error::{CallbackError, CallbackResult};
    use crate::hub::{InboundMessage, MessageHub};
    use serde_json::json;
    use skybridge_core::{DisplayMode, DisplayModeRequest, JsonObject, StateSnapshot};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    const ORIGIN: &str = "https://guest.openskybridge.test";

    struct Harness {
        hub: MessageHub,
        adapter: Arc<ChannelAdapter>,
        outbound: mpsc::UnboundedReceiver<Value>,
    }

    impl Harness {
        fn new() -> Self {
            let hub = MessageHub::new();
            let (tx, outbound) = mpsc::unbounded_channel();
            let sink: OutboundSink = Arc::new(move |v: Value| {
                let _ = tx.send(v);
            });
            let adapter = ChannelAdapter::attach(&hub, ORIGIN, sink);
            Self {
                hub,
                adapter,
                outbound,
            }
        }

        fn connect(&self, runtime: &OpenAiRuntime, callbacks: Callbacks) -> Box<dyn Connection> {
            runtime.connect(
                Arc::clone(&self.adapter) as Arc<dyn MessageChannel>,
                Arc::new(callbacks),
            )
        }

        fn guest(&self, data: Value) {
            self.hub.dispatch(&InboundMessage::new(ORIGIN, data));
        }

        async fn next(&mut self) -> Value {
            tokio::time::timeout(Duration::from_secs(1), self.outbound.recv())
                .await
                .expect("timed out waiting for outbound message")
                .expect("outbound channel closed")
        }

        async fn quiet(&mut self) -> bool {
            tokio::time::timeout(Duration::from_millis(50), self.outbound.recv())
                .await
                .is_err()
        }
    }

    fn weather_callbacks() -> Callbacks {
        Callbacks::new().on_call_tool(|name, args| async move {
            assert_eq!(name, "get_weather");
            assert_eq!(args["city"], "Tokyo");
            Ok(json!({ "content": { "temperature": "22°C" } }))
        })
    }

    #[test]
    fn test_runtime_code_is_a_script_element() {
        assert!(OPENAI_RUNTIME_CODE.starts_with("<script>"));
        assert!(OPENAI_RUNTIME_CODE.ends_with("</script>"));
        assert!(OPENAI_RUNTIME_CODE.contains("window.openai"));
        assert!(OPENAI_RUNTIME_CODE.contains("openai:set_globals"));
        assert_eq!(OpenAiRuntime::new().id(), "openai");
    }

    #[test]
    fn test_runtime_code_only_trusts_parent_window() {
        let listener = OPENAI_RUNTIME_CODE
            .split("addEventListener(\"message\"")
            .nth(1)
            .unwrap();
        let guard = listener.find("event.source !== window.parent").unwrap();
        assert!(guard < listener.find("data.type === \"state\"").unwrap());
        assert!(guard < listener.find("data.type === \"response\"").unwrap());
    }

    #[test]
    fn test_request_options_are_exposed_through_trait() {
        let options = RuntimeOptions::default().with_request_timeout(Duration::from_millis(5));
        let runtime: Arc<dyn CapabilityRuntime> = Arc::new(OpenAiRuntime::with_options(options));
        assert_eq!(runtime.request_options(), options);
        assert_eq!(openai_runtime().request_options(), RuntimeOptions::default());
    }

    #[tokio::test]
    async fn test_update_state_pushes_full_snapshot() {
        let mut h = Harness::new();
        let conn = h.connect(&OpenAiRuntime::new(), Callbacks::new());
        let state = StateSnapshot::default().with_locale("fr-FR");

        conn.update_state(&state);

        assert_eq!(
            h.next().await,
            json!({ "type": "state", "state": serde_json::to_value(&state).unwrap() })
        );
    }

    #[tokio::test]
    async fn test_call_tool_success() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), weather_callbacks());

        h.guest(json!({
            "type": "request", "id": "r1", "method": "callTool",
            "args": { "name": "get_weather", "args": { "city": "Tokyo" } }
        }));

        assert_eq!(
            h.next().await,
            json!({
                "type": "response", "id": "r1",
                "result": { "content": { "temperature": "22°C" } }
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_method_gets_error_regardless_of_args() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), weather_callbacks());

        h.guest(json!({ "type": "request", "id": "x9", "method": "frobnicate", "args": [1, 2] }));

        assert_eq!(
            h.next().await,
            json!({
                "type": "response", "id": "x9",
                "error": { "message": "Unknown method: frobnicate" }
            })
        );
    }

    #[tokio::test]
    async fn test_non_string_method_gets_error_response() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), weather_callbacks());

        h.guest(json!({ "type": "request", "id": "n1", "method": 5 }));

        assert_eq!(
            h.next().await,
            json!({
                "type": "response", "id": "n1",
                "error": { "message": "Unknown method: 5" }
            })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_dispatched_off_runtime_thread_is_answered() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), weather_callbacks());

        let hub = h.hub.clone();
        std::thread::spawn(move || {
            hub.dispatch(&InboundMessage::new(
                ORIGIN,
                json!({
                    "type": "request", "id": "bg", "method": "callTool",
                    "args": { "name": "get_weather", "args": { "city": "Tokyo" } }
                }),
            ));
        })
        .join()
        .unwrap();

        assert_eq!(
            h.next().await,
            json!({
                "type": "response", "id": "bg",
                "result": { "content": { "temperature": "22°C" } }
            })
        );
    }

    #[test]
    fn test_request_without_any_runtime_is_rejected() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), weather_callbacks());

        h.guest(json!({ "type": "request", "id": "nr", "method": "callTool", "args": { "name": "t" } }));

        assert_eq!(
            h.outbound.try_recv().unwrap(),
            json!({
                "type": "response", "id": "nr",
                "error": { "message": "No async runtime available" }
            })
        );
    }

    #[tokio::test]
    async fn test_callback_failure_becomes_error_response() {
        let mut h = Harness::new();
        let callbacks = Callbacks::new()
            .on_send_follow_up_message(|_| async { Err(CallbackError::failed("quota exceeded")) });
        let _conn = h.connect(&OpenAiRuntime::new(), callbacks);

        h.guest(json!({
            "type": "request", "id": "f1", "method": "sendFollowUpMessage",
            "args": { "prompt": "Tell me more" }
        }));

        assert_eq!(
            h.next().await,
            json!({ "type": "response", "id": "f1", "error": { "message": "quota exceeded" } })
        );
    }

    #[tokio::test]
    async fn test_missing_callback_reports_not_provided() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), Callbacks::new());

        h.guest(json!({
            "type": "request", "id": "m1", "method": "callTool",
            "args": { "name": "get_weather", "args": {} }
        }));

        assert_eq!(
            h.next().await,
            json!({ "type": "response", "id": "m1", "error": { "message": "onCallTool not provided" } })
        );
    }

    #[tokio::test]
    async fn test_void_callbacks_resolve_with_null_result() {
        let mut h = Harness::new();
        let stored = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&stored);
        let callbacks = Callbacks::new().on_set_widget_state(move |state| {
            *sink.lock().unwrap() = Some(state);
            async { Ok(()) }
        });
        let _conn = h.connect(&OpenAiRuntime::new(), callbacks);

        h.guest(json!({
            "type": "request", "id": "w1", "method": "setWidgetState", "args": { "count": 3 }
        }));

        assert_eq!(h.next().await, json!({ "type": "response", "id": "w1", "result": null }));
        assert_eq!(stored.lock().unwrap().as_ref().unwrap()["count"], 3);
    }

    #[tokio::test]
    async fn test_request_display_mode_returns_granted_mode() {
        let mut h = Harness::new();
        let callbacks = Callbacks::new().on_request_display_mode(|request| async move {
            assert_eq!(request.mode, DisplayMode::Fullscreen);
            Ok(DisplayModeRequest {
                mode: DisplayMode::Pip,
            })
        });
        let _conn = h.connect(&OpenAiRuntime::new(), callbacks);

        h.guest(json!({
            "type": "request", "id": 4, "method": "requestDisplayMode",
            "args": { "mode": "fullscreen" }
        }));

        assert_eq!(
            h.next().await,
            json!({ "type": "response", "id": 4, "result": { "mode": "pip" } })
        );
    }

    #[tokio::test]
    async fn test_invalid_call_tool_args() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), weather_callbacks());

        h.guest(json!({ "type": "request", "id": "bad", "method": "callTool", "args": {} }));

        let response = h.next().await;
        assert_eq!(response["id"], "bad");
        assert!(response.get("result").is_none());
        assert!(
            response["error"]["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid arguments for callTool")
        );
    }

    #[tokio::test]
    async fn test_request_close_without_callback_is_silent() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), Callbacks::new());

        h.guest(json!({ "type": "call", "method": "requestClose" }));

        assert!(h.quiet().await);
    }

    #[tokio::test]
    async fn test_fire_and_forget_calls_reach_callbacks() {
        let mut h = Harness::new();
        let closes = Arc::new(AtomicUsize::new(0));
        let links = Arc::new(Mutex::new(Vec::new()));
        let heights = Arc::new(Mutex::new(Vec::new()));
        let (c, l, r) = (Arc::clone(&closes), Arc::clone(&links), Arc::clone(&heights));
        let callbacks = Callbacks::new()
            .on_request_close(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_open_external(move |target| l.lock().unwrap().push(target.href))
            .on_resize(move |n| r.lock().unwrap().push(n.height));
        let _conn = h.connect(&OpenAiRuntime::new(), callbacks);

        h.guest(json!({ "type": "call", "method": "requestClose" }));
        h.guest(json!({ "type": "call", "method": "openExternal", "args": { "href": "https://example.com" } }));
        h.guest(json!({ "type": "call", "method": "openExternal", "args": { "url": "missing href" } }));
        h.guest(json!({ "type": "call", "method": "resize", "args": { "height": 320 } }));
        h.guest(json!({ "type": "call", "method": "somethingElse" }));

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(*links.lock().unwrap(), vec!["https://example.com".to_string()]);
        assert_eq!(*heights.lock().unwrap(), vec![320]);
        assert!(h.quiet().await);
    }

    async fn exploding_tool(_name: String, _args: JsonObject) -> CallbackResult<Value> {
        panic!("tool handler failure")
    }

    #[tokio::test]
    async fn test_panicking_callbacks_are_contained() {
        let mut h = Harness::new();
        let callbacks = Callbacks::new()
            .on_request_close(|| panic!("close handler failure"))
            .on_call_tool(exploding_tool);
        let _conn = h.connect(&OpenAiRuntime::new(), callbacks);

        h.guest(json!({ "type": "call", "method": "requestClose" }));
        h.guest(json!({
            "type": "request", "id": "p1", "method": "callTool", "args": { "name": "t" }
        }));

        assert_eq!(
            h.next().await,
            json!({ "type": "response", "id": "p1", "error": { "message": "Unknown error" } })
        );
    }

    #[tokio::test]
    async fn test_malformed_and_foreign_messages_are_ignored() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), weather_callbacks());

        h.guest(json!(42));
        h.guest(json!({ "type": "request", "method": "callTool" }));
        h.guest(json!({ "type": "response", "id": "r1", "result": 1 }));
        h.hub.dispatch(&InboundMessage::new(
            "https://other.test",
            json!({ "type": "request", "id": "r1", "method": "frobnicate" }),
        ));

        assert!(h.quiet().await);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_stops_delivery() {
        let mut h = Harness::new();
        let conn = h.connect(&OpenAiRuntime::new(), weather_callbacks());
        assert_eq!(h.adapter.handler_count(), 1);

        conn.disconnect();
        conn.disconnect();
        assert!(!conn.is_connected());
        assert_eq!(h.adapter.handler_count(), 0);

        h.guest(json!({ "type": "request", "id": "late", "method": "frobnicate" }));
        conn.update_state(&StateSnapshot::default());
        assert!(h.quiet().await);
    }

    #[tokio::test]
    async fn test_response_after_disconnect_is_dropped() {
        let mut h = Harness::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(Mutex::new(Some(release_rx)));
        let callbacks = Callbacks::new().on_call_tool(move |_, _| {
            let rx = release_rx.lock().unwrap().take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok(json!("late"))
            }
        });
        let conn = h.connect(&OpenAiRuntime::new(), callbacks);

        h.guest(json!({ "type": "request", "id": "slow", "method": "callTool", "args": { "name": "t" } }));
        tokio::task::yield_now().await;
        assert_eq!(conn.pending_requests(), 1);

        conn.disconnect();
        let _ = release_tx.send(());

        assert!(h.quiet().await);
    }

    #[tokio::test]
    async fn test_reject_pending_on_disconnect() {
        let mut h = Harness::new();
        let runtime = OpenAiRuntime::with_options(RuntimeOptions::default().rejecting_pending_on_disconnect());
        let callbacks =
            Callbacks::new().on_call_tool(|_, _| futures::future::pending::<Result<Value, CallbackError>>());
        let conn = h.connect(&runtime, callbacks);

        h.guest(json!({ "type": "request", "id": "hang", "method": "callTool", "args": { "name": "t" } }));
        tokio::task::yield_now().await;

        conn.disconnect();

        assert_eq!(
            h.next().await,
            json!({ "type": "response", "id": "hang", "error": { "message": "Connection disconnected" } })
        );
        assert_eq!(conn.pending_requests(), 0);
        assert!(h.quiet().await);
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let mut h = Harness::new();
        let runtime = OpenAiRuntime::with_options(
            RuntimeOptions::default().with_request_timeout(Duration::from_millis(20)),
        );
        let callbacks =
            Callbacks::new().on_call_tool(|_, _| futures::future::pending::<Result<Value, CallbackError>>());
        let _conn = h.connect(&runtime, callbacks);

        h.guest(json!({ "type": "request", "id": "t1", "method": "callTool", "args": { "name": "t" } }));

        assert_eq!(
            h.next().await,
            json!({ "type": "response", "id": "t1", "error": { "message": "callTool timed out" } })
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_each_answered() {
        let mut h = Harness::new();
        let _conn = h.connect(&OpenAiRuntime::new(), Callbacks::new());

        h.guest(json!({ "type": "request", "id": "dup", "method": "nope" }));
        h.guest(json!({ "type": "request", "id": "dup", "method": "nope" }));

        assert_eq!(h.next().await["id"], "dup");
        assert_eq!(h.next().await["id"], "dup");
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect_starts_clean() {
        let mut h = Harness::new();
        let runtime = OpenAiRuntime::new();
        let first = h.connect(&runtime, Callbacks::new());
        first.disconnect();

        let second = h.connect(&runtime, Callbacks::new());
        assert_eq!(h.adapter.handler_count(), 1);
        assert_eq!(second.pending_requests(), 0);

        h.guest(json!({ "type": "request", "id": "again", "method": "nope" }));
        assert_eq!(h.next().await["id"], "again");
        assert!(h.quiet().await);
    }
}
