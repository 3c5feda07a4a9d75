//! Test fixtures: payloads, state snapshots and recording callbacks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use skybridge_core::{
    DisplayMode, DisplayModeRequest, FollowUpMessage, JsonObject, OpenExternal,
    ResizeNotification, StateSnapshot,
};
use skybridge_runtime::{CallbackError, CallbackResult, HostCallbacks};

/// A small widget document with a `<head>`.
pub const WIDGET_HTML: &str = "<!doctype html><html><head><title>Widget</title></head><body><div id=\"root\"></div></body></html>";

/// A distinct widget document per `label`.
#[must_use]
pub fn test_payload(label: &str) -> String {
    format!(
        "<!doctype html><html><head><title>{label}</title></head><body><p>{label}</p></body></html>"
    )
}

/// A JSON object literal, for tool inputs and widget state.
///
/// # Panics
///
/// Panics if `value` is not an object.
#[must_use]
pub fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Default state with `toolInput` set to `{ "query": query }`.
#[must_use]
pub fn test_state(query: &str) -> StateSnapshot {
    StateSnapshot::default().with_tool_input(object(json!({ "query": query })))
}

/// The result the weather tool returns.
#[must_use]
pub fn weather_tool_result() -> Value {
    json!({ "temp": 21 })
}

/// A guest `callTool` request for the weather tool.
#[must_use]
pub fn weather_tool_args() -> Value {
    json!({ "name": "weather", "args": { "city": "Paris" } })
}

/// One host capability invocation seen by [`RecordingCallbacks`].
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// `call_tool(name, args)`.
    CallTool(String, JsonObject),
    /// `request_close()`.
    RequestClose,
    /// `send_follow_up_message(prompt)`.
    FollowUp(String),
    /// `open_external(href)`.
    OpenExternal(String),
    /// `request_display_mode(mode)`.
    DisplayMode(DisplayMode),
    /// `set_widget_state(state)`.
    WidgetState(JsonObject),
    /// `resize(height)`.
    Resize(u32),
}

/// Host callbacks that record every invocation.
///
/// `call_tool` answers with a fixed result (or error), display-mode requests
/// are granted as asked, and everything else succeeds. Clones share the same
/// log, so a test can keep one and hand another to the bridge.
#[derive(Debug, Clone)]
pub struct RecordingCallbacks {
    label: String,
    tool_result: Result<Value, String>,
    log: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingCallbacks {
    /// Callbacks whose tool returns [`weather_tool_result`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            label: String::new(),
            tool_result: Ok(weather_tool_result()),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Tag this instance; its tool result becomes `{ "from": label }`.
    #[must_use]
    pub fn labelled(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            tool_result: Ok(json!({ "from": label })),
            label,
            ..Self::new()
        }
    }

    /// Make `call_tool` succeed with `result`.
    #[must_use]
    pub fn with_tool_result(mut self, result: Value) -> Self {
        self.tool_result = Ok(result);
        self
    }

    /// Make `call_tool` fail with `message`.
    #[must_use]
    pub fn with_tool_error(mut self, message: impl Into<String>) -> Self {
        self.tool_result = Err(message.into());
        self
    }

    /// The instance label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().expect("log lock").clone()
    }

    /// Number of recorded invocations.
    #[must_use]
    pub fn invocation_count(&self) -> usize {
        self.log.lock().expect("log lock").len()
    }

    fn record(&self, invocation: Invocation) {
        self.log.lock().expect("log lock").push(invocation);
    }
}

impl Default for RecordingCallbacks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostCallbacks for RecordingCallbacks {
    async fn call_tool(&self, name: String, args: JsonObject) -> CallbackResult<Value> {
        self.record(Invocation::CallTool(name, args));
        self.tool_result.clone().map_err(CallbackError::Failed)
    }

    fn request_close(&self) {
        self.record(Invocation::RequestClose);
    }

    async fn send_follow_up_message(&self, message: FollowUpMessage) -> CallbackResult<()> {
        self.record(Invocation::FollowUp(message.prompt));
        Ok(())
    }

    fn open_external(&self, target: OpenExternal) {
        self.record(Invocation::OpenExternal(target.href));
    }

    async fn request_display_mode(
        &self,
        request: DisplayModeRequest,
    ) -> CallbackResult<DisplayModeRequest> {
        self.record(Invocation::DisplayMode(request.mode));
        Ok(request)
    }

    async fn set_widget_state(&self, state: JsonObject) -> CallbackResult<()> {
        self.record(Invocation::WidgetState(state));
        Ok(())
    }

    fn resize(&self, notification: ResizeNotification) {
        self.record(Invocation::Resize(notification.height));
    }
}
