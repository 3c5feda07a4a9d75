//! Host capabilities a guest may invoke.
//!
//! [`HostCallbacks`] is the fixed capability set a runtime dispatches into.
//! Every method has a default: request-shaped capabilities fail with
//! [`CallbackError::NotProvided`], fire-and-forget ones do nothing. Hosts
//! either implement the trait directly or assemble a [`Callbacks`] value from
//! closures.
//!
//! [`CallbackCell`] is the latest-value holder the bridge hands to a runtime
//! at connect time. The host replaces its contents on every re-render, and
//! each invocation reads the current value, so a runtime never needs to be
//! reconnected just because a callback changed.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use skybridge_core::{
    DisplayModeRequest, FollowUpMessage, JsonObject, OpenExternal, ResizeNotification,
};

use crate::error::{CallbackError, CallbackResult};

/// Capabilities the host exposes to the guest.
#[async_trait]
pub trait HostCallbacks: Send + Sync {
    /// Run a tool on the guest's behalf.
    async fn call_tool(&self, name: String, args: JsonObject) -> CallbackResult<Value> {
        let _ = (name, args);
        Err(CallbackError::NotProvided("onCallTool"))
    }

    /// The guest asked to be closed.
    fn request_close(&self) {}

    /// Send a follow-up message into the conversation.
    async fn send_follow_up_message(&self, message: FollowUpMessage) -> CallbackResult<()> {
        let _ = message;
        Err(CallbackError::NotProvided("onSendFollowUpMessage"))
    }

    /// The guest asked to open a link outside the surface.
    fn open_external(&self, target: OpenExternal) {
        let _ = target;
    }

    /// Change the display mode. Returns the mode actually granted.
    async fn request_display_mode(
        &self,
        request: DisplayModeRequest,
    ) -> CallbackResult<DisplayModeRequest> {
        let _ = request;
        Err(CallbackError::NotProvided("onRequestDisplayMode"))
    }

    /// Persist new widget state.
    async fn set_widget_state(&self, state: JsonObject) -> CallbackResult<()> {
        let _ = state;
        Err(CallbackError::NotProvided("onSetWidgetState"))
    }

    /// The guest reported its intrinsic height.
    fn resize(&self, notification: ResizeNotification) {
        let _ = notification;
    }
}

type CallToolFn =
    Arc<dyn Fn(String, JsonObject) -> BoxFuture<'static, CallbackResult<Value>> + Send + Sync>;
type FollowUpFn =
    Arc<dyn Fn(FollowUpMessage) -> BoxFuture<'static, CallbackResult<()>> + Send + Sync>;
type DisplayModeFn = Arc<
    dyn Fn(DisplayModeRequest) -> BoxFuture<'static, CallbackResult<DisplayModeRequest>>
        + Send
        + Sync,
>;
type WidgetStateFn =
    Arc<dyn Fn(JsonObject) -> BoxFuture<'static, CallbackResult<()>> + Send + Sync>;
type CloseFn = Arc<dyn Fn() + Send + Sync>;
type OpenExternalFn = Arc<dyn Fn(OpenExternal) + Send + Sync>;
type ResizeFn = Arc<dyn Fn(ResizeNotification) + Send + Sync>;

/// Closure-based capability set. Every callback is optional.
///
/// ```rust
/// use serde_json::json;
/// use skybridge_runtime::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_call_tool(|name, _args| async move { Ok(json!({ "tool": name })) })
///     .on_request_close(|| println!("close requested"));
/// assert!(callbacks.provides_call_tool());
/// ```
#[derive(Clone, Default)]
pub struct Callbacks {
    on_call_tool: Option<CallToolFn>,
    on_request_close: Option<CloseFn>,
    on_send_follow_up_message: Option<FollowUpFn>,
    on_open_external: Option<OpenExternalFn>,
    on_request_display_mode: Option<DisplayModeFn>,
    on_set_widget_state: Option<WidgetStateFn>,
    on_resize: Option<ResizeFn>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_call_tool", &self.on_call_tool.is_some())
            .field("on_request_close", &self.on_request_close.is_some())
            .field(
                "on_send_follow_up_message",
                &self.on_send_follow_up_message.is_some(),
            )
            .field("on_open_external", &self.on_open_external.is_some())
            .field(
                "on_request_display_mode",
                &self.on_request_display_mode.is_some(),
            )
            .field("on_set_widget_state", &self.on_set_widget_state.is_some())
            .field("on_resize", &self.on_resize.is_some())
            .finish()
    }
}

impl Callbacks {
    /// An empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply `onCallTool`.
    #[must_use]
    pub fn on_call_tool<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String, JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult<Value>> + Send + 'static,
    {
        self.on_call_tool = Some(Arc::new(move |name: String, args: JsonObject| {
            f(name, args).boxed()
        }));
        self
    }

    /// Supply `onRequestClose`.
    #[must_use]
    pub fn on_request_close<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_request_close = Some(Arc::new(f));
        self
    }

    /// Supply `onSendFollowUpMessage`.
    #[must_use]
    pub fn on_send_follow_up_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FollowUpMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult<()>> + Send + 'static,
    {
        self.on_send_follow_up_message = Some(Arc::new(move |message: FollowUpMessage| {
            f(message).boxed()
        }));
        self
    }

    /// Supply `onOpenExternal`.
    #[must_use]
    pub fn on_open_external<F>(mut self, f: F) -> Self
    where
        F: Fn(OpenExternal) + Send + Sync + 'static,
    {
        self.on_open_external = Some(Arc::new(f));
        self
    }

    /// Supply `onRequestDisplayMode`.
    #[must_use]
    pub fn on_request_display_mode<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(DisplayModeRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult<DisplayModeRequest>> + Send + 'static,
    {
        self.on_request_display_mode = Some(Arc::new(move |request: DisplayModeRequest| {
            f(request).boxed()
        }));
        self
    }

    /// Supply `onSetWidgetState`.
    #[must_use]
    pub fn on_set_widget_state<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult<()>> + Send + 'static,
    {
        self.on_set_widget_state = Some(Arc::new(move |state: JsonObject| f(state).boxed()));
        self
    }

    /// Supply `onResize`.
    #[must_use]
    pub fn on_resize<F>(mut self, f: F) -> Self
    where
        F: Fn(ResizeNotification) + Send + Sync + 'static,
    {
        self.on_resize = Some(Arc::new(f));
        self
    }

    /// Whether `onCallTool` is supplied.
    #[must_use]
    pub fn provides_call_tool(&self) -> bool {
        self.on_call_tool.is_some()
    }
}

#[async_trait]
impl HostCallbacks for Callbacks {
    async fn call_tool(&self, name: String, args: JsonObject) -> CallbackResult<Value> {
        match &self.on_call_tool {
            Some(f) => f(name, args).await,
            None => Err(CallbackError::NotProvided("onCallTool")),
        }
    }

    fn request_close(&self) {
        if let Some(f) = &self.on_request_close {
            f();
        }
    }

    async fn send_follow_up_message(&self, message: FollowUpMessage) -> CallbackResult<()> {
        match &self.on_send_follow_up_message {
            Some(f) => f(message).await,
            None => Err(CallbackError::NotProvided("onSendFollowUpMessage")),
        }
    }

    fn open_external(&self, target: OpenExternal) {
        if let Some(f) = &self.on_open_external {
            f(target);
        }
    }

    async fn request_display_mode(
        &self,
        request: DisplayModeRequest,
    ) -> CallbackResult<DisplayModeRequest> {
        match &self.on_request_display_mode {
            Some(f) => f(request).await,
            None => Err(CallbackError::NotProvided("onRequestDisplayMode")),
        }
    }

    async fn set_widget_state(&self, state: JsonObject) -> CallbackResult<()> {
        match &self.on_set_widget_state {
            Some(f) => f(state).await,
            None => Err(CallbackError::NotProvided("onSetWidgetState")),
        }
    }

    fn resize(&self, notification: ResizeNotification) {
        if let Some(f) = &self.on_resize {
            f(notification);
        }
    }
}

/// Mutable holder for the host's latest callbacks.
pub struct CallbackCell {
    current: RwLock<Arc<dyn HostCallbacks>>,
}

impl std::fmt::Debug for CallbackCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackCell").finish_non_exhaustive()
    }
}

impl CallbackCell {
    /// Create a cell holding `callbacks`.
    #[must_use]
    pub fn new(callbacks: Arc<dyn HostCallbacks>) -> Self {
        Self {
            current: RwLock::new(callbacks),
        }
    }

    /// Replace the held callbacks. In-flight invocations keep the value they
    /// started with.
    pub fn replace(&self, callbacks: Arc<dyn HostCallbacks>) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = callbacks;
    }

    /// The callbacks currently held.
    #[must_use]
    pub fn current(&self) -> Arc<dyn HostCallbacks> {
        Arc::clone(
            &self
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl Default for CallbackCell {
    fn default() -> Self {
        Self::new(Arc::new(Callbacks::new()))
    }
}

#[async_trait]
impl HostCallbacks for CallbackCell {
    async fn call_tool(&self, name: String, args: JsonObject) -> CallbackResult<Value> {
        let callbacks = self.current();
        callbacks.call_tool(name, args).await
    }

    fn request_close(&self) {
        self.current().request_close();
    }

    async fn send_follow_up_message(&self, message: FollowUpMessage) -> CallbackResult<()> {
        let callbacks = self.current();
        callbacks.send_follow_up_message(message).await
    }

    fn open_external(&self, target: OpenExternal) {
        self.current().open_external(target);
    }

    async fn request_display_mode(
        &self,
        request: DisplayModeRequest,
    ) -> CallbackResult<DisplayModeRequest> {
        let callbacks = self.current();
        callbacks.request_display_mode(request).await
    }

    async fn set_widget_state(&self, state: JsonObject) -> CallbackResult<()> {
        let callbacks = self.current();
        callbacks.set_widget_state(state).await
    }

    fn resize(&self, notification: ResizeNotification) {
        self.current().resize(notification);
    }
}
