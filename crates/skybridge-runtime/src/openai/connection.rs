//! Connection state and wire dispatch for the OpenAI-style runtime.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use skybridge_core::{
    CallMethod, CallToolArgs, DisplayModeRequest, ErrorPayload, FollowUpMessage, GuestMessage,
    HostMessage, JsonObject, OpenExternal, RequestId, RequestMethod, ResizeNotification, Response,
    StateSnapshot,
};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use super::pending::PendingRequests;
use crate::callbacks::HostCallbacks;
use crate::channel::{MessageChannel, Subscription};
use crate::error::{CallbackError, CallbackResult};
use crate::runtime::{Connection, RuntimeOptions};

/// State shared between a connection and its in-flight request tasks.
pub(crate) struct ConnectionShared {
    channel: Arc<dyn MessageChannel>,
    callbacks: Arc<dyn HostCallbacks>,
    options: RuntimeOptions,
    pending: PendingRequests,
    connected: AtomicBool,
    /// Executor for request tasks. Inbound messages may be dispatched
    /// from threads outside any Tokio context.
    handle: Option<Handle>,
}

impl ConnectionShared {
    pub(crate) fn new(
        channel: Arc<dyn MessageChannel>,
        callbacks: Arc<dyn HostCallbacks>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            channel,
            callbacks,
            options,
            pending: PendingRequests::new(),
            connected: AtomicBool::new(true),
            handle: Handle::try_current().ok(),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Entry point for every value the channel receives from the guest.
    pub(crate) fn handle_inbound(self: &Arc<Self>, data: &Value) {
        if !self.is_connected() {
            return;
        }
        let message = match GuestMessage::decode(data) {
            Ok(Some(message)) => message,
            Ok(None) => {
                trace!("Ignoring non-protocol message");
                return;
            },
            Err(e) => {
                warn!(error = %e, "Dropping malformed guest message");
                return;
            },
        };

        match message {
            GuestMessage::Call { method, args } => {
                self.handle_call(&CallMethod::parse(&method), args);
            },
            GuestMessage::Request { id, method, args } => {
                self.spawn_request(id, RequestMethod::from_wire(&method), args);
            },
        }
    }

    fn handle_call(&self, method: &CallMethod, args: Value) {
        debug!(method = %method, "Guest call");
        let callbacks = &self.callbacks;
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| match method {
            CallMethod::RequestClose => callbacks.request_close(),
            CallMethod::OpenExternal => match serde_json::from_value::<OpenExternal>(args) {
                Ok(target) => callbacks.open_external(target),
                Err(e) => warn!(method = %method, error = %e, "Ignoring call with invalid arguments"),
            },
            CallMethod::Resize => match serde_json::from_value::<ResizeNotification>(args) {
                Ok(notification) => callbacks.resize(notification),
                Err(e) => warn!(method = %method, error = %e, "Ignoring call with invalid arguments"),
            },
            CallMethod::Unknown(name) => trace!(method = %name, "Ignoring unknown call"),
        }));
        if let Err(e) = result {
            warn!(method = %method, error = ?e, "Call handler panicked");
        }
    }

    fn spawn_request(self: &Arc<Self>, id: RequestId, method: RequestMethod, args: Value) {
        debug!(request_id = %id, method = %method, "Guest request");
        let Some(handle) = self.handle.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(request_id = %id, method = %method, "No async runtime for request");
            self.respond(Response::failure(id, ErrorPayload::new("No async runtime available")));
            return;
        };
        let (ticket, cancel) = self.pending.insert(id.clone(), method.clone());
        let shared = Arc::clone(self);

        handle.spawn(async move {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return,
                outcome = shared.execute(&method, args) => outcome,
            };
            if !shared.pending.complete(ticket) {
                trace!(request_id = %id, "Request already answered");
                return;
            }
            if let Err(e) = &outcome {
                debug!(request_id = %id, method = %method, error = %e, "Request failed");
            }
            shared.respond(Response::from_outcome(id, outcome.map_err(ErrorPayload::from)));
        });
    }

    async fn execute(&self, method: &RequestMethod, args: Value) -> CallbackResult<Value> {
        let invocation = AssertUnwindSafe(self.invoke(method, args)).catch_unwind();
        let settled = match self.options.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(settled) => settled,
                Err(_) => return Err(CallbackError::TimedOut(method.to_string())),
            },
            None => invocation.await,
        };
        settled.unwrap_or_else(|e| {
            warn!(method = %method, error = ?e, "Request handler panicked");
            Err(CallbackError::Panicked)
        })
    }

    async fn invoke(&self, method: &RequestMethod, args: Value) -> CallbackResult<Value> {
        match method {
            RequestMethod::CallTool => {
                let CallToolArgs { name, args } = decode_args(method, args)?;
                self.callbacks.call_tool(name, args).await
            },
            RequestMethod::SendFollowUpMessage => {
                let message: FollowUpMessage = decode_args(method, args)?;
                self.callbacks
                    .send_follow_up_message(message)
                    .await
                    .map(|()| Value::Null)
            },
            RequestMethod::RequestDisplayMode => {
                let request: DisplayModeRequest = decode_args(method, args)?;
                let granted = self.callbacks.request_display_mode(request).await?;
                serde_json::to_value(granted).map_err(CallbackError::failed)
            },
            RequestMethod::SetWidgetState => {
                let state: JsonObject = decode_args(method, args)?;
                self.callbacks
                    .set_widget_state(state)
                    .await
                    .map(|()| Value::Null)
            },
            RequestMethod::Unknown(name) => Err(CallbackError::UnknownMethod(name.clone())),
        }
    }

    fn respond(&self, response: Response) {
        if !self.is_connected() {
            debug!(request_id = %response.id, "Dropping response after disconnect");
            return;
        }
        trace!(request_id = %response.id, is_error = response.is_error(), "Sending response");
        self.send(&HostMessage::Response(response));
    }

    fn send(&self, message: &HostMessage) {
        match message.to_value() {
            Ok(value) => self.channel.post_message(value),
            Err(e) => warn!(error = %e, "Failed to encode host message"),
        }
    }
}

fn decode_args<T: DeserializeOwned>(method: &RequestMethod, args: Value) -> CallbackResult<T> {
    serde_json::from_value(args).map_err(|e| CallbackError::InvalidArguments {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// Connection returned by [`super::OpenAiRuntime::connect`].
pub struct OpenAiConnection {
    shared: Arc<ConnectionShared>,
    subscription: Subscription,
}

impl OpenAiConnection {
    pub(crate) fn new(shared: Arc<ConnectionShared>, subscription: Subscription) -> Self {
        Self {
            shared,
            subscription,
        }
    }
}

impl Connection for OpenAiConnection {
    fn update_state(&self, state: &StateSnapshot) {
        if !self.shared.is_connected() {
            trace!("Ignoring state update on disconnected connection");
            return;
        }
        self.shared.send(&HostMessage::state(state.clone()));
    }

    fn disconnect(&self) {
        if !self.shared.connected.swap(false, Ordering::AcqRel) {
            return;
        }

        let pending = self.shared.pending.drain();
        if self.shared.options.reject_pending_on_disconnect {
            for request in pending {
                request.cancel.cancel();
                debug!(
                    request_id = %request.id,
                    method = %request.method,
                    "Rejecting pending request on disconnect"
                );
                self.shared.send(&HostMessage::Response(Response::failure(
                    request.id,
                    CallbackError::Disconnected.to_payload(),
                )));
            }
        } else if !pending.is_empty() {
            debug!(
                count = pending.len(),
                "Disconnecting with requests still in flight; they will not be answered"
            );
        }

        self.subscription.unsubscribe();
        debug!("Runtime disconnected");
    }

    fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }
}

impl Drop for OpenAiConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
