//! Capability runtime abstraction.
//!
//! A runtime decides *what* capability surface the guest sees (the bootstrap
//! code injected into the payload and the wire methods it understands); the
//! [`MessageChannel`] decides *how* messages cross the boundary. The bridge
//! only ever talks to these two traits.

use std::sync::Arc;
use std::time::Duration;

use skybridge_core::StateSnapshot;

use crate::callbacks::HostCallbacks;
use crate::channel::MessageChannel;

/// A pluggable guest capability emulation.
pub trait CapabilityRuntime: Send + Sync {
    /// Stable name of this runtime (e.g. `"openai"`).
    fn id(&self) -> &str;

    /// Bootstrap code inserted into the payload's head before rendering.
    fn runtime_code(&self) -> &str;

    /// Bind to `channel`, dispatching guest invocations into `callbacks`.
    ///
    /// Implementations must keep all per-binding state inside the returned
    /// connection, so a later `connect` after a disconnect starts clean.
    /// Request handling spawns onto the Tokio runtime current at this call.
    fn connect(
        &self,
        channel: Arc<dyn MessageChannel>,
        callbacks: Arc<dyn HostCallbacks>,
    ) -> Box<dyn Connection>;

    /// Request policy applied to connections made by this runtime.
    ///
    /// A live connection keeps the policy it was created with, so hosts
    /// remount when this changes.
    fn request_options(&self) -> RuntimeOptions {
        RuntimeOptions::default()
    }
}

/// Live binding between a runtime and one channel.
pub trait Connection: Send + Sync {
    /// Push a full state snapshot to the guest.
    fn update_state(&self, state: &StateSnapshot);

    /// Remove the inbound subscription. Idempotent.
    fn disconnect(&self);

    /// Whether the connection is still live.
    fn is_connected(&self) -> bool;

    /// Number of guest requests whose response has not been sent yet.
    fn pending_requests(&self) -> usize {
        0
    }
}

/// Request handling policy for a runtime.
///
/// The defaults match the behavior guests were written against: no timeout,
/// and in-flight requests are left unanswered when the connection goes away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Fail a request whose callback has not settled within this duration.
    pub request_timeout: Option<Duration>,
    /// On disconnect, cancel in-flight callbacks and answer each pending
    /// request with a `Connection disconnected` error.
    pub reject_pending_on_disconnect: bool,
}

impl RuntimeOptions {
    /// Set the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Reject pending requests on disconnect.
    #[must_use]
    pub fn rejecting_pending_on_disconnect(mut self) -> Self {
        self.reject_pending_on_disconnect = true;
        self
    }
}
