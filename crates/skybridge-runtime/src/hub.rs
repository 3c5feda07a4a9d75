//! The host's shared inbound message stream.
//!
//! Every isolated surface posts into the same host-side stream, each message
//! tagged with the effective origin of its sender. Listeners are notified
//! synchronously in the dispatching thread; a listener that panics is logged
//! and does not affect the others.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// A message received from some guest, with the sender's effective origin.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Effective origin of the sending surface.
    pub origin: String,
    /// The structured payload.
    pub data: Value,
}

impl InboundMessage {
    /// Create an inbound message.
    #[must_use]
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// Listener callback type.
pub type InboundListener = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Registration handle for a hub listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Shared inbound message stream.
///
/// Cloning a `MessageHub` creates a new handle to the same listener set.
#[derive(Clone, Default)]
pub struct MessageHub {
    listeners: Arc<RwLock<HashMap<ListenerId, InboundListener>>>,
}

impl std::fmt::Debug for MessageHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHub")
            .field("listener_count", &self.len())
            .finish()
    }
}

impl MessageHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener to the stream.
    pub fn listen(&self, listener: InboundListener) -> ListenerId {
        let id = ListenerId::new();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        debug!(listener_id = ?id, "Inbound listener attached");
        id
    }

    /// Detach a listener.
    ///
    /// Returns `true` if the listener was found and removed.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let removed = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!(listener_id = ?id, "Inbound listener detached");
        }
        removed
    }

    /// Deliver a message to every attached listener.
    ///
    /// Listeners are snapshotted before delivery, so a listener may detach
    /// itself (or others) while handling a message.
    ///
    /// Returns the number of listeners notified.
    pub fn dispatch(&self, message: &InboundMessage) -> usize {
        let listeners: Vec<(ListenerId, InboundListener)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        trace!(
            origin = %message.origin,
            listener_count = listeners.len(),
            "Dispatching inbound message"
        );

        for (id, listener) in &listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(message);
            }));
            if let Err(e) = result {
                warn!(listener_id = ?id, error = ?e, "Inbound listener panicked");
            }
        }

        listeners.len()
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no listener is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
