//! Message channel between the host and one isolated surface.
//!
//! [`MessageChannel`] is the only transport a capability runtime sees: post a
//! structured value toward the guest, and subscribe to values coming back.
//! [`ChannelAdapter`] is the concrete channel for a rendered surface. It owns
//! its handler set and attaches a single listener to the shared
//! [`MessageHub`], forwarding only messages whose origin matches the surface.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::hub::{InboundMessage, ListenerId, MessageHub};

/// Handler invoked for every value received from the guest.
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Outbound sink that enqueues one value toward the guest.
pub type OutboundSink = Arc<dyn Fn(Value) + Send + Sync>;

/// Structured, bidirectional message transport.
pub trait MessageChannel: Send + Sync {
    /// Send one structured value toward the guest.
    fn post_message(&self, data: Value);

    /// Register a handler for values received from the guest.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    fn on_message(&self, handler: MessageHandler) -> Subscription;
}

/// Ordered set of message handlers owned by one channel.
#[derive(Default)]
pub struct HandlerSet {
    next_id: AtomicU64,
    handlers: RwLock<BTreeMap<u64, MessageHandler>>,
}

impl HandlerSet {
    /// Create an empty handler set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler, returning a subscription that removes exactly it.
    pub fn subscribe(self: &Arc<Self>, handler: MessageHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handler);
        Subscription {
            handlers: Arc::downgrade(self),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Invoke every handler with `data`, in registration order.
    ///
    /// Returns the number of handlers invoked.
    pub fn notify(&self, data: &Value) -> usize {
        let handlers: Vec<MessageHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for handler in &handlers {
            handler(data);
        }
        handlers.len()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }
}

/// Disposer for a registered message handler.
///
/// Unsubscribing is idempotent. Dropping the subscription unsubscribes.
#[must_use = "dropping a Subscription immediately removes its handler"]
pub struct Subscription {
    handlers: Weak<HandlerSet>,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the handler. Later calls are no-ops.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.remove(self.id);
        }
    }

    /// Whether the handler is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Channel bound to one rendered surface.
///
/// Inbound messages are accepted only when their origin equals the surface's
/// effective origin; anything else is discarded before any handler runs.
pub struct ChannelAdapter {
    origin: String,
    outbound: OutboundSink,
    handlers: Arc<HandlerSet>,
    hub: MessageHub,
    listener: Mutex<Option<ListenerId>>,
    closed: AtomicBool,
}

impl ChannelAdapter {
    /// Bind a channel to the surface at `origin`, sending through `outbound`.
    ///
    /// Attaches one listener to `hub`; call [`ChannelAdapter::detach`] to
    /// remove it.
    pub fn attach(
        hub: &MessageHub,
        origin: impl Into<String>,
        outbound: OutboundSink,
    ) -> Arc<Self> {
        let adapter = Arc::new(Self {
            origin: origin.into(),
            outbound,
            handlers: Arc::new(HandlerSet::new()),
            hub: hub.clone(),
            listener: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let expected = adapter.origin.clone();
        let handlers = Arc::downgrade(&adapter.handlers);
        let id = hub.listen(Arc::new(move |message: &InboundMessage| {
            if message.origin != expected {
                trace!(
                    expected = %expected,
                    actual = %message.origin,
                    "Discarding message from foreign origin"
                );
                return;
            }
            if let Some(handlers) = handlers.upgrade() {
                handlers.notify(&message.data);
            }
        }));
        *adapter
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id);

        debug!(origin = %adapter.origin, "Channel attached");
        adapter
    }

    /// Effective origin of the bound surface.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Number of handlers currently registered.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the channel has been detached.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Remove the hub listener and stop sending. Idempotent.
    pub fn detach(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let id = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = id {
            self.hub.unlisten(id);
        }
        debug!(origin = %self.origin, "Channel detached");
    }
}

impl MessageChannel for ChannelAdapter {
    fn post_message(&self, data: Value) {
        if self.is_closed() {
            warn!(origin = %self.origin, "Dropping outbound message on detached channel");
            return;
        }
        (self.outbound)(data);
    }

    fn on_message(&self, handler: MessageHandler) -> Subscription {
        self.handlers.subscribe(handler)
    }
}

impl Drop for ChannelAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ORIGIN: &str = "https://abc.openskybridge.test";

    fn sink() -> (Arc<Mutex<Vec<Value>>>, OutboundSink) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&sent);
        let sink: OutboundSink = Arc::new(move |v: Value| inner.lock().unwrap().push(v));
        (sent, sink)
    }

    fn collecting_handler() -> (Arc<Mutex<Vec<Value>>>, MessageHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&seen);
        let handler: MessageHandler = Arc::new(move |v: &Value| inner.lock().unwrap().push(v.clone()));
        (seen, handler)
    }

    #[test]
    fn test_post_message_goes_to_outbound() {
        let hub = MessageHub::new();
        let (sent, outbound) = sink();
        let adapter = ChannelAdapter::attach(&hub, ORIGIN, outbound);

        adapter.post_message(json!({ "type": "state" }));
        assert_eq!(*sent.lock().unwrap(), vec![json!({ "type": "state" })]);
    }

    #[test]
    fn test_inbound_is_filtered_by_origin() {
        let hub = MessageHub::new();
        let (_, outbound) = sink();
        let adapter = ChannelAdapter::attach(&hub, ORIGIN, outbound);
        let (seen, handler) = collecting_handler();
        let _sub = adapter.on_message(handler);

        hub.dispatch(&InboundMessage::new("https://evil.test", json!("nope")));
        hub.dispatch(&InboundMessage::new(ORIGIN, json!("yes")));

        assert_eq!(*seen.lock().unwrap(), vec![json!("yes")]);
    }

    #[test]
    fn test_unsubscribe_removes_exactly_one_handler() {
        let hub = MessageHub::new();
        let (_, outbound) = sink();
        let adapter = ChannelAdapter::attach(&hub, ORIGIN, outbound);
        let (first, h1) = collecting_handler();
        let (second, h2) = collecting_handler();
        let sub1 = adapter.on_message(h1);
        let _sub2 = adapter.on_message(h2);
        assert_eq!(adapter.handler_count(), 2);

        sub1.unsubscribe();
        sub1.unsubscribe();
        assert!(!sub1.is_active());
        assert_eq!(adapter.handler_count(), 1);

        hub.dispatch(&InboundMessage::new(ORIGIN, json!(1)));
        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let hub = MessageHub::new();
        let (_, outbound) = sink();
        let adapter = ChannelAdapter::attach(&hub, ORIGIN, outbound);
        let (_, handler) = collecting_handler();
        drop(adapter.on_message(handler));
        assert_eq!(adapter.handler_count(), 0);
    }

    #[test]
    fn test_detach_removes_hub_listener_and_silences_outbound() {
        let hub = MessageHub::new();
        let (sent, outbound) = sink();
        let adapter = ChannelAdapter::attach(&hub, ORIGIN, outbound);
        let (seen, handler) = collecting_handler();
        let _sub = adapter.on_message(handler);
        assert_eq!(hub.len(), 1);

        adapter.detach();
        adapter.detach();
        assert!(adapter.is_closed());
        assert!(hub.is_empty());

        hub.dispatch(&InboundMessage::new(ORIGIN, json!(1)));
        adapter.post_message(json!(2));
        assert!(seen.lock().unwrap().is_empty());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_two_adapters_do_not_share_messages() {
        let hub = MessageHub::new();
        let (_, out_a) = sink();
        let (_, out_b) = sink();
        let a = ChannelAdapter::attach(&hub, "https://a.test", out_a);
        let b = ChannelAdapter::attach(&hub, "https://b.test", out_b);
        let (seen_a, ha) = collecting_handler();
        let (seen_b, hb) = collecting_handler();
        let _sa = a.on_message(ha);
        let _sb = b.on_message(hb);

        hub.dispatch(&InboundMessage::new("https://a.test", json!("for-a")));

        assert_eq!(*seen_a.lock().unwrap(), vec![json!("for-a")]);
        assert!(seen_b.lock().unwrap().is_empty());
    }
}
