//! Mock rendering surface for testing.
//!
//! [`MockSurface`] stands in for the sandboxed-frame primitive. Each render
//! produces a [`MockFrame`] whose origin is derived from the isolation salt,
//! records every value the host sends into it, and lets a test play the
//! guest by dispatching messages into the shared [`MessageHub`] with the
//! frame's origin.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use skybridge_bridge::{
    BridgeError, BridgeResult, IsolationKey, RenderRequest, RenderSurface, RenderedFrame,
};
use skybridge_runtime::{InboundMessage, MessageHub};
use tokio::sync::{Semaphore, mpsc, watch};

/// How long helpers wait for something that should happen.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// How long helpers wait to conclude that nothing happened.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(50);

/// Mock implementation of [`RenderSurface`].
///
/// Renders complete immediately unless the surface is gated, in which case
/// each render waits for [`MockSurface::release`].
pub struct MockSurface {
    hub: MessageHub,
    gate: Option<Semaphore>,
    failure: Mutex<Option<String>>,
    fixed_origin: Mutex<Option<String>>,
    requests: Mutex<Vec<RenderRequest>>,
    frames: Mutex<Vec<Arc<MockFrame>>>,
    started: watch::Sender<usize>,
    finished: watch::Sender<usize>,
}

impl MockSurface {
    /// A surface whose renders resolve immediately.
    #[must_use]
    pub fn new(hub: MessageHub) -> Arc<Self> {
        Arc::new(Self::build(hub, None))
    }

    /// A surface whose renders block until released.
    #[must_use]
    pub fn gated(hub: MessageHub) -> Arc<Self> {
        Arc::new(Self::build(hub, Some(Semaphore::new(0))))
    }

    fn build(hub: MessageHub, gate: Option<Semaphore>) -> Self {
        Self {
            hub,
            gate,
            failure: Mutex::new(None),
            fixed_origin: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            started: watch::channel(0).0,
            finished: watch::channel(0).0,
        }
    }

    /// Let `n` blocked renders proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Make every later render fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().expect("failure lock") = Some(message.into());
    }

    /// Report `origin` for every later frame instead of the derived one.
    pub fn force_origin(&self, origin: impl Into<String>) {
        *self.fixed_origin.lock().expect("origin lock") = Some(origin.into());
    }

    /// Every render request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Every frame produced so far.
    #[must_use]
    pub fn frames(&self) -> Vec<Arc<MockFrame>> {
        self.frames.lock().expect("frames lock").clone()
    }

    /// The most recently produced frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<Arc<MockFrame>> {
        self.frames.lock().expect("frames lock").last().cloned()
    }

    /// The live or disposed frame rendered for `key`, newest first.
    #[must_use]
    pub fn frame_for(&self, key: &IsolationKey) -> Option<Arc<MockFrame>> {
        self.frames
            .lock()
            .expect("frames lock")
            .iter()
            .rev()
            .find(|frame| frame.key() == key)
            .cloned()
    }

    /// Wait until at least `n` renders have started.
    ///
    /// # Panics
    ///
    /// Panics if that does not happen within [`EVENT_TIMEOUT`].
    pub async fn wait_for_renders_started(&self, n: usize) {
        wait_count(&self.started, n, "renders to start").await;
    }

    /// Wait until at least `n` renders have resolved (successfully or not).
    ///
    /// # Panics
    ///
    /// Panics if that does not happen within [`EVENT_TIMEOUT`].
    pub async fn wait_for_renders_finished(&self, n: usize) {
        wait_count(&self.finished, n, "renders to finish").await;
    }

    /// Wait for the `n`th frame (1-based) and return it.
    ///
    /// # Panics
    ///
    /// Panics if it does not appear within [`EVENT_TIMEOUT`] or the render
    /// failed.
    pub async fn wait_for_frame(&self, n: usize) -> Arc<MockFrame> {
        self.wait_for_renders_finished(n).await;
        let index = n.checked_sub(1).expect("frames are numbered from 1");
        self.frames()
            .get(index)
            .cloned()
            .expect("render finished without producing a frame")
    }

    fn origin_for(&self, request: &RenderRequest) -> String {
        self.fixed_origin
            .lock()
            .expect("origin lock")
            .clone()
            .unwrap_or_else(|| {
                format!(
                    "https://{}.{}.sandbox.test",
                    request.salt.short(),
                    request.product
                )
            })
    }
}

impl std::fmt::Debug for MockSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSurface")
            .field("gated", &self.gate.is_some())
            .field("renders_started", &*self.started.borrow())
            .field("renders_finished", &*self.finished.borrow())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RenderSurface for MockSurface {
    async fn render(&self, request: RenderRequest) -> BridgeResult<Arc<dyn RenderedFrame>> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.started.send_modify(|n| *n = n.saturating_add(1));

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| BridgeError::Surface(e.to_string()))?;
            permit.forget();
        }

        let failure = self.failure.lock().expect("failure lock").clone();
        if let Some(message) = failure {
            self.finished.send_modify(|n| *n = n.saturating_add(1));
            return Err(BridgeError::Surface(message));
        }

        let frame = Arc::new(MockFrame::new(
            self.origin_for(&request),
            request.salt,
            request.html,
            self.hub.clone(),
        ));
        self.frames
            .lock()
            .expect("frames lock")
            .push(Arc::clone(&frame));
        self.finished.send_modify(|n| *n = n.saturating_add(1));
        Ok(frame)
    }
}

async fn wait_count(counter: &watch::Sender<usize>, n: usize, what: &str) {
    let mut rx = counter.subscribe();
    tokio::time::timeout(EVENT_TIMEOUT, rx.wait_for(|count| *count >= n))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {n} {what}"))
        .expect("counter sender dropped");
}

/// A rendered viewport that records host traffic and plays the guest.
pub struct MockFrame {
    origin: String,
    key: IsolationKey,
    html: String,
    hub: MessageHub,
    outbox_tx: mpsc::UnboundedSender<Value>,
    outbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Value>>,
    sent: AtomicUsize,
    sent_after_dispose: AtomicUsize,
    disposed: AtomicBool,
    dispose_calls: AtomicUsize,
}

impl MockFrame {
    fn new(origin: String, key: IsolationKey, html: String, hub: MessageHub) -> Self {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        Self {
            origin,
            key,
            html,
            hub,
            outbox_tx,
            outbox_rx: tokio::sync::Mutex::new(outbox_rx),
            sent: AtomicUsize::new(0),
            sent_after_dispose: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
            dispose_calls: AtomicUsize::new(0),
        }
    }

    /// Isolation salt the frame was rendered with.
    #[must_use]
    pub fn key(&self) -> &IsolationKey {
        &self.key
    }

    /// Markup the surface was asked to render.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Whether the host disposed this frame.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// How many times `dispose` was called.
    #[must_use]
    pub fn dispose_calls(&self) -> usize {
        self.dispose_calls.load(Ordering::SeqCst)
    }

    /// Values the host sent into this frame.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    /// Values the host sent after disposing this frame.
    #[must_use]
    pub fn sent_after_dispose(&self) -> usize {
        self.sent_after_dispose.load(Ordering::SeqCst)
    }

    /// Next value the host sent into this frame.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within [`EVENT_TIMEOUT`].
    pub async fn next_message(&self) -> Value {
        self.try_next_message(EVENT_TIMEOUT)
            .await
            .unwrap_or_else(|| panic!("no message reached {} in time", self.origin))
    }

    /// Next value the host sent, or `None` after `wait`.
    pub async fn try_next_message(&self, wait: Duration) -> Option<Value> {
        let mut rx = self.outbox_rx.lock().await;
        tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
    }

    /// Whether the host stays silent for [`SILENCE_WINDOW`].
    pub async fn is_silent(&self) -> bool {
        self.try_next_message(SILENCE_WINDOW).await.is_none()
    }

    /// Deliver `data` to the host as if the guest posted it.
    pub fn guest_post(&self, data: Value) {
        self.post_as(&self.origin, data);
    }

    /// Deliver `data` to the host claiming to come from `origin`.
    pub fn post_as(&self, origin: &str, data: Value) {
        self.hub.dispatch(&InboundMessage::new(origin, data));
    }

    /// Send a guest request.
    pub fn guest_request(&self, id: impl Into<Value>, method: &str, args: Value) {
        self.guest_post(json!({
            "type": "request",
            "id": id.into(),
            "method": method,
            "args": args,
        }));
    }

    /// Send a fire-and-forget guest call.
    pub fn guest_call(&self, method: &str, args: Option<Value>) {
        let mut message = json!({ "type": "call", "method": method });
        if let Some(args) = args {
            message["args"] = args;
        }
        self.guest_post(message);
    }
}

impl RenderedFrame for MockFrame {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn send_message(&self, data: Value) {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.is_disposed() {
            self.sent_after_dispose.fetch_add(1, Ordering::SeqCst);
        }
        let _ = self.outbox_tx.send(data);
    }

    fn dispose(&self) {
        self.dispose_calls.fetch_add(1, Ordering::SeqCst);
        self.disposed.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MockFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFrame")
            .field("origin", &self.origin)
            .field("sent", &self.sent_count())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
