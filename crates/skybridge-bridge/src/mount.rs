//! One mounted bridge instance and its lifecycle.
//!
//! A mount walks `Idle → Hashing → Rendering → Connected` on a spawned task
//! and ends in `Disposed` (teardown) or `Failed` (the surface could not be
//! materialized). Every phase change and every teardown step happens under
//! the mount's lock, so a teardown that races materialization is observed by
//! the task as soon as the surface resolves: the fresh surface is disposed
//! and nothing is connected.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde_json::Value;
use skybridge_core::StateSnapshot;
use skybridge_runtime::{
    CallbackCell, CapabilityRuntime, ChannelAdapter, Connection, HostCallbacks, MessageChannel,
    MessageHub, OutboundSink,
};
use tokio::sync::watch;
use tracing::{Instrument, Span, debug, error, info, info_span};
use uuid::Uuid;

use crate::error::BridgeError;
use crate::inject::inject_bootstrap;
use crate::isolation::IsolationKey;
use crate::surface::{ContainerId, RenderRequest, RenderSurface, RenderedFrame, SurfaceOptions};

/// Lifecycle phase of a mounted bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountPhase {
    /// Created, materialization not started.
    Idle,
    /// Deriving the isolation key.
    Hashing,
    /// Waiting for the rendering surface.
    Rendering,
    /// Runtime connected; state updates flow to the guest.
    Connected,
    /// Torn down.
    Disposed,
    /// The rendering surface failed.
    Failed,
}

impl MountPhase {
    /// Whether the mount has stopped moving on its own.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Connected | Self::Disposed | Self::Failed)
    }

    /// Lowercase phase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hashing => "hashing",
            Self::Rendering => "rendering",
            Self::Connected => "connected",
            Self::Disposed => "disposed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MountPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs that determine what a mount renders and connects.
pub(crate) struct MountContext {
    pub(crate) surface: Arc<dyn RenderSurface>,
    pub(crate) hub: MessageHub,
    pub(crate) container: ContainerId,
    pub(crate) surface_options: SurfaceOptions,
    pub(crate) runtime: Arc<dyn CapabilityRuntime>,
    pub(crate) callbacks: Arc<CallbackCell>,
    pub(crate) payload: String,
}

/// Resources owned by a mount, guarded together.
struct Live {
    disposed: bool,
    state: StateSnapshot,
    frame: Option<Arc<dyn RenderedFrame>>,
    adapter: Option<Arc<ChannelAdapter>>,
    connection: Option<Box<dyn Connection>>,
}

struct MountShared {
    id: Uuid,
    span: Span,
    key: OnceLock<IsolationKey>,
    phase: watch::Sender<MountPhase>,
    live: Mutex<Live>,
}

impl MountShared {
    fn lock(&self) -> MutexGuard<'_, Live> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next` unless teardown already happened.
    ///
    /// Returns `false` if the mount is disposed.
    fn advance(&self, next: MountPhase) -> bool {
        let live = self.lock();
        if live.disposed {
            return false;
        }
        self.phase.send_replace(next);
        true
    }

    async fn run(self: Arc<Self>, ctx: MountContext) {
        if !self.advance(MountPhase::Hashing) {
            return;
        }
        let key = IsolationKey::derive(&ctx.payload);
        Span::current().record("isolation_key", key.short());
        let _ = self.key.set(key.clone());

        let html = inject_bootstrap(&ctx.payload, ctx.runtime.runtime_code());
        if !self.advance(MountPhase::Rendering) {
            debug!("Teardown before render, skipping materialization");
            return;
        }

        let request = RenderRequest {
            html,
            salt: key,
            product: ctx.surface_options.product.clone(),
            sandbox: ctx.surface_options.sandbox.clone(),
            container: ctx.container.clone(),
        };
        let frame = match ctx.surface.render(request).await {
            Ok(frame) => frame,
            Err(e) => {
                self.fail(&e);
                return;
            },
        };
        self.connect(&ctx, frame);
    }

    fn fail(&self, e: &BridgeError) {
        let live = self.lock();
        if live.disposed {
            debug!(error = %e, "Surface failed after teardown");
            return;
        }
        error!(error = %e, "Failed to materialize surface");
        self.phase.send_replace(MountPhase::Failed);
    }

    fn connect(&self, ctx: &MountContext, frame: Arc<dyn RenderedFrame>) {
        let mut live = self.lock();
        if live.disposed {
            drop(live);
            info!("Teardown requested during render, disposing fresh surface");
            frame.dispose();
            return;
        }

        let origin = frame.origin().to_string();
        if origin.is_empty() || origin == "null" {
            drop(live);
            frame.dispose();
            self.fail(&BridgeError::InvalidOrigin(origin));
            return;
        }

        let sink_frame = Arc::clone(&frame);
        let outbound: OutboundSink = Arc::new(move |data: Value| sink_frame.send_message(data));
        let adapter = ChannelAdapter::attach(&ctx.hub, origin.as_str(), outbound);
        let connection = ctx.runtime.connect(
            Arc::clone(&adapter) as Arc<dyn MessageChannel>,
            Arc::clone(&ctx.callbacks) as Arc<dyn HostCallbacks>,
        );
        connection.update_state(&live.state);

        live.frame = Some(frame);
        live.adapter = Some(adapter);
        live.connection = Some(connection);
        self.phase.send_replace(MountPhase::Connected);
        info!(origin = %origin, runtime = ctx.runtime.id(), "Bridge connected");
    }
}

/// Handle to one mount. Dropping it does not tear the mount down; call
/// [`Mount::dispose`].
pub(crate) struct Mount {
    shared: Arc<MountShared>,
}

impl Mount {
    /// Start materializing `ctx` on the ambient Tokio runtime.
    pub(crate) fn start(ctx: MountContext, state: StateSnapshot) -> Self {
        let id = Uuid::new_v4();
        let span = info_span!(
            "bridge_mount",
            mount_id = %id,
            runtime = ctx.runtime.id(),
            isolation_key = tracing::field::Empty,
        );
        let (phase, _) = watch::channel(MountPhase::Idle);
        let shared = Arc::new(MountShared {
            id,
            span: span.clone(),
            key: OnceLock::new(),
            phase,
            live: Mutex::new(Live {
                disposed: false,
                state,
                frame: None,
                adapter: None,
                connection: None,
            }),
        });

        span.in_scope(|| debug!("Mount started"));
        tokio::spawn(Arc::clone(&shared).run(ctx).instrument(span));
        Self { shared }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.shared.id
    }

    pub(crate) fn phase(&self) -> MountPhase {
        *self.shared.phase.borrow()
    }

    pub(crate) fn isolation_key(&self) -> Option<IsolationKey> {
        self.shared.key.get().cloned()
    }

    pub(crate) fn pending_requests(&self) -> usize {
        self.shared
            .lock()
            .connection
            .as_ref()
            .map_or(0, |connection| connection.pending_requests())
    }

    pub(crate) async fn wait_settled(&self) -> MountPhase {
        let mut rx = self.shared.phase.subscribe();
        let settled = rx.wait_for(|phase| phase.is_settled()).await.map(|p| *p);
        settled.unwrap_or_else(|_| *rx.borrow())
    }

    /// Record `state` and push it if connected.
    pub(crate) fn update_state(&self, state: StateSnapshot) {
        let mut live = self.shared.lock();
        live.state = state;
        if let Some(connection) = &live.connection {
            connection.update_state(&live.state);
        }
    }

    /// Tear down: disconnect, then detach the channel, then dispose the
    /// surface. Idempotent.
    pub(crate) fn dispose(&self) {
        let _entered = self.shared.span.enter();
        let (connection, adapter, frame) = {
            let mut live = self.shared.lock();
            if live.disposed {
                return;
            }
            live.disposed = true;
            self.shared.phase.send_replace(MountPhase::Disposed);
            (
                live.connection.take(),
                live.adapter.take(),
                live.frame.take(),
            )
        };

        let was_live = frame.is_some();
        if let Some(connection) = connection {
            connection.disconnect();
        }
        if let Some(adapter) = adapter {
            adapter.detach();
        }
        if let Some(frame) = frame {
            frame.dispose();
        }
        info!(was_live, "Bridge disposed");
    }
}
