//! The host-facing bridge.
//!
//! [`Skybridge`] is the single mountable unit a host embeds. Each call to
//! [`Skybridge::update`] mirrors a host re-render: callbacks are swapped in
//! place, a changed payload, runtime or request policy forces a full remount,
//! and any other change pushes the whole state snapshot to the guest.

use std::fmt;
use std::sync::Arc;

use skybridge_core::StateSnapshot;
use skybridge_runtime::{
    CallbackCell, CapabilityRuntime, Callbacks, HostCallbacks, MessageHub, RuntimeOptions,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::isolation::IsolationKey;
use crate::mount::{Mount, MountContext, MountPhase};
use crate::surface::{ContainerId, RenderSurface, SurfaceOptions};

/// Host-side collaborators shared by every mount of one bridge.
#[derive(Clone)]
pub struct BridgeEnv {
    /// Rendering-surface collaborator.
    pub surface: Arc<dyn RenderSurface>,
    /// Inbound message source for this host.
    pub hub: MessageHub,
    /// Host element the viewport attaches to.
    pub container: ContainerId,
    /// Origin namespace and sandbox policy.
    pub surface_options: SurfaceOptions,
}

impl BridgeEnv {
    /// Environment with default surface options and an unnamed container.
    #[must_use]
    pub fn new(surface: Arc<dyn RenderSurface>, hub: MessageHub) -> Self {
        Self {
            surface,
            hub,
            container: ContainerId::default(),
            surface_options: SurfaceOptions::default(),
        }
    }

    /// Set the container.
    #[must_use]
    pub fn with_container(mut self, container: ContainerId) -> Self {
        self.container = container;
        self
    }

    /// Set the surface options.
    #[must_use]
    pub fn with_surface_options(mut self, options: SurfaceOptions) -> Self {
        self.surface_options = options;
        self
    }
}

impl fmt::Debug for BridgeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeEnv")
            .field("container", &self.container)
            .field("surface_options", &self.surface_options)
            .finish_non_exhaustive()
    }
}

/// Everything the host passes on one render.
#[derive(Clone)]
pub struct SkybridgeProps {
    /// Capability runtime to emulate inside the guest.
    pub runtime: Arc<dyn CapabilityRuntime>,
    /// Guest markup.
    pub payload: String,
    /// State visible to the guest.
    pub state: StateSnapshot,
    /// Capabilities the host supports.
    pub callbacks: Arc<dyn HostCallbacks>,
}

impl SkybridgeProps {
    /// Props with default state and no callbacks.
    #[must_use]
    pub fn new(runtime: Arc<dyn CapabilityRuntime>, payload: impl Into<String>) -> Self {
        Self {
            runtime,
            payload: payload.into(),
            state: StateSnapshot::default(),
            callbacks: Arc::new(Callbacks::new()),
        }
    }

    /// Set the state snapshot.
    #[must_use]
    pub fn with_state(mut self, state: StateSnapshot) -> Self {
        self.state = state;
        self
    }

    /// Set the callbacks.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: impl HostCallbacks + 'static) -> Self {
        self.callbacks = Arc::new(callbacks);
        self
    }
}

impl fmt::Debug for SkybridgeProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkybridgeProps")
            .field("runtime", &self.runtime.id())
            .field("payload_len", &self.payload.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// What forces a remount when it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MountIdentity {
    runtime_id: String,
    runtime_code: String,
    options: RuntimeOptions,
    payload: String,
}

impl MountIdentity {
    fn of(props: &SkybridgeProps) -> Self {
        Self {
            runtime_id: props.runtime.id().to_string(),
            runtime_code: props.runtime.runtime_code().to_string(),
            options: props.runtime.request_options(),
            payload: props.payload.clone(),
        }
    }
}

/// A mounted host-to-guest bridge.
///
/// Must be created inside a Tokio runtime: materialization and request
/// handling run on spawned tasks. Dropping the bridge unmounts it.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use skybridge_bridge::{BridgeEnv, MountPhase, Skybridge, SkybridgeProps};
/// use skybridge_runtime::{MessageHub, openai_runtime};
///
/// # async fn demo(surface: Arc<dyn skybridge_bridge::RenderSurface>) {
/// let env = BridgeEnv::new(surface, MessageHub::new());
/// let bridge = Skybridge::mount(env, SkybridgeProps::new(openai_runtime(), "<p>hi</p>"));
/// assert_eq!(bridge.wait_connected().await, MountPhase::Connected);
/// # }
/// ```
pub struct Skybridge {
    env: BridgeEnv,
    callbacks: Arc<CallbackCell>,
    runtime: Arc<dyn CapabilityRuntime>,
    identity: MountIdentity,
    state: StateSnapshot,
    mount: Mount,
    unmounted: bool,
}

impl Skybridge {
    /// Mount `props` into a new isolated surface.
    #[must_use]
    pub fn mount(env: BridgeEnv, props: SkybridgeProps) -> Self {
        let identity = MountIdentity::of(&props);
        let callbacks = Arc::new(CallbackCell::new(props.callbacks));
        let mount = start_mount(&env, &props.runtime, &callbacks, &identity, &props.state);
        info!(mount_id = %mount.id(), runtime = %identity.runtime_id, "Bridge mounted");
        Self {
            env,
            callbacks,
            runtime: props.runtime,
            identity,
            state: props.state,
            mount,
            unmounted: false,
        }
    }

    /// Apply a host re-render.
    ///
    /// Callbacks always take effect immediately, without reconnecting. A
    /// changed runtime, request policy or payload tears the current mount
    /// down and starts a new one. Otherwise the new runtime handle is kept
    /// and a changed state is pushed in full.
    pub fn update(&mut self, props: SkybridgeProps) {
        if self.unmounted {
            debug!("Ignoring update on unmounted bridge");
            return;
        }
        self.callbacks.replace(Arc::clone(&props.callbacks));

        let identity = MountIdentity::of(&props);
        if identity != self.identity {
            info!(
                old_mount_id = %self.mount.id(),
                runtime = %identity.runtime_id,
                "Payload, runtime or request options changed, remounting"
            );
            self.mount.dispose();
            self.mount = start_mount(
                &self.env,
                &props.runtime,
                &self.callbacks,
                &identity,
                &props.state,
            );
            self.identity = identity;
            self.runtime = props.runtime;
            self.state = props.state;
            return;
        }

        self.runtime = props.runtime;
        self.update_state(props.state);
    }

    /// Push a new state snapshot if it differs from the current one.
    pub fn update_state(&mut self, state: StateSnapshot) {
        if self.unmounted || state == self.state {
            return;
        }
        self.state = state.clone();
        self.mount.update_state(state);
    }

    /// Swap the host callbacks without touching the mount.
    pub fn set_callbacks(&self, callbacks: impl HostCallbacks + 'static) {
        self.callbacks.replace(Arc::new(callbacks));
    }

    /// Tear the bridge down. Idempotent.
    pub fn unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.unmounted = true;
        self.mount.dispose();
    }

    /// Current lifecycle phase of the active mount.
    #[must_use]
    pub fn phase(&self) -> MountPhase {
        self.mount.phase()
    }

    /// Wait until the active mount is connected, disposed or failed, and
    /// return that phase.
    pub async fn wait_connected(&self) -> MountPhase {
        self.mount.wait_settled().await
    }

    /// Isolation key of the active mount, once hashed.
    #[must_use]
    pub fn isolation_key(&self) -> Option<IsolationKey> {
        self.mount.isolation_key()
    }

    /// Identifier of the active mount, as recorded in the `bridge_mount` span.
    #[must_use]
    pub fn mount_id(&self) -> Uuid {
        self.mount.id()
    }

    /// The last state snapshot supplied by the host.
    #[must_use]
    pub fn state(&self) -> &StateSnapshot {
        &self.state
    }

    /// The runtime backing the active mount.
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn CapabilityRuntime> {
        &self.runtime
    }

    /// Guest requests still awaiting a response on the active mount.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.mount.pending_requests()
    }
}

impl fmt::Debug for Skybridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skybridge")
            .field("mount_id", &self.mount.id())
            .field("phase", &self.phase())
            .field("runtime", &self.identity.runtime_id)
            .field("unmounted", &self.unmounted)
            .finish_non_exhaustive()
    }
}

impl Drop for Skybridge {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn start_mount(
    env: &BridgeEnv,
    runtime: &Arc<dyn CapabilityRuntime>,
    callbacks: &Arc<CallbackCell>,
    identity: &MountIdentity,
    state: &StateSnapshot,
) -> Mount {
    Mount::start(
        MountContext {
            surface: Arc::clone(&env.surface),
            hub: env.hub.clone(),
            container: env.container.clone(),
            surface_options: env.surface_options.clone(),
            runtime: Arc::clone(runtime),
            callbacks: Arc::clone(callbacks),
            payload: identity.payload.clone(),
        },
        state.clone(),
    )
}
