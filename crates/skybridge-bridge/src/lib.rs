//! Skybridge Bridge - Mount lifecycle orchestrator.
//!
//! This crate provides:
//! - [`Skybridge`], the mountable unit a host embeds to render one untrusted
//!   widget payload and expose a capability runtime to it
//! - [`IsolationKey`], the content-derived salt that keeps different payloads
//!   on different isolated origins
//! - [`inject_bootstrap`], which places a runtime's bootstrap at the top of
//!   the payload's head
//! - The [`RenderSurface`] / [`RenderedFrame`] seam to whatever actually
//!   materializes isolated viewports
//! - [`config_bridge`], which turns a loaded `skybridge_config::Config` into
//!   runtime, surface and logging options
//!
//! # Lifecycle
//!
//! `Idle → Hashing → Rendering → Connected → Disposed`. Teardown always
//! disconnects the runtime before disposing the surface, and a teardown that
//! lands while the surface is still materializing disposes it as soon as it
//! resolves, without ever connecting.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod bridge;
mod error;
mod inject;
mod isolation;
mod mount;
mod surface;

pub use bridge::{BridgeEnv, Skybridge, SkybridgeProps};
pub use error::{BridgeError, BridgeResult};
pub use inject::inject_bootstrap;
pub use isolation::IsolationKey;
pub use mount::MountPhase;
pub use surface::{
    ALLOW_SCRIPTS, ContainerId, DEFAULT_PRODUCT, RenderRequest, RenderSurface, RenderedFrame,
    SandboxPolicy, SurfaceOptions,
};
