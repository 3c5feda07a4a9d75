//! Skybridge Core - State snapshot model and wire protocol.
//!
//! This crate provides:
//! - [`StateSnapshot`], the complete, default-filled description of everything
//!   a guest widget may observe
//! - The wire envelopes exchanged with the guest ([`HostMessage`],
//!   [`GuestMessage`]) and the typed arguments of every recognized method
//! - Shared error types
//!
//! Everything here is plain data: no I/O, no async. The message channel,
//! capability runtimes and the mount lifecycle live in `skybridge-runtime`
//! and `skybridge-bridge`.
//!
//! # Example
//!
//! ```rust
//! use skybridge_core::{DisplayMode, HostMessage, StateSnapshot};
//! use serde_json::json;
//!
//! let state = StateSnapshot::default()
//!     .with_display_mode(DisplayMode::Inline)
//!     .with_tool_input(json!({ "query": "x" }).as_object().cloned().unwrap_or_default());
//!
//! let wire = HostMessage::state(state).to_value().unwrap();
//! assert_eq!(wire["type"], "state");
//! assert_eq!(wire["state"]["toolInput"]["query"], "x");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod protocol;
mod state;

pub use error::{CoreError, CoreResult};
pub use protocol::{
    CallMethod, CallToolArgs, ErrorPayload, FollowUpMessage, GuestMessage, HostMessage,
    OpenExternal, RequestId, RequestMethod, ResizeNotification, Response,
};
pub use state::{
    DeviceCapabilities, DeviceInfo, DeviceType, DisplayMode, DisplayModeRequest, JsonObject,
    SafeArea, SafeAreaInsets, StateSnapshot, Theme, UserAgent,
};
