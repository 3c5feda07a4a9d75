//! Skybridge Runtime - Message channel and capability runtimes.
//!
//! This crate provides:
//! - [`MessageHub`], the host-wide inbound message source, and
//!   [`ChannelAdapter`], which turns it into a per-surface [`MessageChannel`]
//!   filtered by origin
//! - The [`CapabilityRuntime`] / [`Connection`] seam the bridge mounts
//!   through
//! - [`OpenAiRuntime`], which emulates the `window.openai` capability object
//!   inside the guest
//! - [`HostCallbacks`], the capability set a runtime dispatches into, and
//!   [`CallbackCell`], the latest-value holder that lets hosts swap callbacks
//!   without reconnecting
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::{Value, json};
//! use skybridge_runtime::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hub = MessageHub::new();
//! let outbound: OutboundSink = Arc::new(|value: Value| println!("to guest: {value}"));
//! let channel = ChannelAdapter::attach(&hub, "https://guest.example", outbound);
//!
//! let callbacks = Callbacks::new().on_call_tool(|name, _args| async move {
//!     Ok(json!({ "tool": name }))
//! });
//! let connection = OpenAiRuntime::new().connect(channel, Arc::new(callbacks));
//!
//! connection.update_state(&StateSnapshot::default());
//! connection.disconnect();
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod callbacks;
mod channel;
mod error;
mod hub;
mod openai;
mod runtime;

pub use callbacks::{CallbackCell, Callbacks, HostCallbacks};
pub use channel::{
    ChannelAdapter, HandlerSet, MessageChannel, MessageHandler, OutboundSink, Subscription,
};
pub use error::{CallbackError, CallbackResult};
pub use hub::{InboundListener, InboundMessage, ListenerId, MessageHub};
pub use openai::{OPENAI_RUNTIME_CODE, OpenAiConnection, OpenAiRuntime, openai_runtime};
pub use runtime::{CapabilityRuntime, Connection, RuntimeOptions};
