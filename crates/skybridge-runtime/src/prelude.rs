//! Prelude module - commonly used types for convenient import.
//!
//! Use `use skybridge_runtime::prelude::*;` to import all essential types.

// Channel
pub use crate::{ChannelAdapter, InboundMessage, MessageChannel, MessageHub, OutboundSink};

// Runtimes
pub use crate::{CapabilityRuntime, Connection, OpenAiRuntime, RuntimeOptions};

// Callbacks
pub use crate::{CallbackCell, CallbackError, CallbackResult, Callbacks, HostCallbacks};

// Re-exported state model
pub use skybridge_core::StateSnapshot;
