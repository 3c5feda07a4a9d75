//! Prelude module - commonly used types for convenient import.
//!
//! Use `use skybridge_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CoreError, CoreResult};

// State snapshot
pub use crate::{DisplayMode, JsonObject, StateSnapshot, Theme, UserAgent};

// Wire protocol
pub use crate::{GuestMessage, HostMessage, RequestId, Response};
