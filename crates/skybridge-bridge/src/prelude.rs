//! Prelude module - commonly used types for convenient import.
//!
//! Use `use skybridge_bridge::prelude::*;` to import all essential types.

// Errors
pub use crate::{BridgeError, BridgeResult};

// Bridge
pub use crate::{BridgeEnv, MountPhase, Skybridge, SkybridgeProps};

// Surface collaborator
pub use crate::{RenderRequest, RenderSurface, RenderedFrame, SurfaceOptions};

// Isolation
pub use crate::IsolationKey;
