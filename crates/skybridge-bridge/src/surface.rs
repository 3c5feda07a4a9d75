//! Rendering-surface collaborator.
//!
//! The bridge never renders anything itself. A [`RenderSurface`] turns
//! (bootstrap-injected) markup into an isolated viewport and hands back a
//! [`RenderedFrame`]: the viewport's effective origin, a way to send one
//! structured value into it, and a way to tear it down.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeResult;
use crate::isolation::IsolationKey;

/// Default origin namespace for isolated surfaces.
pub const DEFAULT_PRODUCT: &str = "openskybridge";

/// Sandbox token every surface needs for the bootstrap to run.
pub const ALLOW_SCRIPTS: &str = "allow-scripts";

/// Materializes isolated viewports.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Render `request` into a live, isolated viewport.
    ///
    /// May suspend for as long as materialization takes. The bridge checks
    /// for teardown as soon as this resolves.
    async fn render(&self, request: RenderRequest) -> BridgeResult<Arc<dyn RenderedFrame>>;
}

/// A live isolated viewport.
pub trait RenderedFrame: Send + Sync {
    /// Effective origin of the viewport, used to filter inbound messages.
    fn origin(&self) -> &str;

    /// Enqueue one structured value toward the guest.
    fn send_message(&self, data: Value);

    /// Detach and clear the viewport. Must be synchronous.
    fn dispose(&self);
}

/// Everything the surface needs to materialize one viewport.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Payload with the runtime bootstrap already injected.
    pub html: String,
    /// Content-derived salt for the viewport's origin.
    pub salt: IsolationKey,
    /// Origin namespace.
    pub product: String,
    /// Sandbox capabilities granted to the viewport.
    pub sandbox: SandboxPolicy,
    /// Host element the viewport attaches to.
    pub container: ContainerId,
}

/// Sandbox tokens granted to a viewport (e.g. `allow-scripts`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SandboxPolicy(Vec<String>);

impl SandboxPolicy {
    /// Build a policy from explicit tokens.
    #[must_use]
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// The granted tokens.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Whether `token` is granted.
    #[must_use]
    pub fn allows(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    /// Space-separated attribute value.
    #[must_use]
    pub fn to_attribute(&self) -> String {
        self.0.join(" ")
    }
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self::new([ALLOW_SCRIPTS])
    }
}

/// Identifier of the host element a viewport is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wrap a container identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Surface parameters that do not depend on the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Origin namespace.
    pub product: String,
    /// Sandbox capabilities.
    pub sandbox: SandboxPolicy,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            sandbox: SandboxPolicy::default(),
        }
    }
}
