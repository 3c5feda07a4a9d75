//! Test harness helpers.

use std::sync::Arc;
use std::time::Duration;

use skybridge_bridge::{BridgeEnv, MountPhase, RenderSurface, Skybridge, SkybridgeProps};
use skybridge_runtime::{MessageHub, openai_runtime};
use tracing_subscriber::EnvFilter;

use crate::fixtures::WIDGET_HTML;
use crate::mocks::{EVENT_TIMEOUT, MockFrame, MockSurface};

/// Set up test logging with the given filter.
///
/// This initializes the tracing subscriber for tests. Should be called
/// at the beginning of tests that need logging.
///
/// # Example
///
/// ```rust,ignore
/// use skybridge_test::setup_test_logging;
///
/// #[tokio::test]
/// async fn my_test() {
///     setup_test_logging("skybridge_bridge=debug");
///     // ... test code
/// }
/// ```
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging with default filter (warn level).
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}

/// Wait until `condition` holds.
///
/// # Panics
///
/// Panics if it still does not hold after [`EVENT_TIMEOUT`].
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(EVENT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not met within {EVENT_TIMEOUT:?}");
}

/// A host with one message hub and one mock surface.
#[derive(Debug, Clone)]
pub struct BridgeHarness {
    /// Shared inbound message source.
    pub hub: MessageHub,
    /// The mock rendering surface.
    pub surface: Arc<MockSurface>,
}

impl BridgeHarness {
    /// Harness whose renders resolve immediately.
    #[must_use]
    pub fn new() -> Self {
        let hub = MessageHub::new();
        Self {
            surface: MockSurface::new(hub.clone()),
            hub,
        }
    }

    /// Harness whose renders block until [`MockSurface::release`].
    #[must_use]
    pub fn gated() -> Self {
        let hub = MessageHub::new();
        Self {
            surface: MockSurface::gated(hub.clone()),
            hub,
        }
    }

    /// Environment for mounting bridges against this harness.
    #[must_use]
    pub fn env(&self) -> BridgeEnv {
        BridgeEnv::new(
            Arc::clone(&self.surface) as Arc<dyn RenderSurface>,
            self.hub.clone(),
        )
    }

    /// Props for [`WIDGET_HTML`] on the openai runtime.
    #[must_use]
    pub fn props(&self) -> SkybridgeProps {
        SkybridgeProps::new(openai_runtime(), WIDGET_HTML)
    }

    /// Mount `props` and return the bridge without waiting.
    #[must_use]
    pub fn mount(&self, props: SkybridgeProps) -> Skybridge {
        Skybridge::mount(self.env(), props)
    }

    /// Mount `props`, wait until connected and return the bridge with its
    /// frame.
    ///
    /// # Panics
    ///
    /// Panics if the mount does not connect.
    pub async fn mount_connected(&self, props: SkybridgeProps) -> (Skybridge, Arc<MockFrame>) {
        let bridge = self.mount(props);
        let phase = tokio::time::timeout(EVENT_TIMEOUT, bridge.wait_connected())
            .await
            .expect("mount did not settle in time");
        assert_eq!(phase, MountPhase::Connected, "mount did not connect");
        let key = bridge
            .isolation_key()
            .expect("connected mount without an isolation key");
        let frame = self
            .surface
            .frame_for(&key)
            .expect("connected mount without a frame");
        (bridge, frame)
    }
}

impl Default for BridgeHarness {
    fn default() -> Self {
        Self::new()
    }
}
