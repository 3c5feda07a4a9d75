//! Prelude module - commonly used types for convenient import.
//!
//! Use `use skybridge_test::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust,ignore
//! use skybridge_test::prelude::*;
//!
//! #[tokio::test]
//! async fn test_first_message_is_state() {
//!     let harness = BridgeHarness::new();
//!     let (_bridge, frame) = harness.mount_connected(harness.props()).await;
//!
//!     assert_eq!(frame.next_message().await["type"], "state");
//! }
//! ```

pub use crate::fixtures::*;
pub use crate::harness::*;
pub use crate::mocks::*;
