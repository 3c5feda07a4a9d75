//! Skybridge Test - Shared test utilities for the Skybridge widget bridge.
//!
//! This crate provides a mock rendering surface, recording host callbacks and
//! a small harness that wires them to a [`skybridge_runtime::MessageHub`].
//! The mock frame plays the guest: it records every value the host sends and
//! posts guest messages with its own origin.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! skybridge-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use skybridge_test::{BridgeHarness, RecordingCallbacks, weather_tool_args};
//!
//! #[tokio::test]
//! async fn test_call_tool() {
//!     let harness = BridgeHarness::new();
//!     let callbacks = RecordingCallbacks::new();
//!     let props = harness.props().with_callbacks(callbacks.clone());
//!     let (_bridge, frame) = harness.mount_connected(props).await;
//!
//!     frame.next_message().await; // initial state
//!     frame.guest_request(1, "callTool", weather_tool_args());
//!     assert_eq!(frame.next_message().await["result"]["temp"], 21);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
