//! Wire envelopes exchanged across the isolation boundary.
//!
//! Every message is a JSON object with a `type` discriminator:
//!
//! | `type`     | Direction      | Shape                                   |
//! |------------|----------------|-----------------------------------------|
//! | `state`    | host → guest   | `{ type, state }`                       |
//! | `call`     | guest → host   | `{ type, method, args }`                |
//! | `request`  | guest → host   | `{ type, id, method, args }`            |
//! | `response` | host → guest   | `{ type, id, result }` or `{ type, id, error }` |
//!
//! Request ids are generated by the guest and are opaque to the host: they
//! are echoed back verbatim and never interpreted.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::state::{JsonObject, StateSnapshot};

/// Guest-generated request correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Value);

impl RequestId {
    /// Wrap an arbitrary JSON value as a request id.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The raw id value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(Value::String(id.to_string()))
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(Value::String(id))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

/// Error descriptor carried by a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable message surfaced to guest code.
    pub message: String,
}

impl ErrorPayload {
    /// Fallback message used when a failure carries no message of its own.
    pub const FALLBACK_MESSAGE: &'static str = "Unknown error";

    /// Create an error payload. An empty message is replaced by
    /// [`Self::FALLBACK_MESSAGE`].
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self {
                message: Self::FALLBACK_MESSAGE.to_string(),
            }
        } else {
            Self { message }
        }
    }
}

/// Correlated reply to a guest request.
///
/// Exactly one of `result` and `error` is present on the wire. A successful
/// call with no meaningful value carries `"result": null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Echo of the guest's request id.
    pub id: RequestId,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorPayload>,
}

/// Treat an explicitly present key as `Some`, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Response {
    /// A successful response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// A failed response.
    #[must_use]
    pub fn failure(id: RequestId, error: ErrorPayload) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Build a response from an outcome.
    #[must_use]
    pub fn from_outcome(id: RequestId, outcome: Result<Value, ErrorPayload>) -> Self {
        match outcome {
            Ok(result) => Self::success(id, result),
            Err(error) => Self::failure(id, error),
        }
    }

    /// The success payload, if any.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The error descriptor, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorPayload> {
        self.error.as_ref()
    }

    /// Whether this response reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Messages sent from the host to the guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage {
    /// Full state snapshot push.
    State {
        /// The complete snapshot.
        state: StateSnapshot,
    },
    /// Reply to a guest request.
    Response(Response),
}

impl HostMessage {
    /// Wrap a snapshot in a state push.
    #[must_use]
    pub fn state(state: StateSnapshot) -> Self {
        Self::State { state }
    }

    /// The wire name of this message's type tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::State { .. } => "state",
            Self::Response(_) => "response",
        }
    }

    /// Encode into a structured value ready for the channel.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encode`] if serialization fails.
    pub fn to_value(&self) -> CoreResult<Value> {
        serde_json::to_value(self).map_err(|source| CoreError::Encode {
            kind: self.kind(),
            source,
        })
    }
}

/// Messages sent from the guest to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GuestMessage {
    /// Fire-and-forget call.
    Call {
        /// Method name.
        method: String,
        /// Method arguments (`null` when absent).
        #[serde(default)]
        args: Value,
    },
    /// Correlated request.
    Request {
        /// Guest-generated id.
        id: RequestId,
        /// Method name. Kept as a raw value so that a non-string method
        /// still gets an error response; see [`RequestMethod::from_wire`].
        method: Value,
        /// Method arguments (`null` when absent).
        #[serde(default)]
        args: Value,
    },
}

impl GuestMessage {
    /// Decode an inbound value.
    ///
    /// Returns `Ok(None)` for values that are not guest messages at all (not
    /// an object, no `type`, or a type this protocol does not accept from the
    /// guest).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Malformed`] when the value carries a guest message
    /// type but its body does not decode (e.g. a `request` without an `id`).
    pub fn decode(data: &Value) -> CoreResult<Option<Self>> {
        let Some(kind) = data.get("type").and_then(Value::as_str) else {
            return Ok(None);
        };
        if kind != "call" && kind != "request" {
            return Ok(None);
        }
        Self::deserialize(data)
            .map(Some)
            .map_err(|source| CoreError::Malformed {
                kind: kind.to_string(),
                source,
            })
    }
}

/// Recognized fire-and-forget methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallMethod {
    /// Ask the host to close the widget.
    RequestClose,
    /// Ask the host to open a link outside the widget.
    OpenExternal,
    /// Report the guest document's intrinsic height.
    Resize,
    /// Anything else; ignored by the host.
    Unknown(String),
}

impl CallMethod {
    /// Parse a wire method name.
    #[must_use]
    pub fn parse(method: &str) -> Self {
        match method {
            "requestClose" => Self::RequestClose,
            "openExternal" => Self::OpenExternal,
            "resize" => Self::Resize,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire method name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::RequestClose => "requestClose",
            Self::OpenExternal => "openExternal",
            Self::Resize => "resize",
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for CallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized request/response methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    /// `callTool(name, args)`.
    CallTool,
    /// `sendFollowUpMessage({ prompt })`.
    SendFollowUpMessage,
    /// `requestDisplayMode({ mode })`.
    RequestDisplayMode,
    /// `setWidgetState(state)`.
    SetWidgetState,
    /// Not part of the protocol; answered with an error.
    Unknown(String),
}

impl RequestMethod {
    /// Parse a wire method name.
    #[must_use]
    pub fn parse(method: &str) -> Self {
        match method {
            "callTool" => Self::CallTool,
            "sendFollowUpMessage" => Self::SendFollowUpMessage,
            "requestDisplayMode" => Self::RequestDisplayMode,
            "setWidgetState" => Self::SetWidgetState,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Parse the raw `method` field of a request.
    ///
    /// Non-string methods are unknown and named by their JSON rendering.
    #[must_use]
    pub fn from_wire(method: &Value) -> Self {
        match method {
            Value::String(name) => Self::parse(name),
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire method name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CallTool => "callTool",
            Self::SendFollowUpMessage => "sendFollowUpMessage",
            Self::RequestDisplayMode => "requestDisplayMode",
            Self::SetWidgetState => "setWidgetState",
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of `callTool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolArgs {
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub args: JsonObject,
}

/// Arguments of `sendFollowUpMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpMessage {
    /// Prompt to send on the user's behalf.
    pub prompt: String,
}

/// Arguments of `openExternal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenExternal {
    /// Target URL.
    pub href: String,
}

/// Arguments of `resize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeNotification {
    /// Intrinsic document height in CSS pixels.
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_push_shape() {
        let value = HostMessage::state(StateSnapshot::default())
            .to_value()
            .unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["state"], serde_json::to_value(StateSnapshot::default()).unwrap());
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_success_response_has_no_error_key() {
        let value = HostMessage::Response(Response::success("r1".into(), json!({ "ok": true })))
            .to_value()
            .unwrap();
        assert_eq!(
            value,
            json!({ "type": "response", "id": "r1", "result": { "ok": true } })
        );
    }

    #[test]
    fn test_null_result_is_still_present() {
        let value = HostMessage::Response(Response::success("r2".into(), Value::Null))
            .to_value()
            .unwrap();
        assert_eq!(value, json!({ "type": "response", "id": "r2", "result": null }));

        let decoded: HostMessage = serde_json::from_value(value).unwrap();
        let HostMessage::Response(response) = decoded else {
            panic!("expected response");
        };
        assert_eq!(response.result(), Some(&Value::Null));
        assert!(!response.is_error());
    }

    #[test]
    fn test_failure_response_has_no_result_key() {
        let value = HostMessage::Response(Response::failure(
            "r3".into(),
            ErrorPayload::new("boom"),
        ))
        .to_value()
        .unwrap();
        assert_eq!(
            value,
            json!({ "type": "response", "id": "r3", "error": { "message": "boom" } })
        );
    }

    #[test]
    fn test_empty_error_message_uses_fallback() {
        assert_eq!(ErrorPayload::new("").message, "Unknown error");
    }

    #[test]
    fn test_numeric_request_id_is_echoed_verbatim() {
        let message = GuestMessage::decode(&json!({
            "type": "request", "id": 7, "method": "callTool", "args": {}
        }))
        .unwrap()
        .unwrap();
        let GuestMessage::Request { id, .. } = message else {
            panic!("expected request");
        };
        let value = HostMessage::Response(Response::success(id, Value::Null))
            .to_value()
            .unwrap();
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_decode_ignores_foreign_values() {
        assert!(GuestMessage::decode(&json!("hello")).unwrap().is_none());
        assert!(GuestMessage::decode(&json!({ "kind": "call" })).unwrap().is_none());
        assert!(GuestMessage::decode(&json!({ "type": "state", "state": {} })).unwrap().is_none());
        assert!(GuestMessage::decode(&json!({ "type": 3 })).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_request_without_id() {
        let err = GuestMessage::decode(&json!({ "type": "request", "method": "callTool" }))
            .unwrap_err();
        assert!(matches!(err, CoreError::Malformed { ref kind, .. } if kind == "request"));
    }

    #[test]
    fn test_decode_request_with_non_string_method() {
        let message = GuestMessage::decode(&json!({ "type": "request", "id": "n1", "method": 5 }))
            .unwrap()
            .unwrap();
        let GuestMessage::Request { method, args, .. } = message else {
            panic!("expected request");
        };
        assert_eq!(args, Value::Null);
        assert_eq!(
            RequestMethod::from_wire(&method),
            RequestMethod::Unknown("5".to_string())
        );
    }

    #[test]
    fn test_decode_call_without_args() {
        let message = GuestMessage::decode(&json!({ "type": "call", "method": "requestClose" }))
            .unwrap()
            .unwrap();
        assert_eq!(
            message,
            GuestMessage::Call {
                method: "requestClose".to_string(),
                args: Value::Null,
            }
        );
    }

    #[test]
    fn test_method_names_round_trip() {
        for name in ["callTool", "sendFollowUpMessage", "requestDisplayMode", "setWidgetState"] {
            let method = RequestMethod::parse(name);
            assert!(!matches!(method, RequestMethod::Unknown(_)));
            assert_eq!(method.as_str(), name);
        }
        assert_eq!(
            RequestMethod::parse("frobnicate"),
            RequestMethod::Unknown("frobnicate".to_string())
        );
        assert_eq!(RequestMethod::from_wire(&json!("callTool")), RequestMethod::CallTool);
        assert_eq!(CallMethod::parse("resize"), CallMethod::Resize);
        assert_eq!(CallMethod::parse("requestClose").to_string(), "requestClose");
    }
}
