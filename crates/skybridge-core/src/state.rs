//! The state snapshot pushed to the guest.
//!
//! A [`StateSnapshot`] is always complete: every field has a default, and the
//! whole value is serialized on every push. Optional mappings serialize as
//! `null` rather than being omitted, so the guest never observes an
//! `undefined` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON object with string keys.
pub type JsonObject = serde_json::Map<String, Value>;

/// Host color scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme (default).
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

/// How the widget is presented by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Rendered inline in the conversation (default).
    #[default]
    Inline,
    /// Picture-in-picture.
    Pip,
    /// Fullscreen.
    Fullscreen,
}

/// Coarse device class reported to the guest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Phone-sized device.
    Mobile,
    /// Tablet-sized device.
    Tablet,
    /// Desktop or laptop.
    Desktop,
    /// Not known (default).
    #[default]
    Unknown,
}

/// Device descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device class.
    #[serde(rename = "type")]
    pub kind: DeviceType,
}

/// Input capability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Whether the primary pointer can hover.
    pub hover: bool,
    /// Whether touch input is available.
    pub touch: bool,
}

/// Device and capability descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgent {
    /// Device class.
    pub device: DeviceInfo,
    /// Input capabilities.
    pub capabilities: DeviceCapabilities,
}

impl UserAgent {
    /// Create a user agent descriptor.
    #[must_use]
    pub fn new(kind: DeviceType, hover: bool, touch: bool) -> Self {
        Self {
            device: DeviceInfo { kind },
            capabilities: DeviceCapabilities { hover, touch },
        }
    }
}

/// Four-sided inset in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeAreaInsets {
    /// Top inset.
    pub top: u32,
    /// Bottom inset.
    pub bottom: u32,
    /// Left inset.
    pub left: u32,
    /// Right inset.
    pub right: u32,
}

/// Safe-area descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeArea {
    /// The insets.
    pub insets: SafeAreaInsets,
}

/// Arguments and result of a display-mode request (`{ mode }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayModeRequest {
    /// Requested (or granted) display mode.
    pub mode: DisplayMode,
}

/// Everything the guest is allowed to observe.
///
/// The host is the only writer. A guest may ask for a new widget state via
/// `setWidgetState`; the host applies it through its own state management and
/// it comes back down in the next full snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Color scheme. Default: `light`.
    pub theme: Theme,
    /// Device descriptors. Default: unknown device, no hover, no touch.
    pub user_agent: UserAgent,
    /// BCP 47 locale. Default: `en-US`.
    pub locale: String,
    /// Maximum height in pixels, `0` meaning unconstrained. Default: `0`.
    pub max_height: u32,
    /// Presentation mode. Default: `inline`.
    pub display_mode: DisplayMode,
    /// Safe-area insets. Default: all zero.
    pub safe_area: SafeArea,
    /// Tool invocation input. Default: `{}`.
    pub tool_input: JsonObject,
    /// Tool invocation output. Default: `null`.
    pub tool_output: Option<JsonObject>,
    /// Metadata attached to the tool response. Default: `null`.
    pub tool_response_metadata: Option<JsonObject>,
    /// Host-owned persisted widget state. Default: `null`.
    pub widget_state: Option<JsonObject>,
}

/// Default locale reported to guests.
pub const DEFAULT_LOCALE: &str = "en-US";

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            user_agent: UserAgent::default(),
            locale: DEFAULT_LOCALE.to_string(),
            max_height: 0,
            display_mode: DisplayMode::default(),
            safe_area: SafeArea::default(),
            tool_input: JsonObject::new(),
            tool_output: None,
            tool_response_metadata: None,
            widget_state: None,
        }
    }
}

impl StateSnapshot {
    /// Set the theme.
    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Set the locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Set the maximum height (`0` = unconstrained).
    #[must_use]
    pub fn with_max_height(mut self, max_height: u32) -> Self {
        self.max_height = max_height;
        self
    }

    /// Set the display mode.
    #[must_use]
    pub fn with_display_mode(mut self, display_mode: DisplayMode) -> Self {
        self.display_mode = display_mode;
        self
    }

    /// Set the safe-area insets.
    #[must_use]
    pub fn with_safe_area(mut self, insets: SafeAreaInsets) -> Self {
        self.safe_area = SafeArea { insets };
        self
    }

    /// Set the tool input.
    #[must_use]
    pub fn with_tool_input(mut self, tool_input: JsonObject) -> Self {
        self.tool_input = tool_input;
        self
    }

    /// Set the tool output.
    #[must_use]
    pub fn with_tool_output(mut self, tool_output: Option<JsonObject>) -> Self {
        self.tool_output = tool_output;
        self
    }

    /// Set the tool response metadata.
    #[must_use]
    pub fn with_tool_response_metadata(mut self, metadata: Option<JsonObject>) -> Self {
        self.tool_response_metadata = metadata;
        self
    }

    /// Set the widget state.
    #[must_use]
    pub fn with_widget_state(mut self, widget_state: Option<JsonObject>) -> Self {
        self.widget_state = widget_state;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_snapshot_is_fully_populated() {
        let value = serde_json::to_value(StateSnapshot::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "theme": "light",
                "userAgent": {
                    "device": { "type": "unknown" },
                    "capabilities": { "hover": false, "touch": false }
                },
                "locale": "en-US",
                "maxHeight": 0,
                "displayMode": "inline",
                "safeArea": { "insets": { "top": 0, "bottom": 0, "left": 0, "right": 0 } },
                "toolInput": {},
                "toolOutput": null,
                "toolResponseMetadata": null,
                "widgetState": null
            })
        );
    }

    #[test]
    fn test_builders_override_single_fields() {
        let state = StateSnapshot::default()
            .with_theme(Theme::Dark)
            .with_locale("ja-JP")
            .with_max_height(480)
            .with_user_agent(UserAgent::new(DeviceType::Mobile, false, true));

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["locale"], "ja-JP");
        assert_eq!(value["maxHeight"], 480);
        assert_eq!(value["userAgent"]["device"]["type"], "mobile");
        assert_eq!(value["userAgent"]["capabilities"]["touch"], true);
        assert_eq!(value["displayMode"], "inline");
    }

    #[test]
    fn test_display_mode_wire_names() {
        for (mode, name) in [
            (DisplayMode::Inline, "inline"),
            (DisplayMode::Pip, "pip"),
            (DisplayMode::Fullscreen, "fullscreen"),
        ] {
            assert_eq!(serde_json::to_value(mode).unwrap(), json!(name));
        }
    }

    #[test]
    fn test_display_mode_request_decodes() {
        let request: DisplayModeRequest =
            serde_json::from_value(json!({ "mode": "fullscreen" })).unwrap();
        assert_eq!(request.mode, DisplayMode::Fullscreen);

        assert!(serde_json::from_value::<DisplayModeRequest>(json!({ "mode": "huge" })).is_err());
    }
}
