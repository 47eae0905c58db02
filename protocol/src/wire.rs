use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::geometry::Point;
use crate::geometry::ViewportBounds;

/// Optional viewport rectangle piggybacked on several probe messages. All
/// four edges must be present for the rectangle to count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WireBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vp_left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vp_top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vp_right: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vp_bottom: Option<f64>,
}

impl WireBounds {
    pub fn to_bounds(self) -> Option<ViewportBounds> {
        match (self.vp_left, self.vp_top, self.vp_right, self.vp_bottom) {
            (Some(left), Some(top), Some(right), Some(bottom)) => {
                Some(ViewportBounds::new(left, top, right, bottom))
            }
            _ => None,
        }
    }

    pub fn from_bounds(bounds: ViewportBounds) -> Self {
        Self {
            vp_left: Some(bounds.left),
            vp_top: Some(bounds.top),
            vp_right: Some(bounds.right),
            vp_bottom: Some(bounds.bottom),
        }
    }
}

/// `POST /cursor-position` body. Coordinates are optional so hover-only
/// relays cannot smuggle a bogus `0,0` into the cursor slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorReport {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub hovered_id: Option<String>,
    #[serde(default)]
    pub hovered_name: Option<String>,
    #[serde(flatten)]
    pub bounds: WireBounds,
}

/// `POST /cursor-hover` body. Carries no coordinates by design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoverReport {
    #[serde(default)]
    pub hovered_id: Option<String>,
    #[serde(default)]
    pub hovered_name: Option<String>,
}

/// A DOM query parked for the probe to poll via `GET /coord-request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomQuery {
    pub request_id: u64,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_text: Option<String>,
}

/// The probe's answer to a DOM query (`POST /coord-response`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub request_id: u64,
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub cursor_x: f64,
    #[serde(default)]
    pub cursor_y: f64,
    #[serde(default)]
    pub value: String,
    /// Tri-state: Some(true/false) for checkable inputs, None otherwise.
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub input_type: String,
    #[serde(default)]
    pub in_viewport: bool,
    #[serde(default)]
    pub viewport_top: f64,
    #[serde(default)]
    pub viewport_h: f64,
    /// Positive means "scroll down" to center the element.
    #[serde(default)]
    pub scroll_delta_needed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hovered_label_text: Option<String>,
    #[serde(flatten)]
    pub bounds: WireBounds,
}

impl DomSnapshot {
    /// Absolute-screen center of the click target.
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The probe's live cursor reading at response time.
    pub fn cursor(&self) -> Point {
        Point::new(self.cursor_x, self.cursor_y)
    }
}

/// A bulk-inspection request parked for `GET /scan-request`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub request_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Radio,
    Checkbox,
    Textarea,
}

/// One form question descriptor from a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub uuid: String,
    pub selector: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub in_viewport: bool,
    #[serde(default)]
    pub checked_label: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub viewport_top: f64,
}

/// `POST /scan-response` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub request_id: u64,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub visible: u32,
    #[serde(flatten)]
    pub bounds: WireBounds,
    #[serde(default)]
    pub cursor_x: f64,
    #[serde(default)]
    pub cursor_y: f64,
}

/// `POST /automation` body: the raw command list plus an optional cursor
/// hint applied before the run starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationRequest {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub cursor_x: Option<f64>,
    #[serde(default)]
    pub cursor_y: Option<f64>,
}

/// `GET /status` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub cursor_x: Option<f64>,
    pub cursor_y: Option<f64>,
    pub automating: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_form_fields: Option<Value>,
}

/// `POST /test-move` body: a delayed sequence of absolute moves, debug only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestMoveRequest {
    #[serde(default)]
    pub moves: Vec<Point>,
    #[serde(default)]
    pub delay_ms: u64,
}
