use serde::Deserialize;
use serde::Serialize;

/// A point in absolute screen coordinates, origin at the top-left of the
/// primary display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// The browser content area in absolute screen coordinates, as last reported
/// by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ViewportBounds {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Clamp a point into the bounds shrunk by `margin` on every side.
    /// Degenerate rectangles collapse to their low edge instead of panicking.
    pub fn clamp(&self, point: Point, margin: f64) -> Point {
        let lo_x = self.left + margin;
        let hi_x = (self.right - margin).max(lo_x);
        let lo_y = self.top + margin;
        let hi_y = (self.bottom - margin).max(lo_y);
        Point {
            x: point.x.clamp(lo_x, hi_x),
            y: point.y.clamp(lo_y, hi_y),
        }
    }

    pub fn contains(&self, point: Point, margin: f64) -> bool {
        (self.left + margin..=self.right - margin).contains(&point.x)
            && (self.top + margin..=self.bottom - margin).contains(&point.y)
    }
}
