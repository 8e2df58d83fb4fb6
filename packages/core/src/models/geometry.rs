//! Page-space geometry primitives shared by the layout planner, the edge
//! lifecycle manager and the canvas host contract.

use serde::{Deserialize, Serialize};

/// A point in page (document) space, or a normalized anchor when used
/// inside a binding.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle in page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn at(origin: Point, w: f64, h: f64) -> Self {
        Self::new(origin.x, origin.y, w, h)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Resolve a normalized anchor (0..1 on both axes) to a page point on
    /// this rectangle.
    pub fn anchor_point(&self, anchor: Point) -> Point {
        Point::new(self.x + self.w * anchor.x, self.y + self.h * anchor.y)
    }

    /// True when the open horizontal span `(left, right)` intersects this
    /// rectangle's horizontal span.
    pub fn overlaps_span_x(&self, left: f64, right: f64) -> bool {
        self.x < right && self.right() > left
    }

    /// True when the open vertical span `(top, bottom)` intersects this
    /// rectangle's vertical span.
    pub fn overlaps_span_y(&self, top: f64, bottom: f64) -> bool {
        self.y < bottom && self.bottom() > top
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.overlaps_span_x(other.x, other.right()) && self.overlaps_span_y(other.y, other.bottom())
    }
}
