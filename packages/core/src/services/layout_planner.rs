//! Layout Planner
//!
//! Placement of new frames so they do not overlap existing ones. Two
//! strategies:
//!
//! - **Relative to a source frame**: directly right of the source at the same
//!   height, pushed down past every frame in that column it would overlap.
//! - **Next free column**: from an anchor (or, without one, two columns past
//!   the rightmost frame), step right one column at a time until a column
//!   with no frame in its horizontal span is found.
//!
//! Everything here is pure; the caller supplies the current frame bounds.

use crate::config::GraphConfig;
use crate::models::{Point, Rect};

/// Where a new frame should be placed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Right of this source frame
    RelativeTo(Rect),
    /// First free column at or right of the anchor (past the rightmost frame
    /// if `None`)
    FreeColumn(Option<Point>),
}

/// Computes non-overlapping positions for new frames
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlanner {
    pub frame_width: f64,
    pub frame_height: f64,
    pub gap: f64,
    pub default_anchor: Point,
    pub column_retry_limit: usize,
}

impl LayoutPlanner {
    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            frame_width: config.frame_width,
            frame_height: config.frame_height,
            gap: config.gap,
            default_anchor: config.default_anchor,
            column_retry_limit: config.column_retry_limit,
        }
    }

    /// Origin for a new frame of the configured size.
    pub fn place_new_frame(&self, placement: Placement, frames: &[Rect]) -> Point {
        match placement {
            Placement::RelativeTo(source) => self.place_relative(source, frames),
            Placement::FreeColumn(anchor) => self.place_in_free_column(anchor, frames),
        }
    }

    /// Greedy single downward pass over frames in ascending `y`.
    pub fn place_relative(&self, source: Rect, frames: &[Rect]) -> Point {
        let x = source.right() + self.gap;
        let mut y = source.y;

        let mut sorted: Vec<&Rect> = frames.iter().collect();
        sorted.sort_by(|a, b| a.y.total_cmp(&b.y));

        for frame in sorted {
            if frame.overlaps_span_x(x, x + self.frame_width)
                && frame.overlaps_span_y(y, y + self.frame_height)
            {
                y = frame.bottom() + self.gap;
            }
        }
        Point::new(x, y)
    }

    /// First column (stepping by width + gap) whose horizontal span is clear.
    ///
    /// Without an anchor the search starts two columns right of the rightmost
    /// frame edge, or at the default anchor on an empty canvas. After
    /// `column_retry_limit` occupied columns the search gives up and places
    /// the frame two columns right of the rightmost frame edge.
    pub fn place_in_free_column(&self, anchor: Option<Point>, frames: &[Rect]) -> Point {
        let step = self.column_step();
        let start = match anchor {
            Some(anchor) => anchor,
            None => match Self::rightmost_edge(frames) {
                Some(right) => Point::new(right + 2.0 * step, self.default_anchor.y),
                None => self.default_anchor,
            },
        };

        for column in 0..self.column_retry_limit {
            let x = start.x + step * column as f64;
            let occupied = frames
                .iter()
                .any(|frame| frame.overlaps_span_x(x, x + self.frame_width));
            if !occupied {
                return Point::new(x, start.y);
            }
        }

        let rightmost = Self::rightmost_edge(frames).map_or(start.x, |right| right.max(start.x));
        tracing::debug!(
            "No free column within {} tries, placing past rightmost edge {}",
            self.column_retry_limit,
            rightmost
        );
        Point::new(rightmost + 2.0 * step, start.y)
    }

    /// Bounds of a new frame at `origin`.
    pub fn frame_bounds(&self, origin: Point) -> Rect {
        Rect::at(origin, self.frame_width, self.frame_height)
    }

    fn column_step(&self) -> f64 {
        self.frame_width + self.gap
    }

    fn rightmost_edge(frames: &[Rect]) -> Option<f64> {
        frames.iter().map(Rect::right).reduce(f64::max)
    }
}

/// Target zoom when focusing a frame: the current zoom bumped, kept within
/// the configured floor and ceiling.
pub fn focus_zoom(current: f64, bump: f64, min: f64, max: f64) -> f64 {
    (current * bump).clamp(min, max)
}
