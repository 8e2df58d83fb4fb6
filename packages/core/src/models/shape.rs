//! Shape Data Structures
//!
//! Every entity on the canvas surface is a `Shape`. The consistency layer only
//! cares about three kinds:
//!
//! - **Frame**: a positioned content panel showing a URL
//! - **Edge**: a locked, directed connector bound to two frames
//! - **Overlay widget**: ephemeral UI (the search overlay), never part of the graph
//!
//! The document store owns shape records; the core only keeps identifiers.

use crate::models::geometry::{Point, Rect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use uuid::Uuid;

/// Identifier of a shape in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issue a fresh identifier (`shape:<uuid>`).
    pub fn generate() -> Self {
        Self(format!("shape:{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShapeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ShapeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Visual category of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    Frame,
    Edge,
    OverlayWidget,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Frame => "frame",
            ShapeKind::Edge => "edge",
            ShapeKind::OverlayWidget => "overlay-widget",
        }
    }
}

/// A shape record as held by the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    /// Locked shapes reject updates and deletion until unlocked.
    #[serde(default)]
    pub is_locked: bool,
    /// Kind-specific properties (`url` for frames, `start`/`end` for edges,
    /// `query`/`results` for overlays).
    #[serde(default)]
    pub props: Value,
    pub created_at: DateTime<Utc>,
}

impl Shape {
    /// A frame showing `url` with the given page bounds.
    pub fn frame(id: ShapeId, bounds: Rect, url: impl Into<String>) -> Self {
        Self {
            id,
            kind: ShapeKind::Frame,
            x: bounds.x,
            y: bounds.y,
            w: bounds.w,
            h: bounds.h,
            is_locked: false,
            props: json!({ "url": url.into() }),
            created_at: Utc::now(),
        }
    }

    /// A locked edge whose geometry runs from `start` to `end` in page space.
    /// Position is the start point; the props hold both ends relative to it.
    pub fn edge(id: ShapeId, start: Point, end: Point) -> Self {
        Self {
            id,
            kind: ShapeKind::Edge,
            x: start.x,
            y: start.y,
            w: 0.0,
            h: 0.0,
            is_locked: true,
            props: json!({
                "start": { "x": 0.0, "y": 0.0 },
                "end": { "x": end.x - start.x, "y": end.y - start.y },
            }),
            created_at: Utc::now(),
        }
    }

    /// An overlay widget anchored at `at`.
    pub fn overlay(id: ShapeId, at: Point, w: f64, h: f64) -> Self {
        Self {
            id,
            kind: ShapeKind::OverlayWidget,
            x: at.x,
            y: at.y,
            w,
            h,
            is_locked: false,
            props: json!({ "query": "", "results": [] }),
            created_at: Utc::now(),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_frame(&self) -> bool {
        self.kind == ShapeKind::Frame
    }

    pub fn is_edge(&self) -> bool {
        self.kind == ShapeKind::Edge
    }

    /// Content reference of a frame.
    pub fn url(&self) -> Option<&str> {
        self.props.get("url").and_then(Value::as_str)
    }
}

/// Partial update applied by `DocumentStore::update_shape`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub w: Option<f64>,
    pub h: Option<f64>,
    /// Properties are merged key-by-key into the existing object.
    pub props: Option<Value>,
}

impl ShapeUpdate {
    pub fn props(props: Value) -> Self {
        Self {
            props: Some(props),
            ..Default::default()
        }
    }

    pub fn apply(&self, shape: &mut Shape) {
        if let Some(x) = self.x {
            shape.x = x;
        }
        if let Some(y) = self.y {
            shape.y = y;
        }
        if let Some(w) = self.w {
            shape.w = w;
        }
        if let Some(h) = self.h {
            shape.h = h;
        }
        if let Some(Value::Object(patch)) = &self.props {
            if !shape.props.is_object() {
                shape.props = json!({});
            }
            if let Value::Object(existing) = &mut shape.props {
                for (key, value) in patch {
                    existing.insert(key.clone(), value.clone());
                }
            }
        }
    }
}
