//! Relationship bindings between an edge terminal and a target shape.

use crate::models::geometry::Point;
use crate::models::shape::ShapeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a binding record in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(String);

impl BindingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which end of an edge a binding attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    Start,
    End,
}

/// A store-level binding: edge `from_id`'s `terminal` is attached to
/// `to_id` at the normalized `anchor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub id: BindingId,
    pub from_id: ShapeId,
    pub to_id: ShapeId,
    pub terminal: Terminal,
    pub anchor: Point,
}

/// Request to create a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBinding {
    pub from_id: ShapeId,
    pub to_id: ShapeId,
    pub terminal: Terminal,
    pub anchor: Point,
}
