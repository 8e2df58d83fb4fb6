//! Data Models
//!
//! This module contains the data structures shared by every component:
//!
//! - `Shape` - Universal canvas entity (frame, edge, overlay widget)
//! - `Binding` - Store-level attachment of an edge terminal to a target shape
//! - `InboundMessage` - Tagged messages posted by embedded content
//! - `Point` / `Rect` - Page-space geometry

mod binding;
mod geometry;
mod message;
mod shape;

pub use binding::{Binding, BindingId, NewBinding, Terminal};
pub use geometry::{Point, Rect};
pub use message::{InboundMessage, Suggestion};
pub use shape::{Shape, ShapeId, ShapeKind, ShapeUpdate};
