//! Store Change Events
//!
//! The document store publishes one `StoreChangeBatch` per mutation over a
//! tokio broadcast channel. The coordinator's listener consumes them to keep
//! the relationship index and the edge graph consistent.
//!
//! # Event Flow
//!
//! 1. A store mutation completes (create, update, delete, binding teardown)
//! 2. The store emits a batch describing what changed
//! 3. The listener unlinks removed edges and collects cleanup candidates for
//!    removed frames
//! 4. Sweep and z-order passes are scheduled through the coalescing scheduler

use crate::models::{Binding, Shape, ShapeId, ShapeKind};
use std::collections::BTreeSet;

/// Everything that changed in one store mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreChangeBatch {
    /// Shapes created in this batch
    pub added: Vec<ShapeId>,

    /// Shapes whose properties, geometry or stacking changed
    pub updated: Vec<ShapeId>,

    /// Full records of the shapes removed in this batch
    pub removed_shapes: Vec<Shape>,

    /// Bindings torn down in this batch
    pub removed_bindings: Vec<Binding>,
}

impl StoreChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed_shapes.is_empty()
            && self.removed_bindings.is_empty()
    }

    /// Ids of removed shapes of the given kind.
    pub fn removed_of_kind(&self, kind: ShapeKind) -> BTreeSet<ShapeId> {
        self.removed_shapes
            .iter()
            .filter(|shape| shape.kind == kind)
            .map(|shape| shape.id.clone())
            .collect()
    }

    /// True when the batch can affect graph validity or stacking (anything
    /// other than pure updates).
    pub fn is_structural(&self) -> bool {
        !self.added.is_empty() || !self.removed_shapes.is_empty() || !self.removed_bindings.is_empty()
    }
}
