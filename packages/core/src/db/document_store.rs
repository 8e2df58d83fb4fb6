//! Document Store Abstraction
//!
//! The canvas engine owns shape storage, bindings, stacking order and the
//! mutation stream. This trait is the whole contract the consistency layer
//! relies on; anything behind it (transactions, spatial indexing, undo) is the
//! host's business.
//!
//! All mutations are synchronous: they either succeed immediately or fail
//! immediately. What is *not* guaranteed is that derived state (bindings of a
//! deleted shape) is torn down in the same call, which is why edge deletion
//! is two-phase.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync` so the store can be shared with the
//! listener and scheduler tasks.

use crate::db::events::StoreChangeBatch;
use crate::db::StoreError;
use crate::models::{Binding, BindingId, NewBinding, Shape, ShapeId, ShapeKind, ShapeUpdate};
use tokio::sync::broadcast;

/// Contract against the host document store
pub trait DocumentStore: Send + Sync {
    //
    // ENUMERATION
    //

    /// All shapes on the active surface, in stacking order (back to front).
    fn shapes(&self) -> Vec<Shape>;

    /// Shapes of one kind, in stacking order.
    fn shapes_of_kind(&self, kind: ShapeKind) -> Vec<Shape> {
        self.shapes()
            .into_iter()
            .filter(|shape| shape.kind == kind)
            .collect()
    }

    /// Look up a single shape.
    fn shape(&self, id: &ShapeId) -> Option<Shape>;

    fn contains(&self, id: &ShapeId) -> bool {
        self.shape(id).is_some()
    }

    //
    // MUTATION
    //

    /// Create a shape with an explicit identifier.
    fn create_shape(&self, shape: Shape) -> Result<(), StoreError>;

    /// Update geometry or merge properties. Locked shapes reject updates.
    fn update_shape(&self, id: &ShapeId, update: ShapeUpdate) -> Result<(), StoreError>;

    /// Lock or unlock shapes. Unknown ids are skipped.
    fn set_locked(&self, ids: &[ShapeId], locked: bool) -> Result<(), StoreError>;

    /// Delete shapes. Unknown ids are a no-op; a locked shape rejects the
    /// whole call.
    fn delete_shapes(&self, ids: &[ShapeId]) -> Result<(), StoreError>;

    //
    // BINDINGS
    //

    /// Bindings whose `from_id` is the given shape (an edge's terminals).
    fn bindings_from(&self, id: &ShapeId) -> Vec<Binding>;

    /// Attach an edge terminal to a target shape.
    fn create_binding(&self, binding: NewBinding) -> Result<BindingId, StoreError>;

    //
    // STACKING
    //

    /// Move shapes to the back, keeping their relative order.
    fn send_to_back(&self, ids: &[ShapeId]) -> Result<(), StoreError>;

    /// Move shapes to the front, keeping their relative order.
    fn bring_to_front(&self, ids: &[ShapeId]) -> Result<(), StoreError>;

    //
    // CHANGE STREAM
    //

    /// Subscribe to mutation batches.
    fn subscribe(&self) -> broadcast::Receiver<StoreChangeBatch>;
}
