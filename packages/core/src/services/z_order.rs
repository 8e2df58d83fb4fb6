//! Z-Order Normalizer
//!
//! Stacking policy: edges behind everything, frames and overlay widgets in
//! front. Frames and widgets keep their existing relative order within the
//! front group.

use crate::db::DocumentStore;
use crate::models::{Shape, ShapeId, ShapeKind};
use crate::services::error::GraphError;
use std::sync::Arc;

/// True when no edge sits above a non-edge in the given stacking order.
pub fn is_normalized(shapes: &[Shape]) -> bool {
    let first_front = shapes.iter().position(|s| !s.is_edge());
    match first_front {
        None => true,
        Some(pos) => shapes[pos..].iter().all(|s| !s.is_edge()),
    }
}

/// Enforces the edge-behind stacking policy
pub struct ZOrderNormalizer {
    store: Arc<dyn DocumentStore>,
}

impl ZOrderNormalizer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Send all edges to the back, then bring frames and overlay widgets to
    /// the front. Returns whether the stacking order had to change.
    pub fn normalize(&self) -> Result<bool, GraphError> {
        let shapes = self.store.shapes();
        if is_normalized(&shapes) {
            return Ok(false);
        }

        let (edges, front): (Vec<Shape>, Vec<Shape>) =
            shapes.into_iter().partition(|s| s.kind == ShapeKind::Edge);
        let edge_ids: Vec<ShapeId> = edges.into_iter().map(|s| s.id).collect();
        let front_ids: Vec<ShapeId> = front.into_iter().map(|s| s.id).collect();

        self.store.send_to_back(&edge_ids)?;
        self.store.bring_to_front(&front_ids)?;
        tracing::debug!(
            "Normalized stacking: {} edge(s) behind {} shape(s)",
            edge_ids.len(),
            front_ids.len()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Point, Rect};

    fn frame(id: &str) -> Shape {
        Shape::frame(ShapeId::from(id), Rect::new(0.0, 0.0, 10.0, 10.0), "https://en.m.wikipedia.org")
    }

    fn edge(id: &str) -> Shape {
        Shape::edge(ShapeId::from(id), Point::default(), Point::new(5.0, 5.0))
    }

    fn order(store: &MemoryStore) -> Vec<String> {
        store
            .stacking_order()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_edges_move_behind_and_front_keeps_relative_order() {
        let store = Arc::new(MemoryStore::new());
        store.create_shape(frame("f1")).unwrap();
        store.create_shape(edge("e1")).unwrap();
        store
            .create_shape(Shape::overlay(ShapeId::from("o1"), Point::default(), 10.0, 10.0))
            .unwrap();
        store.create_shape(edge("e2")).unwrap();
        store.create_shape(frame("f2")).unwrap();

        let normalizer = ZOrderNormalizer::new(store.clone());
        assert!(normalizer.normalize().unwrap());
        assert_eq!(order(&store), vec!["e1", "e2", "f1", "o1", "f2"]);
    }

    #[test]
    fn test_already_normalized_is_left_alone() {
        let store = Arc::new(MemoryStore::new());
        store.create_shape(edge("e1")).unwrap();
        store.create_shape(frame("f1")).unwrap();

        let mut rx = store.subscribe();
        let normalizer = ZOrderNormalizer::new(store.clone());
        assert!(!normalizer.normalize().unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_is_normalized() {
        assert!(is_normalized(&[]));
        assert!(is_normalized(&[edge("e"), frame("f")]));
        assert!(!is_normalized(&[frame("f"), edge("e")]));
    }
}
