//! Relationship Index
//!
//! In-memory bidirectional map between frames and the edges attached to them:
//!
//! - `frame → {edge}`: every edge touching a frame, either terminal
//! - `edge → {from, to}`: the frames an edge was recorded against
//!
//! The index is a cache over store bindings, not a source of truth. It is
//! rebuilt from the store at startup and by the safety-net pass, and
//! maintained incrementally by the edge lifecycle manager in between.
//!
//! # Invariant
//!
//! An edge appears in a frame's set exactly when its recorded relation
//! references that frame. [`RelationshipIndex::check_consistency`] reports
//! any violation.

use crate::models::ShapeId;
use std::collections::{BTreeSet, HashMap};

/// Frames an edge was recorded against. Either side may be unknown while
/// the store is still settling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeRelation {
    pub from: Option<ShapeId>,
    pub to: Option<ShapeId>,
}

impl EdgeRelation {
    pub fn new(from: Option<ShapeId>, to: Option<ShapeId>) -> Self {
        Self { from, to }
    }

    pub fn between(from: &ShapeId, to: &ShapeId) -> Self {
        Self::new(Some(from.clone()), Some(to.clone()))
    }

    /// Frames referenced by this relation (deduplicated).
    pub fn frames(&self) -> BTreeSet<&ShapeId> {
        self.from.iter().chain(self.to.iter()).collect()
    }

    pub fn references(&self, frame: &ShapeId) -> bool {
        self.from.as_ref() == Some(frame) || self.to.as_ref() == Some(frame)
    }
}

/// A broken bidirectional link found by [`RelationshipIndex::check_consistency`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexViolation {
    /// `frame`'s set lists `edge`, but the edge's relation does not reference it
    UnbackedFrameEntry { frame: ShapeId, edge: ShapeId },
    /// `edge`'s relation references `frame`, but the frame's set misses it
    MissingFrameEntry { frame: ShapeId, edge: ShapeId },
}

/// Bidirectional frame/edge index
#[derive(Debug, Default, Clone)]
pub struct RelationshipIndex {
    frame_edges: HashMap<ShapeId, BTreeSet<ShapeId>>,
    edge_frames: HashMap<ShapeId, EdgeRelation>,
}

impl RelationshipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `edge` to `frame`'s set.
    pub fn link(&mut self, frame: &ShapeId, edge: &ShapeId) {
        self.frame_edges
            .entry(frame.clone())
            .or_default()
            .insert(edge.clone());
    }

    /// Forget an edge: remove it from every frame its relation references
    /// (pruning empty sets), then drop the relation. Unknown edges are a no-op.
    pub fn unlink(&mut self, edge: &ShapeId) {
        let Some(relation) = self.edge_frames.remove(edge) else {
            return;
        };
        for frame in relation.frames() {
            self.detach(frame, edge);
        }
    }

    /// Set or replace the relation recorded for `edge`. Frames the previous
    /// relation referenced but the new one does not are detached.
    pub fn record_edge(&mut self, edge: &ShapeId, from: Option<ShapeId>, to: Option<ShapeId>) {
        let relation = EdgeRelation::new(from, to);
        if let Some(previous) = self.edge_frames.get(edge).cloned() {
            for frame in previous.frames() {
                if !relation.references(frame) {
                    self.detach(frame, edge);
                }
            }
        }
        self.edge_frames.insert(edge.clone(), relation);
    }

    /// Clear and repopulate from the store's current edges and their resolved
    /// endpoints.
    pub fn rebuild_from_store<I>(&mut self, edges: I)
    where
        I: IntoIterator<Item = (ShapeId, EdgeRelation)>,
    {
        self.frame_edges.clear();
        self.edge_frames.clear();
        for (edge, relation) in edges {
            for frame in relation.frames() {
                self.link(frame, &edge);
            }
            self.edge_frames.insert(edge, relation);
        }
    }

    /// Edges attached to a frame.
    pub fn edges_of(&self, frame: &ShapeId) -> BTreeSet<ShapeId> {
        self.frame_edges.get(frame).cloned().unwrap_or_default()
    }

    pub fn relation_of(&self, edge: &ShapeId) -> Option<&EdgeRelation> {
        self.edge_frames.get(edge)
    }

    pub fn contains_edge(&self, edge: &ShapeId) -> bool {
        self.edge_frames.contains_key(edge)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_frames.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_frames.is_empty() && self.frame_edges.is_empty()
    }

    /// All violations of the bidirectional invariant.
    pub fn check_consistency(&self) -> Vec<IndexViolation> {
        let mut violations = Vec::new();
        for (frame, edges) in &self.frame_edges {
            for edge in edges {
                let backed = self
                    .edge_frames
                    .get(edge)
                    .is_some_and(|relation| relation.references(frame));
                if !backed {
                    violations.push(IndexViolation::UnbackedFrameEntry {
                        frame: frame.clone(),
                        edge: edge.clone(),
                    });
                }
            }
        }
        for (edge, relation) in &self.edge_frames {
            for frame in relation.frames() {
                let listed = self
                    .frame_edges
                    .get(frame)
                    .is_some_and(|edges| edges.contains(edge));
                if !listed {
                    violations.push(IndexViolation::MissingFrameEntry {
                        frame: frame.clone(),
                        edge: edge.clone(),
                    });
                }
            }
        }
        violations
    }

    fn detach(&mut self, frame: &ShapeId, edge: &ShapeId) {
        if let Some(edges) = self.frame_edges.get_mut(frame) {
            edges.remove(edge);
            if edges.is_empty() {
                self.frame_edges.remove(frame);
            }
        }
    }
}
