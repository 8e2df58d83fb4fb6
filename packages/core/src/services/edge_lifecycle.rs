//! Edge Lifecycle Manager
//!
//! Creates edges already bound to two frames and removes them again. Every
//! create and confirmed delete updates the [`RelationshipIndex`].
//!
//! # Deletion
//!
//! Edges are created locked, so removal is unlock-then-delete. The store may
//! lag behind a delete, so removal is split in two phases:
//!
//! 1. [`EdgeLifecycleManager::delete_edges`] unlocks and deletes the whole
//!    batch, reporting failures to diagnostics and returning a
//!    [`PendingDeletion`].
//! 2. [`EdgeLifecycleManager::confirm`] runs after the current turn. It
//!    retries every target that still exists, one at a time, and prunes the
//!    index only for targets confirmed absent. Survivors stay indexed and are
//!    picked up by the next sweep.
//!
//! [`EdgeLifecycleManager::delete_edges_settled`] chains both phases with a
//! yield in between.

use crate::db::DocumentStore;
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink};
use crate::models::{NewBinding, Point, Shape, ShapeId, Terminal};
use crate::services::error::GraphError;
use crate::services::relationship_index::RelationshipIndex;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Anchor of the start terminal on the source frame (right edge, middle)
pub const START_ANCHOR: Point = Point::new(0.98, 0.5);

/// Anchor of the end terminal on the target frame (left edge, middle)
pub const END_ANCHOR: Point = Point::new(0.02, 0.5);

/// Targets of a phase-one deletion awaiting confirmation.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "pending deletions must be confirmed to prune the index"]
pub struct PendingDeletion {
    targets: Vec<ShapeId>,
}

impl PendingDeletion {
    pub fn targets(&self) -> &[ShapeId] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Result of a confirmed deletion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionOutcome {
    /// Targets confirmed absent and pruned from the index
    pub removed: Vec<ShapeId>,
    /// Targets that survived the retry; still indexed
    pub lingering: Vec<ShapeId>,
}

/// Creates and deletes bound edges
pub struct EdgeLifecycleManager {
    store: Arc<dyn DocumentStore>,
    index: Arc<Mutex<RelationshipIndex>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl EdgeLifecycleManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<Mutex<RelationshipIndex>>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            store,
            index,
            diagnostics,
        }
    }

    /// Create a locked edge from `from` to `to`, bind both terminals and
    /// record it in the index. Returns the new edge id.
    ///
    /// The index lock is held for the whole operation, so a sweep or store
    /// listener never observes the edge half-bound. If either binding fails
    /// the edge is removed again and the error returned.
    pub fn create_edge(&self, from: &ShapeId, to: &ShapeId) -> Result<ShapeId, GraphError> {
        if from == to {
            return Err(GraphError::same_frame(from));
        }
        let source = self.frame(from)?;
        let target = self.frame(to)?;

        let mut index = self.index.lock();

        let edge_id = ShapeId::generate();
        let start = source.bounds().anchor_point(START_ANCHOR);
        let end = target.bounds().anchor_point(END_ANCHOR);
        self.store
            .create_shape(Shape::edge(edge_id.clone(), start, end))?;

        for (terminal, frame, anchor) in [
            (Terminal::Start, from, START_ANCHOR),
            (Terminal::End, to, END_ANCHOR),
        ] {
            let bound = self.store.create_binding(NewBinding {
                from_id: edge_id.clone(),
                to_id: frame.clone(),
                terminal,
                anchor,
            });
            if let Err(e) = bound {
                self.diagnostics.record(DiagnosticEvent::BindingFailed {
                    edge: edge_id.clone(),
                    error: e.to_string(),
                });
                self.unlock_and_delete(std::slice::from_ref(&edge_id));
                return Err(e.into());
            }
        }

        index.record_edge(&edge_id, Some(from.clone()), Some(to.clone()));
        index.link(from, &edge_id);
        index.link(to, &edge_id);
        drop(index);

        if let Err(e) = self.store.send_to_back(std::slice::from_ref(&edge_id)) {
            self.diagnostics.record(DiagnosticEvent::StoreCallFailed {
                operation: "send_to_back",
                error: e.to_string(),
            });
        }

        tracing::debug!("Created edge {} from {} to {}", edge_id, from, to);
        Ok(edge_id)
    }

    /// Phase one: unlock and delete all targets in one batch.
    ///
    /// Failures go to diagnostics; the returned pending deletion must be
    /// passed to [`EdgeLifecycleManager::confirm`] regardless.
    pub fn delete_edges(&self, ids: &[ShapeId]) -> PendingDeletion {
        let targets: Vec<ShapeId> = ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !targets.is_empty() {
            self.unlock_and_delete(&targets);
        }
        PendingDeletion { targets }
    }

    /// Phase two: retry survivors individually, then prune the index for
    /// every target confirmed absent.
    pub fn confirm(&self, pending: PendingDeletion) -> DeletionOutcome {
        for target in &pending.targets {
            if self.store.contains(target) {
                tracing::debug!("Edge {} survived first delete, retrying", target);
                self.unlock_and_delete(std::slice::from_ref(target));
            }
        }

        let mut outcome = DeletionOutcome::default();
        let mut index = self.index.lock();
        for target in pending.targets {
            if self.store.contains(&target) {
                self.diagnostics.record(DiagnosticEvent::DeletionLingering {
                    edge: target.clone(),
                });
                outcome.lingering.push(target);
            } else {
                index.unlink(&target);
                outcome.removed.push(target);
            }
        }
        outcome
    }

    /// Both deletion phases with a yield in between, so the store's own
    /// teardown for this turn runs before existence is re-checked.
    pub async fn delete_edges_settled(&self, ids: &[ShapeId]) -> DeletionOutcome {
        let pending = self.delete_edges(ids);
        if pending.is_empty() {
            return DeletionOutcome::default();
        }
        tokio::task::yield_now().await;
        self.confirm(pending)
    }

    fn frame(&self, id: &ShapeId) -> Result<Shape, GraphError> {
        self.store
            .shape(id)
            .filter(Shape::is_frame)
            .ok_or_else(|| GraphError::frame_not_found(id))
    }

    fn unlock_and_delete(&self, ids: &[ShapeId]) {
        if let Err(e) = self.store.set_locked(ids, false) {
            self.diagnostics.record(DiagnosticEvent::UnlockFailed {
                edges: ids.to_vec(),
                error: e.to_string(),
            });
        }
        if let Err(e) = self.store.delete_shapes(ids) {
            self.diagnostics.record(DiagnosticEvent::DeleteFailed {
                edges: ids.to_vec(),
                error: e.to_string(),
            });
        }
    }
}
