//! Orphan Sweep
//!
//! Validates every edge against the two-endpoint invariant: exactly one
//! start binding and one end binding, each resolving to an existing frame.
//! Violators are deleted in one batch through the [`EdgeLifecycleManager`].
//!
//! The sweep also owns the finer-grained cleanup run on store change batches
//! ([`OrphanSweep::removal_candidates`]) and resolves the edge relations the
//! index is rebuilt from ([`OrphanSweep::resolved_relations`]).
//!
//! Scans take the index lock so an edge mid-creation (created but not yet
//! bound) is never mistaken for an orphan.

use crate::db::{DocumentStore, StoreChangeBatch};
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink};
use crate::models::{Binding, ShapeId, ShapeKind, Terminal};
use crate::services::edge_lifecycle::{DeletionOutcome, EdgeLifecycleManager};
use crate::services::relationship_index::{EdgeRelation, RelationshipIndex};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Why an edge failed validation
#[derive(Debug, Clone, PartialEq)]
pub enum OrphanReason {
    /// No binding for this terminal
    MissingBinding { terminal: Terminal },
    /// More than one binding for this terminal
    DuplicateBinding { terminal: Terminal },
    /// The terminal's target does not exist
    TargetMissing { terminal: Terminal, target: ShapeId },
    /// The terminal's target exists but is not a frame
    TargetNotFrame {
        terminal: Terminal,
        target: ShapeId,
        kind: ShapeKind,
    },
}

/// Result of one sweep pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Edges examined
    pub scanned: usize,
    /// Edges that failed validation, with the first violation found
    pub orphaned: Vec<(ShapeId, OrphanReason)>,
    pub outcome: DeletionOutcome,
}

impl SweepReport {
    pub fn deleted(&self) -> usize {
        self.outcome.removed.len()
    }
}

/// Check an edge's bindings against the shape kinds currently in the store.
pub fn validate_edge(
    bindings: &[Binding],
    kinds: &HashMap<ShapeId, ShapeKind>,
) -> Result<EdgeRelation, OrphanReason> {
    let start = resolve_terminal(bindings, Terminal::Start, kinds)?;
    let end = resolve_terminal(bindings, Terminal::End, kinds)?;
    Ok(EdgeRelation::new(Some(start), Some(end)))
}

fn resolve_terminal(
    bindings: &[Binding],
    terminal: Terminal,
    kinds: &HashMap<ShapeId, ShapeKind>,
) -> Result<ShapeId, OrphanReason> {
    let mut matching = bindings.iter().filter(|b| b.terminal == terminal);
    let binding = matching
        .next()
        .ok_or(OrphanReason::MissingBinding { terminal })?;
    if matching.next().is_some() {
        return Err(OrphanReason::DuplicateBinding { terminal });
    }

    match kinds.get(&binding.to_id) {
        None => Err(OrphanReason::TargetMissing {
            terminal,
            target: binding.to_id.clone(),
        }),
        Some(ShapeKind::Frame) => Ok(binding.to_id.clone()),
        Some(kind) => Err(OrphanReason::TargetNotFrame {
            terminal,
            target: binding.to_id.clone(),
            kind: *kind,
        }),
    }
}

/// Detects and removes edges that are not validly bound to two frames
pub struct OrphanSweep {
    store: Arc<dyn DocumentStore>,
    index: Arc<Mutex<RelationshipIndex>>,
    lifecycle: Arc<EdgeLifecycleManager>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl OrphanSweep {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<Mutex<RelationshipIndex>>,
        lifecycle: Arc<EdgeLifecycleManager>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            store,
            index,
            lifecycle,
            diagnostics,
        }
    }

    /// Every edge failing validation, with its reason. Returns the number of
    /// edges scanned alongside.
    pub fn find_orphans(&self) -> (usize, Vec<(ShapeId, OrphanReason)>) {
        let _index = self.index.lock();
        let shapes = self.store.shapes();
        let kinds: HashMap<ShapeId, ShapeKind> =
            shapes.iter().map(|s| (s.id.clone(), s.kind)).collect();

        let mut scanned = 0;
        let mut orphans = Vec::new();
        for edge in shapes.iter().filter(|s| s.is_edge()) {
            scanned += 1;
            let bindings = self.store.bindings_from(&edge.id);
            if let Err(reason) = validate_edge(&bindings, &kinds) {
                orphans.push((edge.id.clone(), reason));
            }
        }
        (scanned, orphans)
    }

    /// Full pass: find orphans and delete them in one batch, waiting for the
    /// deletion to be confirmed.
    ///
    /// Running it twice with no mutation in between deletes nothing the
    /// second time.
    pub async fn sweep_settled(&self) -> SweepReport {
        let (scanned, orphaned) = self.find_orphans();
        if orphaned.is_empty() {
            return SweepReport {
                scanned,
                ..Default::default()
            };
        }

        for (edge, reason) in &orphaned {
            self.diagnostics.record(DiagnosticEvent::OrphanFound {
                edge: edge.clone(),
                reason: reason.clone(),
            });
        }
        let ids: Vec<ShapeId> = orphaned.iter().map(|(id, _)| id.clone()).collect();
        let outcome = self.lifecycle.delete_edges_settled(&ids).await;
        tracing::debug!(
            "Sweep scanned {} edge(s), removed {}, {} lingering",
            scanned,
            outcome.removed.len(),
            outcome.lingering.len()
        );

        SweepReport {
            scanned,
            orphaned,
            outcome,
        }
    }

    /// Edges to delete after a store change batch removed frames.
    ///
    /// Union of: bindings torn down in the batch that targeted a removed
    /// frame, the index's edge set of each removed frame, and existing edges
    /// that now have fewer than two bindings or a binding to a removed frame.
    /// The caller holds the index lock.
    pub fn removal_candidates(
        &self,
        batch: &StoreChangeBatch,
        index: &RelationshipIndex,
    ) -> BTreeSet<ShapeId> {
        let removed_frames = batch.removed_of_kind(ShapeKind::Frame);
        if removed_frames.is_empty() {
            return BTreeSet::new();
        }

        let mut candidates: BTreeSet<ShapeId> = batch
            .removed_bindings
            .iter()
            .filter(|b| removed_frames.contains(&b.to_id))
            .map(|b| b.from_id.clone())
            .collect();

        for frame in &removed_frames {
            candidates.extend(index.edges_of(frame));
        }

        for edge in self.store.shapes_of_kind(ShapeKind::Edge) {
            let bindings = self.store.bindings_from(&edge.id);
            if bindings.len() < 2 || bindings.iter().any(|b| removed_frames.contains(&b.to_id)) {
                candidates.insert(edge.id);
            }
        }

        candidates
    }

    /// Current edges with the frames their start and end bindings point at,
    /// for rebuilding the index. Unresolvable sides are `None`.
    pub fn resolved_relations(&self) -> Vec<(ShapeId, EdgeRelation)> {
        let frames: HashSet<ShapeId> = self
            .store
            .shapes_of_kind(ShapeKind::Frame)
            .into_iter()
            .map(|s| s.id)
            .collect();
        let side = |bindings: &[Binding], terminal: Terminal| {
            bindings
                .iter()
                .find(|b| b.terminal == terminal && frames.contains(&b.to_id))
                .map(|b| b.to_id.clone())
        };

        self.store
            .shapes_of_kind(ShapeKind::Edge)
            .into_iter()
            .map(|edge| {
                let bindings = self.store.bindings_from(&edge.id);
                let relation = EdgeRelation::new(
                    side(&bindings, Terminal::Start),
                    side(&bindings, Terminal::End),
                );
                (edge.id, relation)
            })
            .collect()
    }
}
