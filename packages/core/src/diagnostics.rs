//! Diagnostics sink for best-effort failures
//!
//! Store calls on cleanup paths are allowed to fail: the next sweep retries
//! them. Those failures are reported here instead of being thrown. The
//! default sink drops everything; [`TracingDiagnostics`] forwards to tracing
//! and is installed when `GraphConfig::diagnostics_enabled` is set.

use crate::models::ShapeId;
use crate::services::orphan_sweep::OrphanReason;
use crate::services::event_router::IgnoreReason;

/// Structured diagnostic emitted by the graph services
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// Unlocking edges before deletion failed
    UnlockFailed { edges: Vec<ShapeId>, error: String },

    /// Deleting edges failed
    DeleteFailed { edges: Vec<ShapeId>, error: String },

    /// Edge still present after the retry pass; left for the next sweep
    DeletionLingering { edge: ShapeId },

    /// Binding an edge terminal failed during creation
    BindingFailed { edge: ShapeId, error: String },

    /// Sweep marked an edge for deletion
    OrphanFound { edge: ShapeId, reason: OrphanReason },

    /// Any other store call on a best-effort path failed
    StoreCallFailed {
        operation: &'static str,
        error: String,
    },

    /// Inbound message dropped by the router
    MessageDropped { kind: String, reason: IgnoreReason },

    /// Suggestion lookup failed; treated as zero results
    SuggestionFailed { query: String, error: String },
}

/// Receiver of diagnostic events
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn record(&self, _event: DiagnosticEvent) {}
}

/// Sink that forwards to tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn record(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::UnlockFailed { edges, error } => {
                tracing::warn!("Failed to unlock {} edge(s): {}", edges.len(), error);
            }
            DiagnosticEvent::DeleteFailed { edges, error } => {
                tracing::warn!("Failed to delete {} edge(s): {}", edges.len(), error);
            }
            DiagnosticEvent::DeletionLingering { edge } => {
                tracing::warn!("Edge {} survived deletion retry, deferring to sweep", edge);
            }
            DiagnosticEvent::BindingFailed { edge, error } => {
                tracing::warn!("Failed to bind edge {}: {}", edge, error);
            }
            DiagnosticEvent::OrphanFound { edge, reason } => {
                tracing::debug!("Orphaned edge {}: {:?}", edge, reason);
            }
            DiagnosticEvent::StoreCallFailed { operation, error } => {
                tracing::warn!("Store {} failed: {}", operation, error);
            }
            DiagnosticEvent::MessageDropped { kind, reason } => {
                tracing::debug!("Dropped {} message: {:?}", kind, reason);
            }
            DiagnosticEvent::SuggestionFailed { query, error } => {
                tracing::debug!("Suggestion lookup for '{}' failed: {}", query, error);
            }
        }
    }
}
