//! Document Store Error Types
//!
//! Errors returned by implementations of the document store contract. The
//! consistency layer treats every one of these as best-effort: they are
//! reported through diagnostics and retried on the next pass, never surfaced
//! to the user.

use crate::models::ShapeId;
use thiserror::Error;

/// Document store operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Shape does not exist
    #[error("Shape not found: {id}")]
    NotFound { id: ShapeId },

    /// Shape is locked and rejects mutation
    #[error("Shape is locked: {id}")]
    Locked { id: ShapeId },

    /// A shape with this identifier already exists
    #[error("Duplicate shape id: {id}")]
    DuplicateId { id: ShapeId },

    /// The store refused the operation for another reason
    #[error("Store rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(id: &ShapeId) -> Self {
        Self::NotFound { id: id.clone() }
    }

    /// Create a locked error
    pub fn locked(id: &ShapeId) -> Self {
        Self::Locked { id: id.clone() }
    }

    /// Create a rejected error
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }
}
