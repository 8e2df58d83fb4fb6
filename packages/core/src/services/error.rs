//! Service Layer Error Types
//!
//! Errors returned by the graph services. Store failures on best-effort paths
//! never reach these types; they are reported through diagnostics instead.

use crate::db::StoreError;
use crate::models::ShapeId;
use thiserror::Error;

/// Graph service errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Frame not found by ID (or the shape is not a frame)
    #[error("Frame not found: {id}")]
    FrameNotFound { id: ShapeId },

    /// Search overlay not found (dismissed or never created)
    #[error("Search overlay not found: {id}")]
    OverlayNotFound { id: ShapeId },

    /// An edge must connect two distinct frames
    #[error("Cannot link frame {id} to itself")]
    SameFrame { id: ShapeId },

    /// Document store call failed
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GraphError {
    /// Create a frame not found error
    pub fn frame_not_found(id: &ShapeId) -> Self {
        Self::FrameNotFound { id: id.clone() }
    }

    /// Create an overlay not found error
    pub fn overlay_not_found(id: &ShapeId) -> Self {
        Self::OverlayNotFound { id: id.clone() }
    }

    /// Create a same-frame error
    pub fn same_frame(id: &ShapeId) -> Self {
        Self::SameFrame { id: id.clone() }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
