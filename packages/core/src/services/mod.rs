//! Graph Services
//!
//! This module contains the consistency-maintenance services for the
//! frame/edge graph:
//!
//! - `RelationshipIndex` - Bidirectional frame ↔ edge cache over store bindings
//! - `EdgeLifecycleManager` - Bound edge creation and two-phase deletion
//! - `OrphanSweep` - Removal of edges not validly bound to two frames
//! - `ZOrderNormalizer` - Edge-behind stacking policy
//! - `LayoutPlanner` - Non-overlapping placement for new frames
//! - `EventRouter` - Messages from embedded content
//! - `SearchOverlayController` - Ephemeral search widget and suggestion lookups
//! - `CoalescingScheduler` - Per-kind debounce of sweep, z-order and lookup passes
//! - `FrameGraph` - Coordinator owning the shared state and background runtime
//!
//! Services talk to the host only through the `DocumentStore` and
//! `CanvasHost` contracts.

pub mod coordinator;
pub mod dedup;
pub mod edge_lifecycle;
pub mod error;
pub mod event_router;
pub mod layout_planner;
pub mod orphan_sweep;
pub mod relationship_index;
pub mod scheduler;
pub mod search_overlay;
pub mod z_order;

pub use coordinator::{FrameGraph, FrameGraphBuilder};
pub use dedup::{dedup_key, DedupRecords};
pub use edge_lifecycle::{
    DeletionOutcome, EdgeLifecycleManager, PendingDeletion, END_ANCHOR, START_ANCHOR,
};
pub use error::GraphError;
pub use event_router::{CreationRequest, EventRouter, IgnoreReason, RouteOutcome};
pub use layout_planner::{focus_zoom, LayoutPlanner, Placement};
pub use orphan_sweep::{validate_edge, OrphanReason, OrphanSweep, SweepReport};
pub use relationship_index::{EdgeRelation, IndexViolation, RelationshipIndex};
pub use scheduler::{CoalescingScheduler, TaskKind, Trigger};
pub use search_overlay::{NoSuggestions, SearchOverlayController, SuggestionProvider};
pub use z_order::ZOrderNormalizer;
