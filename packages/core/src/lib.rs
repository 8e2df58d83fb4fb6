//! FrameGraph Core Consistency Layer
//!
//! This crate keeps the graph of frames (content panels) and edges
//! (directed connectors) on a canvas document consistent while the document
//! store settles asynchronously and mutations arrive from many directions.
//!
//! # Architecture
//!
//! - **Store as source of truth**: shapes, bindings and stacking live in the
//!   host store behind [`db::DocumentStore`]; the core keeps identifiers only
//! - **Index as cache**: the relationship index is rebuilt from bindings at
//!   startup and by the safety net, and maintained incrementally in between
//! - **Self-healing**: failed cleanups are reported to diagnostics and retried
//!   by the next sweep instead of surfacing as errors
//! - **Coalesced passes**: sweep and z-order passes are debounced per kind
//!
//! # Modules
//!
//! - [`models`] - Data structures (Shape, Binding, InboundMessage, geometry)
//! - [`db`] - Document store contract and the in-memory store
//! - [`host`] - Canvas camera/input contract and the headless host
//! - [`services`] - Graph services and the [`FrameGraph`] coordinator
//! - [`config`] - Tunable settings
//! - [`diagnostics`] - Sink for best-effort failures
//! - [`utils`] - Content reference normalization

pub mod config;
pub mod db;
pub mod diagnostics;
pub mod host;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::GraphConfig;
pub use models::*;
pub use services::*;
