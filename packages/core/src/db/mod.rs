//! Document Store Layer
//!
//! This module defines everything the consistency layer needs from the host
//! canvas engine:
//!
//! - [`DocumentStore`] - the store contract (shapes, bindings, stacking, change stream)
//! - [`StoreChangeBatch`] - one published mutation batch
//! - [`StoreError`] - contract-level failures
//! - [`MemoryStore`] - in-process implementation used by the simulator and tests
//!
//! The store is the source of truth. The relationship index kept by the core
//! is a cache rebuilt from store bindings whenever in doubt.

mod document_store;
mod error;
pub mod events;
mod memory_store;

pub use document_store::DocumentStore;
pub use error::StoreError;
pub use events::StoreChangeBatch;
pub use memory_store::MemoryStore;
