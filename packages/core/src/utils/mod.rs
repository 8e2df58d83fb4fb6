//! Utility functions for the frame graph core
//!
//! Content reference handling shared by the router and the dev tools.

mod content_ref;

pub use content_ref::{is_file_like, is_wikimedia_host, normalize_reference};
