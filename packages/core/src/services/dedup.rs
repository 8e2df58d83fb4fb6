//! Dedup records for externally triggered frame creation.
//!
//! The same user action can reach the router through more than one signal
//! path. Requests with the same `(source frame, normalized reference)` key
//! inside the window collapse into the first one. Entries older than the
//! window are evicted on every check, so the map only ever holds keys seen
//! within the last window.

use crate::models::ShapeId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Key identifying a creation request.
pub fn dedup_key(source: Option<&ShapeId>, reference: &str) -> String {
    format!("{}|{}", source.map(ShapeId::as_str).unwrap_or(""), reference)
}

#[derive(Debug)]
pub struct DedupRecords {
    window: Duration,
    seen: HashMap<String, Instant>,
}

impl DedupRecords {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Record `key` and return `true` unless it was already seen inside the
    /// window.
    pub fn check_and_record(&mut self, key: &str) -> bool {
        let now = Instant::now();
        let window = self.window;
        self.seen
            .retain(|_, handled_at| now.duration_since(*handled_at) < window);

        if self.seen.contains_key(key) {
            return false;
        }
        self.seen.insert(key.to_string(), now);
        true
    }

    /// Drop `key` so the next request with it is handled again.
    pub fn forget(&mut self, key: &str) -> bool {
        self.seen.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
