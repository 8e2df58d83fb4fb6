//! Search overlay controller
//!
//! The search overlay is an ephemeral overlay-widget shape opened on a
//! double-click. It is never part of the frame/edge graph. Typing updates its
//! query and triggers a debounced suggestion lookup; choosing a result or
//! losing focus closes it.
//!
//! Lookups that fail are treated as zero results. A lookup whose overlay was
//! closed, or whose query changed while it was in flight, is discarded.

use crate::config::GraphConfig;
use crate::db::DocumentStore;
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink};
use crate::host::CanvasHost;
use crate::models::{Point, Shape, ShapeId, ShapeKind, ShapeUpdate, Suggestion};
use crate::services::error::GraphError;
use crate::services::scheduler::{CoalescingScheduler, TaskKind, Trigger};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Search-suggestion collaborator
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Suggestions for `query`. Transient failures are errors.
    async fn suggest(&self, query: &str) -> anyhow::Result<Vec<Suggestion>>;
}

/// Provider that never suggests anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSuggestions;

#[async_trait]
impl SuggestionProvider for NoSuggestions {
    async fn suggest(&self, _query: &str) -> anyhow::Result<Vec<Suggestion>> {
        Ok(Vec::new())
    }
}

/// State a scheduled lookup needs after the controller call returned
#[derive(Clone)]
struct Lookup {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn SuggestionProvider>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl Lookup {
    async fn run(self, overlay: ShapeId, query: String) {
        let results = match self.provider.suggest(&query).await {
            Ok(results) => results,
            Err(e) => {
                self.diagnostics.record(DiagnosticEvent::SuggestionFailed {
                    query: query.clone(),
                    error: e.to_string(),
                });
                Vec::new()
            }
        };

        let current_query = self
            .store
            .shape(&overlay)
            .and_then(|shape| shape.props.get("query").and_then(Value::as_str).map(str::to_string));
        if current_query.as_deref() != Some(query.as_str()) {
            tracing::debug!("Discarding stale suggestions for '{}'", query);
            return;
        }

        let update = ShapeUpdate::props(json!({ "results": results }));
        if let Err(e) = self.store.update_shape(&overlay, update) {
            self.diagnostics.record(DiagnosticEvent::StoreCallFailed {
                operation: "update_shape",
                error: e.to_string(),
            });
        }
    }
}

/// Opens, updates and closes search overlays
pub struct SearchOverlayController {
    store: Arc<dyn DocumentStore>,
    host: Arc<dyn CanvasHost>,
    scheduler: Arc<CoalescingScheduler>,
    lookup: Lookup,
    size: (f64, f64),
    debounce: Duration,
}

impl SearchOverlayController {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        host: Arc<dyn CanvasHost>,
        scheduler: Arc<CoalescingScheduler>,
        provider: Arc<dyn SuggestionProvider>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        config: &GraphConfig,
    ) -> Self {
        Self {
            lookup: Lookup {
                store: store.clone(),
                provider,
                diagnostics,
            },
            store,
            host,
            scheduler,
            size: (config.overlay_width, config.overlay_height),
            debounce: config.suggest_debounce(),
        }
    }

    /// Create an overlay at a screen position.
    pub fn open_at(&self, screen: Point) -> Result<ShapeId, GraphError> {
        let page = self.host.screen_to_page(screen);
        let id = ShapeId::generate();
        self.store
            .create_shape(Shape::overlay(id.clone(), page, self.size.0, self.size.1))?;
        tracing::debug!("Opened search overlay {} at ({}, {})", id, page.x, page.y);
        Ok(id)
    }

    /// Store the new query and schedule a debounced lookup. A blank query
    /// clears the results without a lookup.
    pub fn update_query(&self, overlay: &ShapeId, query: &str) -> Result<(), GraphError> {
        self.overlay(overlay)?;
        let task = TaskKind::Suggest(overlay.clone());

        if query.trim().is_empty() {
            self.scheduler.cancel(&task);
            self.store.update_shape(
                overlay,
                ShapeUpdate::props(json!({ "query": query, "results": [] })),
            )?;
            return Ok(());
        }

        self.store
            .update_shape(overlay, ShapeUpdate::props(json!({ "query": query })))?;

        let lookup = self.lookup.clone();
        let overlay = overlay.clone();
        let query = query.to_string();
        self.scheduler
            .schedule(task, Trigger::After(self.debounce), lookup.run(overlay, query));
        Ok(())
    }

    /// Results currently shown by an overlay.
    pub fn results(&self, overlay: &ShapeId) -> Result<Vec<Suggestion>, GraphError> {
        let shape = self.overlay(overlay)?;
        Ok(shape
            .props
            .get("results")
            .cloned()
            .and_then(|value| serde_json::from_value::<Vec<Suggestion>>(value).ok())
            .unwrap_or_default())
    }

    /// Delete an overlay and cancel its pending lookup. Returns the page
    /// position it occupied.
    pub fn close(&self, overlay: &ShapeId) -> Result<Point, GraphError> {
        let shape = self.overlay(overlay)?;
        self.scheduler.cancel(&TaskKind::Suggest(overlay.clone()));
        self.store.delete_shapes(std::slice::from_ref(overlay))?;
        tracing::debug!("Closed search overlay {}", overlay);
        Ok(shape.origin())
    }

    fn overlay(&self, id: &ShapeId) -> Result<Shape, GraphError> {
        self.store
            .shape(id)
            .filter(|shape| shape.kind == ShapeKind::OverlayWidget)
            .ok_or_else(|| GraphError::overlay_not_found(id))
    }
}
