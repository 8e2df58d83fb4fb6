//! Frame Graph Coordinator
//!
//! Owns the process-scoped state (relationship index, dedup records, window
//! mapping, scheduler) and wires the graph services together. Hosts build
//! one [`FrameGraph`] at startup and drive it through:
//!
//! - user operations (`create_frame_at`, `create_edge`, `delete_edges`,
//!   search overlay calls)
//! - inbound messages ([`FrameGraph::route_message`])
//! - the animation-frame callback ([`FrameGraph::animation_frame`])
//! - the background runtime started by [`FrameGraph::start`]
//!
//! ## Background runtime
//!
//! One task listens to the store's change stream and runs the safety-net
//! interval:
//!
//! 1. Each change batch unlinks removed edges from the index, deletes edges
//!    left behind by removed frames (after a yield, followed by a full
//!    sweep), and schedules a sweep and a z-order pass when the batch is
//!    structural.
//! 2. If the listener lags behind the stream it falls back to a full sweep
//!    and an index rebuild.
//! 3. Every safety-net tick runs a sweep and rebuilds the index, independent
//!    of change events.

use crate::config::GraphConfig;
use crate::db::{DocumentStore, StoreChangeBatch};
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, NoopDiagnostics, TracingDiagnostics};
use crate::host::CanvasHost;
use crate::models::{Point, Rect, Shape, ShapeId, ShapeKind, Suggestion};
use crate::services::edge_lifecycle::{DeletionOutcome, EdgeLifecycleManager};
use crate::services::error::GraphError;
use crate::services::event_router::{CreationRequest, EventRouter, RouteOutcome};
use crate::services::orphan_sweep::{OrphanSweep, SweepReport};
use crate::services::relationship_index::RelationshipIndex;
use crate::services::scheduler::{CoalescingScheduler, TaskKind, Trigger};
use crate::services::search_overlay::{NoSuggestions, SearchOverlayController, SuggestionProvider};
use crate::services::z_order::ZOrderNormalizer;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Builder for [`FrameGraph`]
pub struct FrameGraphBuilder {
    store: Arc<dyn DocumentStore>,
    host: Arc<dyn CanvasHost>,
    config: GraphConfig,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
    suggestions: Arc<dyn SuggestionProvider>,
}

impl FrameGraphBuilder {
    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the diagnostics sink. Without one, `diagnostics_enabled`
    /// picks between tracing and no-op.
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn suggestions(mut self, provider: Arc<dyn SuggestionProvider>) -> Self {
        self.suggestions = provider;
        self
    }

    /// Validate the configuration, wire the services and build the index
    /// from the store's current bindings.
    pub fn build(self) -> Result<FrameGraph, GraphError> {
        self.config.validate()?;

        let diagnostics = self.diagnostics.unwrap_or_else(|| {
            if self.config.diagnostics_enabled {
                Arc::new(TracingDiagnostics)
            } else {
                Arc::new(NoopDiagnostics)
            }
        });
        let index = Arc::new(Mutex::new(RelationshipIndex::new()));
        let scheduler = Arc::new(CoalescingScheduler::new());
        let lifecycle = Arc::new(EdgeLifecycleManager::new(
            self.store.clone(),
            index.clone(),
            diagnostics.clone(),
        ));
        let sweep = OrphanSweep::new(
            self.store.clone(),
            index.clone(),
            lifecycle.clone(),
            diagnostics.clone(),
        );
        let router = EventRouter::new(
            self.store.clone(),
            self.host.clone(),
            lifecycle.clone(),
            diagnostics.clone(),
            self.config.clone(),
        )?;
        let overlays = SearchOverlayController::new(
            self.store.clone(),
            self.host.clone(),
            scheduler.clone(),
            self.suggestions,
            diagnostics.clone(),
            &self.config,
        );

        let inner = Arc::new(GraphInner {
            normalizer: ZOrderNormalizer::new(self.store.clone()),
            store: self.store,
            config: self.config,
            diagnostics,
            index,
            scheduler,
            lifecycle,
            sweep,
            router,
            overlays,
        });
        let indexed = inner.rebuild_index();
        tracing::info!("Frame graph ready with {} indexed edge(s)", indexed);

        Ok(FrameGraph {
            inner,
            runtime: Mutex::new(None),
        })
    }
}

struct GraphInner {
    config: GraphConfig,
    store: Arc<dyn DocumentStore>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    index: Arc<Mutex<RelationshipIndex>>,
    scheduler: Arc<CoalescingScheduler>,
    lifecycle: Arc<EdgeLifecycleManager>,
    sweep: OrphanSweep,
    normalizer: ZOrderNormalizer,
    router: EventRouter,
    overlays: SearchOverlayController,
}

impl GraphInner {
    async fn run_sweep(&self) -> SweepReport {
        self.sweep.sweep_settled().await
    }

    fn run_normalize(&self) -> bool {
        match self.normalizer.normalize() {
            Ok(changed) => changed,
            Err(e) => {
                self.diagnostics.record(DiagnosticEvent::StoreCallFailed {
                    operation: "normalize",
                    error: e.to_string(),
                });
                false
            }
        }
    }

    fn rebuild_index(&self) -> usize {
        let mut index = self.index.lock();
        index.rebuild_from_store(self.sweep.resolved_relations());
        debug_assert!(index.check_consistency().is_empty());
        index.edge_count()
    }

    fn schedule_sweep(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.scheduler.schedule(
            TaskKind::Sweep,
            Trigger::NextFrameOr(self.config.sweep_fallback()),
            async move {
                inner.run_sweep().await;
            },
        );
    }

    fn schedule_normalize(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.scheduler.schedule(
            TaskKind::Normalize,
            Trigger::NextFrameOr(self.config.normalize_fallback()),
            async move {
                inner.run_normalize();
            },
        );
    }

    async fn handle_store_change(self: &Arc<Self>, batch: &StoreChangeBatch) {
        let candidates = {
            let mut index = self.index.lock();
            for edge in batch.removed_of_kind(ShapeKind::Edge) {
                index.unlink(&edge);
            }
            self.sweep.removal_candidates(batch, &index)
        };

        if !batch.removed_of_kind(ShapeKind::Frame).is_empty() {
            tracing::debug!(
                "{} edge(s) left behind by removed frames",
                candidates.len()
            );
            // Let the store finish its own binding teardown first.
            tokio::task::yield_now().await;
            if !candidates.is_empty() {
                let ids: Vec<ShapeId> = candidates.into_iter().collect();
                self.lifecycle.delete_edges_settled(&ids).await;
            }
            self.run_sweep().await;
        }

        if batch.is_structural() {
            self.schedule_sweep();
            self.schedule_normalize();
        }
    }

    fn after_route(self: &Arc<Self>, outcome: &RouteOutcome) {
        if matches!(outcome, RouteOutcome::FrameCreated { .. }) {
            self.schedule_normalize();
        }
    }

    async fn run_background(
        self: Arc<Self>,
        mut changes: tokio::sync::broadcast::Receiver<StoreChangeBatch>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut safety_net = tokio::time::interval(self.config.safety_net_interval());
        safety_net.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased; // Check shutdown first

                _ = shutdown_rx.recv() => {
                    tracing::info!("Frame graph runtime shutting down");
                    break;
                }

                received = changes.recv() => match received {
                    Ok(batch) => self.handle_store_change(&batch).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Store listener lagged by {} batch(es), resynchronizing",
                            skipped
                        );
                        self.run_sweep().await;
                        self.rebuild_index();
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Store change stream closed");
                        break;
                    }
                },

                _ = safety_net.tick() => {
                    self.run_sweep().await;
                    self.rebuild_index();
                }
            }
        }
    }
}

struct Runtime {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// Consistency layer for one canvas document's frame/edge graph
pub struct FrameGraph {
    inner: Arc<GraphInner>,
    runtime: Mutex<Option<Runtime>>,
}

impl FrameGraph {
    pub fn builder(store: Arc<dyn DocumentStore>, host: Arc<dyn CanvasHost>) -> FrameGraphBuilder {
        FrameGraphBuilder {
            store,
            host,
            config: GraphConfig::default(),
            diagnostics: None,
            suggestions: Arc::new(NoSuggestions),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    //
    // RUNTIME
    //

    /// Spawn the store listener and safety-net interval. No-op when already
    /// running. Must be called within a tokio runtime.
    pub fn start(&self) {
        let mut runtime = self.runtime.lock();
        if runtime.is_some() {
            tracing::warn!("Frame graph runtime already started");
            return;
        }

        let changes = self.inner.store.subscribe();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(self.inner.clone().run_background(changes, shutdown_rx));
        *runtime = Some(Runtime { shutdown_tx, task });
        tracing::info!(
            "Frame graph runtime started (safety net every {}ms)",
            self.inner.config.safety_net_interval_ms
        );
    }

    /// Stop the background task and cancel every pending scheduled pass.
    pub async fn shutdown(&self) {
        let runtime = self.runtime.lock().take();
        if let Some(Runtime { shutdown_tx, task }) = runtime {
            let _ = shutdown_tx.send(()).await;
            if let Err(e) = task.await {
                tracing::warn!("Frame graph runtime ended abnormally: {}", e);
            }
        }
        self.inner.scheduler.cancel_all();
    }

    pub fn is_running(&self) -> bool {
        self.runtime.lock().is_some()
    }

    /// Host animation-frame callback.
    pub fn animation_frame(&self) {
        self.inner.scheduler.frame_tick();
    }

    //
    // GRAPH OPERATIONS
    //

    /// Create a frame at a page position.
    pub fn create_frame_at(&self, origin: Point, url: &str) -> Result<ShapeId, GraphError> {
        let config = &self.inner.config;
        let frame = ShapeId::generate();
        let bounds = Rect::at(origin, config.frame_width, config.frame_height);
        self.inner
            .store
            .create_shape(Shape::frame(frame.clone(), bounds, url))?;
        self.inner.schedule_normalize();
        Ok(frame)
    }

    /// Create a bound edge and schedule a z-order pass.
    pub fn create_edge(&self, from: &ShapeId, to: &ShapeId) -> Result<ShapeId, GraphError> {
        let edge = self.inner.lifecycle.create_edge(from, to)?;
        self.inner.schedule_normalize();
        Ok(edge)
    }

    /// Delete edges, waiting for the deletion to be confirmed.
    pub async fn delete_edges(&self, ids: &[ShapeId]) -> DeletionOutcome {
        self.inner.lifecycle.delete_edges_settled(ids).await
    }

    pub async fn sweep_now(&self) -> SweepReport {
        self.inner.run_sweep().await
    }

    /// Run a z-order pass immediately. Returns whether anything moved.
    pub fn normalize_now(&self) -> bool {
        self.inner.run_normalize()
    }

    /// Rebuild the index from store bindings. Returns the number of indexed
    /// edges.
    pub fn rebuild_index(&self) -> usize {
        self.inner.rebuild_index()
    }

    pub fn schedule_sweep(&self) {
        self.inner.schedule_sweep();
    }

    pub fn schedule_normalize(&self) {
        self.inner.schedule_normalize();
    }

    pub fn is_pending(&self, kind: &TaskKind) -> bool {
        self.inner.scheduler.is_pending(kind)
    }

    /// Process one store change batch. The background runtime calls this for
    /// every batch; hosts without the runtime can call it directly.
    pub async fn handle_store_change(&self, batch: &StoreChangeBatch) {
        self.inner.handle_store_change(batch).await;
    }

    /// Edges attached to a frame, per the index.
    pub fn edges_of(&self, frame: &ShapeId) -> BTreeSet<ShapeId> {
        self.inner.index.lock().edges_of(frame)
    }

    pub fn index_snapshot(&self) -> RelationshipIndex {
        self.inner.index.lock().clone()
    }

    //
    // INBOUND MESSAGES
    //

    pub fn register_window(&self, key: impl Into<String>, frame: ShapeId) {
        self.inner.router.register_window(key, frame);
    }

    pub fn unregister_window(&self, key: &str) -> Option<ShapeId> {
        self.inner.router.unregister_window(key)
    }

    /// Route a message posted by embedded content from window `origin`.
    pub fn route_message(&self, payload: &Value, origin: Option<&str>) -> Result<RouteOutcome, GraphError> {
        let outcome = self.inner.router.route(payload, origin)?;
        self.inner.after_route(&outcome);
        Ok(outcome)
    }

    pub fn request_frame(&self, request: CreationRequest) -> Result<RouteOutcome, GraphError> {
        let outcome = self.inner.router.request_frame(request)?;
        self.inner.after_route(&outcome);
        Ok(outcome)
    }

    //
    // SEARCH OVERLAY
    //

    /// Open a search overlay at a screen position.
    pub fn open_search(&self, screen: Point) -> Result<ShapeId, GraphError> {
        let overlay = self.inner.overlays.open_at(screen)?;
        self.inner.schedule_normalize();
        Ok(overlay)
    }

    pub fn update_search(&self, overlay: &ShapeId, query: &str) -> Result<(), GraphError> {
        self.inner.overlays.update_query(overlay, query)
    }

    pub fn search_results(&self, overlay: &ShapeId) -> Result<Vec<Suggestion>, GraphError> {
        self.inner.overlays.results(overlay)
    }

    /// Close the overlay and open a frame for the chosen suggestion, placed
    /// in the first free column from where the overlay was.
    pub fn choose_suggestion(
        &self,
        overlay: &ShapeId,
        suggestion: &Suggestion,
    ) -> Result<RouteOutcome, GraphError> {
        let anchor = self.inner.overlays.close(overlay)?;
        self.request_frame(CreationRequest::at_anchor(anchor, suggestion.url.as_str()))
    }

    /// Focus left the overlay.
    pub fn dismiss_search(&self, overlay: &ShapeId) -> Result<(), GraphError> {
        self.inner.overlays.close(overlay).map(|_| ())
    }
}
