//! Inbound Event Router
//!
//! Single entry point for messages posted by embedded content:
//!
//! - **Creation requests** (`link-followed`, or a chosen search result):
//!   normalize the target, drop duplicates inside the dedup window, place and
//!   create the new frame, bind an edge from the source frame if there is one
//!   and focus the camera on the result.
//! - **Viewport gestures**: replay the wheel input on the canvas at the
//!   matching page position so nested content and canvas share one
//!   zoom/pan vocabulary.
//! - **Focus requests**: focus the camera on the reporting frame.
//!
//! The router never touches the relationship index; edges go through the
//! [`EdgeLifecycleManager`].

use crate::config::GraphConfig;
use crate::db::DocumentStore;
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink};
use crate::host::{CanvasHost, WheelInput};
use crate::models::{InboundMessage, Point, Rect, Shape, ShapeId, ShapeKind};
use crate::services::dedup::{dedup_key, DedupRecords};
use crate::services::edge_lifecycle::EdgeLifecycleManager;
use crate::services::error::GraphError;
use crate::services::layout_planner::{focus_zoom, LayoutPlanner, Placement};
use crate::utils::{is_file_like, is_wikimedia_host, normalize_reference};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Why a message was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum IgnoreReason {
    /// Unknown tag, missing or mistyped fields
    Malformed,
    /// The link target could not be turned into an http(s) URL
    UnresolvedReference,
    /// Target host is outside the Wikimedia allowlist
    ExternalHost,
    /// File or media page, left to the embedded content
    FileLike,
    /// No frame matches the message's source
    UnknownSource,
}

/// What the router did with a message
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    FrameCreated {
        frame: ShapeId,
        /// Edge from the source frame, when the request had one
        edge: Option<ShapeId>,
    },
    /// Same request already handled inside the dedup window
    Duplicate,
    /// Wheel input replayed at this screen position
    GestureForwarded(Point),
    Focused(ShapeId),
    Ignored(IgnoreReason),
}

/// A request to open a frame for `reference`
#[derive(Debug, Clone, PartialEq)]
pub struct CreationRequest {
    pub source: Option<ShapeId>,
    pub reference: String,
    /// Column search start when there is no source frame
    pub anchor: Option<Point>,
}

impl CreationRequest {
    pub fn from_source(source: Option<ShapeId>, reference: impl Into<String>) -> Self {
        Self {
            source,
            reference: reference.into(),
            anchor: None,
        }
    }

    pub fn at_anchor(anchor: Point, reference: impl Into<String>) -> Self {
        Self {
            source: None,
            reference: reference.into(),
            anchor: Some(anchor),
        }
    }
}

/// Routes inbound messages to the graph services
pub struct EventRouter {
    store: Arc<dyn DocumentStore>,
    host: Arc<dyn CanvasHost>,
    lifecycle: Arc<EdgeLifecycleManager>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    planner: LayoutPlanner,
    config: GraphConfig,
    content_base: Url,
    dedup: Mutex<DedupRecords>,
    windows: RwLock<HashMap<String, ShapeId>>,
}

impl EventRouter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        host: Arc<dyn CanvasHost>,
        lifecycle: Arc<EdgeLifecycleManager>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        config: GraphConfig,
    ) -> Result<Self, GraphError> {
        let content_base = Url::parse(&config.content_base).map_err(|e| {
            GraphError::invalid_config(format!("content_base '{}': {}", config.content_base, e))
        })?;
        Ok(Self {
            store,
            host,
            lifecycle,
            diagnostics,
            planner: LayoutPlanner::from_config(&config),
            dedup: Mutex::new(DedupRecords::new(config.dedup_window())),
            windows: RwLock::new(HashMap::new()),
            content_base,
            config,
        })
    }

    /// Map an embedded window to the frame hosting it.
    pub fn register_window(&self, key: impl Into<String>, frame: ShapeId) {
        self.windows.write().insert(key.into(), frame);
    }

    pub fn unregister_window(&self, key: &str) -> Option<ShapeId> {
        self.windows.write().remove(key)
    }

    /// Handle a raw message. `origin` is the key of the window that posted
    /// it, used when the message carries no usable source hint.
    pub fn route(&self, payload: &Value, origin: Option<&str>) -> Result<RouteOutcome, GraphError> {
        let Some(message) = InboundMessage::parse(payload) else {
            let kind = payload
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Ok(self.ignore(kind, IgnoreReason::Malformed));
        };

        let source = self.resolve_source(message.source_hint(), origin);
        match message {
            InboundMessage::LinkFollowed { href, .. } => {
                let request = CreationRequest::from_source(source.map(|s| s.id), href);
                self.request_frame(request)
            }
            InboundMessage::ViewportGesture {
                delta_y,
                client_x,
                client_y,
                ..
            } => {
                let Some(frame) = source else {
                    return Ok(self.ignore("viewport-gesture", IgnoreReason::UnknownSource));
                };
                Ok(self.forward_gesture(&frame, delta_y, client_x, client_y))
            }
            InboundMessage::ContentFocusRequest { .. } => {
                let Some(frame) = source else {
                    return Ok(self.ignore("content-focus-request", IgnoreReason::UnknownSource));
                };
                self.focus(frame.bounds());
                Ok(RouteOutcome::Focused(frame.id))
            }
        }
    }

    /// Open a frame for a creation request.
    ///
    /// Frame creation failures are returned and leave no dedup record; a
    /// failed edge bind leaves the new frame in place without an edge.
    pub fn request_frame(&self, request: CreationRequest) -> Result<RouteOutcome, GraphError> {
        let Some(target) = normalize_reference(
            &request.reference,
            &self.content_base,
            &self.config.proxy_paths,
        ) else {
            return Ok(self.ignore("link-followed", IgnoreReason::UnresolvedReference));
        };

        if self.config.restrict_to_wikimedia {
            if !target.host_str().is_some_and(is_wikimedia_host) {
                return Ok(self.ignore("link-followed", IgnoreReason::ExternalHost));
            }
            if is_file_like(&target) {
                return Ok(self.ignore("link-followed", IgnoreReason::FileLike));
            }
        }

        let source = request
            .source
            .as_ref()
            .and_then(|id| self.store.shape(id))
            .filter(Shape::is_frame);

        let key = dedup_key(source.as_ref().map(|s| &s.id), target.as_str());
        if !self.dedup.lock().check_and_record(&key) {
            tracing::debug!("Suppressed duplicate creation request {}", key);
            return Ok(RouteOutcome::Duplicate);
        }

        let frames: Vec<Rect> = self
            .store
            .shapes_of_kind(ShapeKind::Frame)
            .iter()
            .map(Shape::bounds)
            .collect();
        let placement = match &source {
            Some(shape) => Placement::RelativeTo(shape.bounds()),
            None => Placement::FreeColumn(request.anchor),
        };
        let bounds = self
            .planner
            .frame_bounds(self.planner.place_new_frame(placement, &frames));

        let frame = ShapeId::generate();
        if let Err(e) = self
            .store
            .create_shape(Shape::frame(frame.clone(), bounds, target.as_str()))
        {
            // Nothing was created, so a retry must not count as a duplicate.
            self.dedup.lock().forget(&key);
            return Err(e.into());
        }

        let edge = match &source {
            Some(shape) => match self.lifecycle.create_edge(&shape.id, &frame) {
                Ok(edge) => Some(edge),
                Err(e) => {
                    tracing::warn!("Failed to link {} to new frame {}: {}", shape.id, frame, e);
                    None
                }
            },
            None => None,
        };

        self.focus(bounds);
        tracing::info!("Opened frame {} for {}", frame, target);
        Ok(RouteOutcome::FrameCreated { frame, edge })
    }

    /// Camera focus on `bounds` with the bumped, clamped zoom.
    pub fn focus(&self, bounds: Rect) {
        let zoom = focus_zoom(
            self.host.zoom_level(),
            self.config.zoom_bump,
            self.config.min_zoom,
            self.config.max_zoom,
        );
        self.host
            .zoom_to_bounds(bounds, zoom, self.config.focus_animation());
    }

    fn forward_gesture(&self, frame: &Shape, delta_y: f64, client_x: f64, client_y: f64) -> RouteOutcome {
        let page = frame.origin().offset(client_x, client_y);
        let position = self.host.page_to_screen(page);
        self.host.dispatch_wheel(WheelInput {
            position,
            delta_y,
            ctrl_key: true,
        });
        RouteOutcome::GestureForwarded(position)
    }

    /// The frame a message came from: the hint as a frame id, then the hint
    /// as a window key, then the origin window.
    fn resolve_source(&self, hint: Option<&str>, origin: Option<&str>) -> Option<Shape> {
        let frame = |id: &ShapeId| self.store.shape(id).filter(Shape::is_frame);
        let windows = self.windows.read();

        if let Some(hint) = hint {
            if let Some(shape) = frame(&ShapeId::from(hint)) {
                return Some(shape);
            }
            if let Some(shape) = windows.get(hint).and_then(|id| frame(id)) {
                return Some(shape);
            }
        }
        origin
            .and_then(|key| windows.get(key))
            .and_then(|id| frame(id))
    }

    fn ignore(&self, kind: &str, reason: IgnoreReason) -> RouteOutcome {
        self.diagnostics.record(DiagnosticEvent::MessageDropped {
            kind: kind.to_string(),
            reason: reason.clone(),
        });
        RouteOutcome::Ignored(reason)
    }
}
