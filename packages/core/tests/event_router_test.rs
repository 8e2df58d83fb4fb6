//! Inbound Event Router Tests
//!
//! Integration tests for messages posted by embedded content.
//!
//! ## Test Coverage
//! - Duplicate creation requests inside the dedup window
//! - Relative placement and camera focus after creation
//! - Source resolution by hint and by registered window
//! - Viewport gesture forwarding in host coordinates
//! - Focus requests
//! - Malformed, external and file-like messages

#[cfg(test)]
mod event_router_tests {
    use anyhow::Result;
    use framegraph_core::db::{DocumentStore, MemoryStore};
    use framegraph_core::diagnostics::{DiagnosticEvent, DiagnosticsSink};
    use framegraph_core::host::{CanvasHost, HeadlessCanvas};
    use framegraph_core::{
        FrameGraph, GraphConfig, GraphError, IgnoreReason, Point, Rect, RouteOutcome, ShapeId, ShapeKind,
    };
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingDiagnostics {
        events: Mutex<Vec<DiagnosticEvent>>,
    }

    impl DiagnosticsSink for RecordingDiagnostics {
        fn record(&self, event: DiagnosticEvent) {
            self.events.lock().push(event);
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        host: Arc<HeadlessCanvas>,
        diagnostics: Arc<RecordingDiagnostics>,
        graph: FrameGraph,
        source: ShapeId,
    }

    fn fixture() -> Result<Fixture> {
        let store = Arc::new(MemoryStore::new());
        let host = Arc::new(HeadlessCanvas::default());
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let graph = FrameGraph::builder(store.clone(), host.clone())
            .diagnostics(diagnostics.clone())
            .build()?;
        let source = graph.create_frame_at(
            Point::new(100.0, 100.0),
            "https://en.m.wikipedia.org/wiki/Graph_theory",
        )?;
        Ok(Fixture {
            store,
            host,
            diagnostics,
            graph,
            source,
        })
    }

    fn link(href: &str, source: &ShapeId) -> serde_json::Value {
        json!({ "type": "link-followed", "href": href, "sourceId": source.as_str() })
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_requests_within_window_create_one_frame() -> Result<()> {
        let f = fixture()?;
        let message = link("/wiki/Vertex_(graph_theory)", &f.source);

        let first = f.graph.route_message(&message, None)?;
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Same target through the legacy tag and a proxy-wrapped href.
        let second = f.graph.route_message(
            &json!({
                "type": "wiki-link",
                "href": "/m?path=%2Fwiki%2FVertex_(graph_theory)",
                "sourceId": f.source.as_str(),
            }),
            None,
        )?;

        assert!(matches!(first, RouteOutcome::FrameCreated { edge: Some(_), .. }));
        assert_eq!(second, RouteOutcome::Duplicate);
        assert_eq!(f.store.shapes_of_kind(ShapeKind::Frame).len(), 2);
        assert_eq!(f.store.shapes_of_kind(ShapeKind::Edge).len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_request_after_window_creates_again() -> Result<()> {
        let f = fixture()?;
        let message = link("/wiki/Edge", &f.source);

        f.graph.route_message(&message, None)?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        let again = f.graph.route_message(&message, None)?;

        assert!(matches!(again, RouteOutcome::FrameCreated { .. }));
        assert_eq!(f.store.shapes_of_kind(ShapeKind::Frame).len(), 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_creation_does_not_suppress_retry() -> Result<()> {
        let f = fixture()?;
        let message = link("/wiki/Tree_(graph_theory)", &f.source);

        f.store.fail_next_creates(1);
        let failed = f.graph.route_message(&message, None);
        assert!(matches!(failed, Err(GraphError::Store(_))));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let retried = f.graph.route_message(&message, None)?;

        assert!(matches!(retried, RouteOutcome::FrameCreated { edge: Some(_), .. }));
        assert_eq!(f.store.shapes_of_kind(ShapeKind::Frame).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_created_frame_is_placed_right_of_source_and_focused() -> Result<()> {
        let f = fixture()?;
        let config = GraphConfig::default();

        let outcome = f.graph.route_message(&link("/wiki/Path_(graph_theory)", &f.source), None)?;
        let RouteOutcome::FrameCreated { frame, edge } = outcome else {
            panic!("expected a new frame, got {:?}", outcome);
        };

        let shape = f.store.shape(&frame).expect("new frame");
        assert_eq!(shape.x, 100.0 + config.frame_width + config.gap);
        assert_eq!(shape.y, 100.0);
        assert_eq!(
            shape.url(),
            Some("https://en.m.wikipedia.org/wiki/Path_(graph_theory)")
        );

        let edge = edge.expect("edge from source");
        assert!(f.graph.edges_of(&f.source).contains(&edge));
        assert!(f.graph.edges_of(&frame).contains(&edge));

        let request = *f.host.zoom_requests().last().expect("focus request");
        assert_eq!(request.bounds, shape.bounds());
        assert_eq!(request.zoom, config.max_zoom);
        assert_eq!(request.animation, config.focus_animation());
        Ok(())
    }

    #[tokio::test]
    async fn test_registered_window_resolves_source() -> Result<()> {
        let f = fixture()?;
        f.graph.register_window("window-1", f.source.clone());

        let outcome = f.graph.route_message(
            &json!({ "type": "link-followed", "href": "/wiki/Cycle_(graph_theory)" }),
            Some("window-1"),
        )?;

        assert!(matches!(outcome, RouteOutcome::FrameCreated { edge: Some(_), .. }));
        assert_eq!(f.graph.edges_of(&f.source).len(), 1);

        assert_eq!(f.graph.unregister_window("window-1"), Some(f.source.clone()));
        Ok(())
    }

    #[tokio::test]
    async fn test_link_without_source_opens_unlinked_frame() -> Result<()> {
        let f = fixture()?;

        let outcome = f.graph.route_message(
            &json!({ "type": "link-followed", "href": "https://de.wikipedia.org/wiki/Baum" }),
            None,
        )?;

        let RouteOutcome::FrameCreated { frame, edge: None } = outcome else {
            panic!("expected an unlinked frame, got {:?}", outcome);
        };
        assert!(f.store.shapes_of_kind(ShapeKind::Edge).is_empty());

        // Two columns past the right edge of the existing frame.
        let config = GraphConfig::default();
        let shape = f.store.shape(&frame).expect("new frame");
        let step = config.frame_width + config.gap;
        assert_eq!(shape.x, 100.0 + config.frame_width + 2.0 * step);
        assert_eq!(shape.y, config.default_anchor.y);
        Ok(())
    }

    #[tokio::test]
    async fn test_viewport_gesture_is_replayed_in_host_space() -> Result<()> {
        let f = fixture()?;
        f.host.set_camera(-50.0, 20.0, 0.5);
        f.graph.register_window("window-1", f.source.clone());

        let outcome = f.graph.route_message(
            &json!({ "type": "iframe-zoom", "deltaY": -120.0, "clientX": 40.0, "clientY": 60.0 }),
            Some("window-1"),
        )?;

        // Page point (140, 160) under camera (-50, 20) at zoom 0.5.
        let expected = Point::new(45.0, 90.0);
        assert_eq!(outcome, RouteOutcome::GestureForwarded(expected));
        let inputs = f.host.wheel_inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].position, expected);
        assert_eq!(inputs[0].delta_y, -120.0);
        assert!(inputs[0].ctrl_key);
        assert!(f.host.zoom_level() > 0.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_focus_request_zooms_to_frame() -> Result<()> {
        let f = fixture()?;
        f.host.set_camera(0.0, 0.0, 0.5);

        let outcome = f.graph.route_message(
            &json!({ "type": "content-focus-request", "sourceId": f.source.as_str() }),
            None,
        )?;

        assert_eq!(outcome, RouteOutcome::Focused(f.source.clone()));
        let request = *f.host.zoom_requests().last().expect("focus request");
        assert_eq!(request.bounds, Rect::new(100.0, 100.0, 480.0, 640.0));
        assert!((request.zoom - 0.6).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_unusable_messages_are_ignored_and_reported() -> Result<()> {
        let f = fixture()?;
        let cases = [
            (json!({ "type": "bogus" }), IgnoreReason::Malformed),
            (json!({ "type": "link-followed" }), IgnoreReason::Malformed),
            (json!({ "href": "/wiki/Rust" }), IgnoreReason::Malformed),
            (json!({ "type": "link-followed", "href": "#top" }), IgnoreReason::UnresolvedReference),
            (
                json!({ "type": "link-followed", "href": "https://example.com/page" }),
                IgnoreReason::ExternalHost,
            ),
            (
                json!({ "type": "link-followed", "href": "/wiki/File:Graph.svg" }),
                IgnoreReason::FileLike,
            ),
            (
                json!({ "type": "content-focus-request", "sourceId": "shape:missing" }),
                IgnoreReason::UnknownSource,
            ),
            (
                json!({ "type": "viewport-gesture", "deltaY": 1.0, "clientX": 0.0, "clientY": 0.0 }),
                IgnoreReason::UnknownSource,
            ),
        ];

        for (message, reason) in &cases {
            let outcome = f.graph.route_message(message, None)?;
            assert_eq!(outcome, RouteOutcome::Ignored(reason.clone()), "message {}", message);
        }

        assert_eq!(f.store.shapes_of_kind(ShapeKind::Frame).len(), 1);
        let events = f.diagnostics.events.lock();
        let dropped = events
            .iter()
            .filter(|e| matches!(e, DiagnosticEvent::MessageDropped { .. }))
            .count();
        assert_eq!(dropped, cases.len());
        Ok(())
    }

    #[tokio::test]
    async fn test_external_hosts_allowed_when_unrestricted() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let config = GraphConfig {
            restrict_to_wikimedia: false,
            ..Default::default()
        };
        let graph = FrameGraph::builder(store.clone(), Arc::new(HeadlessCanvas::default()))
            .config(config)
            .build()?;

        let outcome = graph.route_message(
            &json!({ "type": "link-followed", "href": "https://example.com/page" }),
            None,
        )?;

        assert!(matches!(outcome, RouteOutcome::FrameCreated { .. }));
        Ok(())
    }
}
