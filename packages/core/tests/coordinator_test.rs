//! Coordinator Tests
//!
//! Integration tests for the `FrameGraph` runtime surface.
//!
//! ## Test Coverage
//! - Builder validation and diagnostics selection
//! - Z-order passes released by animation frames or the fallback timer
//! - Search overlay: debounced lookups, failures, stale results, choose and dismiss
//! - Runtime start/shutdown
//! - Edge churn racing sweeps and index rebuilds on a multi-threaded runtime

#[cfg(test)]
mod coordinator_tests {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use framegraph_core::db::{DocumentStore, MemoryStore};
    use framegraph_core::diagnostics::{DiagnosticEvent, DiagnosticsSink};
    use framegraph_core::host::HeadlessCanvas;
    use framegraph_core::{
        FrameGraph, GraphConfig, GraphError, Point, RouteOutcome, ShapeId, ShapeKind,
        Suggestion, SuggestionProvider, TaskKind,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
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

    /// Provider answering every query with one article, recording queries
    #[derive(Default)]
    struct EchoProvider {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SuggestionProvider for EchoProvider {
        async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>> {
            self.queries.lock().push(query.to_string());
            Ok(vec![Suggestion {
                title: query.to_string(),
                url: format!("https://en.m.wikipedia.org/wiki/{}", query),
            }])
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl SuggestionProvider for FailingProvider {
        async fn suggest(&self, _query: &str) -> Result<Vec<Suggestion>> {
            Err(anyhow!("suggestion service unavailable"))
        }
    }

    fn build_with(store: &Arc<MemoryStore>, provider: Arc<dyn SuggestionProvider>) -> Result<FrameGraph> {
        Ok(FrameGraph::builder(store.clone(), Arc::new(HeadlessCanvas::default()))
            .suggestions(provider)
            .build()?)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let config = GraphConfig {
            gap: -1.0,
            ..Default::default()
        };
        let result = FrameGraph::builder(store, Arc::new(HeadlessCanvas::default()))
            .config(config)
            .build();
        assert!(matches!(result, Err(GraphError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_frame_releases_normalize_pass() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build_with(&store, Arc::new(EchoProvider::default()))?;
        let p = graph.create_frame_at(Point::new(0.0, 0.0), "https://en.m.wikipedia.org/wiki/A")?;
        let q = graph.create_frame_at(Point::new(600.0, 0.0), "https://en.m.wikipedia.org/wiki/B")?;
        let edge = graph.create_edge(&p, &q)?;
        store.bring_to_front(&[edge.clone()])?;

        graph.schedule_normalize();
        assert!(graph.is_pending(&TaskKind::Normalize));
        tokio::task::yield_now().await;
        graph.animation_frame();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(!graph.is_pending(&TaskKind::Normalize));
        assert_eq!(store.stacking_order(), vec![edge, p, q]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_normalize_falls_back_to_timer() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build_with(&store, Arc::new(EchoProvider::default()))?;
        let p = graph.create_frame_at(Point::new(0.0, 0.0), "https://en.m.wikipedia.org/wiki/A")?;
        let q = graph.create_frame_at(Point::new(600.0, 0.0), "https://en.m.wikipedia.org/wiki/B")?;
        let edge = graph.create_edge(&p, &q)?;
        store.bring_to_front(&[edge.clone()])?;
        graph.schedule_normalize();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.stacking_order().first(), Some(&edge));
        assert!(!graph.normalize_now());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_lookup_is_debounced() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(EchoProvider::default());
        let graph = build_with(&store, provider.clone())?;

        let overlay = graph.open_search(Point::new(200.0, 150.0))?;
        assert_eq!(
            store.shape(&overlay).map(|s| s.kind),
            Some(ShapeKind::OverlayWidget)
        );

        for query in ["R", "Ru", "Rus", "Rust"] {
            graph.update_search(&overlay, query)?;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(*provider.queries.lock(), vec!["Rust".to_string()]);
        let results = graph.search_results(&overlay)?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://en.m.wikipedia.org/wiki/Rust");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_clears_results_without_lookup() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(EchoProvider::default());
        let graph = build_with(&store, provider.clone())?;
        let overlay = graph.open_search(Point::new(0.0, 0.0))?;

        graph.update_search(&overlay, "Graph")?;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(graph.search_results(&overlay)?.len(), 1);

        graph.update_search(&overlay, "Tree")?;
        graph.update_search(&overlay, "   ")?;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(graph.search_results(&overlay)?.is_empty());
        assert_eq!(*provider.queries.lock(), vec!["Graph".to_string()]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lookup_yields_empty_results() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let graph = FrameGraph::builder(store.clone(), Arc::new(HeadlessCanvas::default()))
            .suggestions(Arc::new(FailingProvider))
            .diagnostics(diagnostics.clone())
            .build()?;
        let overlay = graph.open_search(Point::new(0.0, 0.0))?;

        graph.update_search(&overlay, "Rust")?;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(graph.search_results(&overlay)?.is_empty());
        assert!(diagnostics
            .events
            .lock()
            .iter()
            .any(|e| matches!(e, DiagnosticEvent::SuggestionFailed { query, .. } if query == "Rust")));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_choose_suggestion_replaces_overlay_with_frame() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build_with(&store, Arc::new(EchoProvider::default()))?;
        let overlay = graph.open_search(Point::new(300.0, 200.0))?;
        graph.update_search(&overlay, "Rust")?;
        tokio::time::sleep(Duration::from_millis(400)).await;
        let chosen = graph.search_results(&overlay)?.remove(0);

        let outcome = graph.choose_suggestion(&overlay, &chosen)?;

        let RouteOutcome::FrameCreated { frame, edge } = outcome else {
            panic!("expected a new frame, got {:?}", outcome);
        };
        assert!(edge.is_none());
        assert!(!store.contains(&overlay));
        let shape = store.shape(&frame).expect("new frame");
        assert_eq!(shape.origin(), Point::new(300.0, 200.0));
        assert_eq!(shape.url(), Some("https://en.m.wikipedia.org/wiki/Rust"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_pending_lookup() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(EchoProvider::default());
        let graph = build_with(&store, provider.clone())?;
        let overlay = graph.open_search(Point::new(0.0, 0.0))?;

        graph.update_search(&overlay, "Rust")?;
        graph.dismiss_search(&overlay)?;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(provider.queries.lock().is_empty());
        assert!(store.shapes_of_kind(ShapeKind::OverlayWidget).is_empty());
        assert!(matches!(
            graph.update_search(&overlay, "Rust"),
            Err(GraphError::OverlayNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_shutdown() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build_with(&store, Arc::new(EchoProvider::default()))?;

        graph.start();
        graph.start();
        assert!(graph.is_running());

        let frame: ShapeId =
            graph.create_frame_at(Point::new(0.0, 0.0), "https://en.m.wikipedia.org/wiki/A")?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(graph.is_pending(&TaskKind::Sweep));

        graph.shutdown().await;
        assert!(!graph.is_running());
        assert!(!graph.is_pending(&TaskKind::Sweep));
        assert!(!graph.is_pending(&TaskKind::Normalize));
        assert!(store.contains(&frame));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_edge_churn_races_sweeps_and_rebuilds() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = Arc::new(build_with(&store, Arc::new(EchoProvider::default()))?);
        let frames: Vec<ShapeId> = (0..6)
            .map(|i| {
                graph.create_frame_at(
                    Point::new(i as f64 * 600.0, 0.0),
                    "https://en.m.wikipedia.org/wiki/Node",
                )
            })
            .collect::<Result<_, _>>()?;

        let done = Arc::new(AtomicBool::new(false));
        let maintenance = {
            let graph = graph.clone();
            let done = done.clone();
            tokio::spawn(async move {
                let mut swept = Vec::new();
                while !done.load(Ordering::Acquire) {
                    swept.extend(graph.sweep_now().await.outcome.removed);
                    graph.rebuild_index();
                    tokio::task::yield_now().await;
                }
                swept
            })
        };

        let mut kept = Vec::new();
        for round in 0..200 {
            let from = &frames[round % frames.len()];
            let to = &frames[(round + 1) % frames.len()];
            let edge = graph.create_edge(from, to)?;
            if round % 3 == 0 {
                kept.push(edge);
            } else {
                let outcome = graph.delete_edges(&[edge.clone()]).await;
                assert!(outcome.lingering.is_empty());
                assert!(!store.contains(&edge));
            }
            tokio::task::yield_now().await;
        }

        done.store(true, Ordering::Release);
        let swept = maintenance.await?;

        // A sweep may race our own deletes, but never touches a kept edge.
        for edge in &kept {
            assert!(!swept.contains(edge), "sweep removed valid edge {}", edge);
            assert!(store.contains(edge), "valid edge {} was removed", edge);
        }
        assert_eq!(store.shapes_of_kind(ShapeKind::Edge).len(), kept.len());
        assert_eq!(graph.sweep_now().await.deleted(), 0);
        assert!(graph.index_snapshot().check_consistency().is_empty());
        let indexed: usize = frames.iter().map(|f| graph.edges_of(f).len()).sum();
        assert_eq!(indexed, kept.len() * 2);
        Ok(())
    }
}
