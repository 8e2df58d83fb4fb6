//! Orphan Sweep Tests
//!
//! Integration tests for edge validation and removal.
//!
//! ## Test Coverage
//! - Edge losing one binding without either frame being deleted
//! - Edges bound to a non-frame target
//! - Idempotence of consecutive sweeps
//! - Sweep on an empty graph
//! - Background safety net removing orphans with no explicit trigger

#[cfg(test)]
mod orphan_sweep_tests {
    use anyhow::Result;
    use framegraph_core::db::{DocumentStore, MemoryStore};
    use framegraph_core::host::HeadlessCanvas;
    use framegraph_core::{
        FrameGraph, NewBinding, OrphanReason, Point, Shape, ShapeId, ShapeKind, Terminal,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn build(store: &Arc<MemoryStore>) -> Result<FrameGraph> {
        Ok(FrameGraph::builder(store.clone(), Arc::new(HeadlessCanvas::default())).build()?)
    }

    fn frame(graph: &FrameGraph, x: f64) -> Result<ShapeId> {
        Ok(graph.create_frame_at(Point::new(x, 0.0), "https://en.m.wikipedia.org/wiki/Node")?)
    }

    #[tokio::test]
    async fn test_sweep_removes_edge_with_missing_end_binding() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build(&store)?;
        let p = frame(&graph, 0.0)?;
        let q = frame(&graph, 600.0)?;
        let edge = graph.create_edge(&p, &q)?;

        let end = store
            .bindings_from(&edge)
            .into_iter()
            .find(|b| b.terminal == Terminal::End)
            .expect("end binding");
        store.remove_binding(&end.id);

        let report = graph.sweep_now().await;

        assert_eq!(report.scanned, 1);
        assert_eq!(
            report.orphaned,
            vec![(
                edge.clone(),
                OrphanReason::MissingBinding {
                    terminal: Terminal::End
                }
            )]
        );
        assert_eq!(report.deleted(), 1);
        assert!(!store.contains(&edge));
        assert!(store.contains(&p));
        assert!(store.contains(&q));
        assert!(graph.edges_of(&p).is_empty());
        assert!(graph.edges_of(&q).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_removes_edge_bound_to_overlay() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build(&store)?;
        let p = frame(&graph, 0.0)?;
        let overlay = ShapeId::from("shape:overlay");
        store.create_shape(Shape::overlay(overlay.clone(), Point::new(0.0, 0.0), 100.0, 40.0))?;

        let edge = ShapeId::from("shape:stray");
        store.create_shape(Shape::edge(edge.clone(), Point::new(0.0, 0.0), Point::new(10.0, 0.0)))?;
        for (terminal, target) in [(Terminal::Start, &p), (Terminal::End, &overlay)] {
            store.create_binding(NewBinding {
                from_id: edge.clone(),
                to_id: target.clone(),
                terminal,
                anchor: Point::new(0.5, 0.5),
            })?;
        }

        let report = graph.sweep_now().await;

        assert!(matches!(
            report.orphaned.as_slice(),
            [(id, OrphanReason::TargetNotFrame { kind: ShapeKind::OverlayWidget, .. })] if *id == edge
        ));
        assert!(!store.contains(&edge));
        assert!(store.contains(&overlay));
        Ok(())
    }

    #[tokio::test]
    async fn test_frame_removal_sweeps_even_without_candidates() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build(&store)?;
        let p = frame(&graph, 0.0)?;
        let lone = frame(&graph, 1200.0)?;
        let overlay = ShapeId::from("shape:overlay");
        store.create_shape(Shape::overlay(overlay.clone(), Point::new(0.0, 0.0), 100.0, 40.0))?;

        // Fully bound, unrelated to the removed frame, but invalid.
        let edge = ShapeId::from("shape:stray");
        store.create_shape(Shape::edge(edge.clone(), Point::new(0.0, 0.0), Point::new(10.0, 0.0)))?;
        for (terminal, target) in [(Terminal::Start, &p), (Terminal::End, &overlay)] {
            store.create_binding(NewBinding {
                from_id: edge.clone(),
                to_id: target.clone(),
                terminal,
                anchor: Point::new(0.5, 0.5),
            })?;
        }

        let mut changes = store.subscribe();
        store.delete_shapes(&[lone.clone()])?;
        let batch = changes.recv().await?;

        graph.handle_store_change(&batch).await;

        // Removed by the sweep that follows the frame removal, not by the
        // scheduled pass.
        assert!(!store.contains(&edge));
        assert!(store.contains(&p));
        Ok(())
    }

    #[tokio::test]
    async fn test_consecutive_sweeps_are_idempotent() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build(&store)?;
        let frames: Vec<ShapeId> = (0..4)
            .map(|i| frame(&graph, i as f64 * 600.0))
            .collect::<Result<_>>()?;
        let mut edges = Vec::new();
        for pair in frames.windows(2) {
            edges.push(graph.create_edge(&pair[0], &pair[1])?);
        }
        // Orphan two of the three edges.
        for edge in &edges[..2] {
            let start = store
                .bindings_from(edge)
                .into_iter()
                .find(|b| b.terminal == Terminal::Start)
                .expect("start binding");
            store.remove_binding(&start.id);
        }

        let first = graph.sweep_now().await;
        let second = graph.sweep_now().await;

        assert_eq!(first.deleted(), 2);
        assert_eq!(second.deleted(), 0);
        assert!(second.orphaned.is_empty());
        assert_eq!(second.scanned, 1);
        assert_eq!(store.shapes_of_kind(ShapeKind::Edge).len(), 1);
        assert!(graph.index_snapshot().check_consistency().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_on_empty_graph() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build(&store)?;

        let report = graph.sweep_now().await;

        assert_eq!(report.scanned, 0);
        assert_eq!(report.deleted(), 0);
        assert!(report.orphaned.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_runtime_cleans_up_unbound_edge() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let graph = build(&store)?;
        graph.start();

        let edge = ShapeId::from("shape:unbound");
        store.create_shape(Shape::edge(edge.clone(), Point::new(0.0, 0.0), Point::new(10.0, 0.0)))?;
        assert!(store.contains(&edge));

        // Within one safety-net period, even with no animation frames.
        tokio::time::sleep(Duration::from_millis(450)).await;

        assert!(!store.contains(&edge));
        graph.shutdown().await;
        Ok(())
    }
}
