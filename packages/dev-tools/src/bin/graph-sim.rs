//! Headless Graph Simulator
//!
//! Drives a `FrameGraph` over an in-memory store and a renderer-less canvas
//! through a scripted browsing session, logging what the consistency layer
//! does at each step. Useful for watching sweep, dedup and z-order behavior
//! without a host application.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin graph-sim
//!
//! # More detail from the core
//! RUST_LOG=framegraph_core=debug cargo run --bin graph-sim
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")
//! - `FRAMEGRAPH_*`: Graph configuration overrides (see `GraphConfig::from_env`)
//!
//! # Session
//!
//! 1. Follow links from a root article (relative, alias-tagged, proxied)
//! 2. Fire a duplicate request inside the dedup window
//! 3. Delete a frame and let the store finish its binding teardown
//! 4. Corrupt an edge's binding and wait for the safety net
//! 5. Search, then open the chosen suggestion
//! 6. Print the resulting graph and shut down

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use framegraph_core::db::{DocumentStore, MemoryStore};
use framegraph_core::host::HeadlessCanvas;
use framegraph_core::logging::init_tracing;
use framegraph_core::{
    FrameGraph, GraphConfig, Point, RouteOutcome, ShapeId, ShapeKind, Suggestion,
    SuggestionProvider, Terminal,
};
use serde_json::json;

/// Fixed suggestions so the session is reproducible offline
struct CannedSuggestions;

#[async_trait]
impl SuggestionProvider for CannedSuggestions {
    async fn suggest(&self, query: &str) -> anyhow::Result<Vec<Suggestion>> {
        let titles = ["Rust (programming language)", "Rust (fungus)", "Rust Belt"];
        Ok(titles
            .iter()
            .filter(|title| title.to_lowercase().contains(&query.to_lowercase()))
            .map(|title| Suggestion {
                title: title.to_string(),
                url: format!(
                    "https://en.m.wikipedia.org/wiki/{}",
                    title.replace(' ', "_")
                ),
            })
            .collect())
    }
}

fn created_frame(outcome: &RouteOutcome) -> Option<ShapeId> {
    match outcome {
        RouteOutcome::FrameCreated { frame, .. } => Some(frame.clone()),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    tracing::info!("🧭 FrameGraph headless simulator");
    tracing::info!("==================================");

    let config = GraphConfig::from_env()?;
    let store = Arc::new(MemoryStore::with_deferred_teardown());
    let host = Arc::new(HeadlessCanvas::default());
    let graph = Arc::new(
        FrameGraph::builder(store.clone(), host.clone())
            .config(config)
            .suggestions(Arc::new(CannedSuggestions))
            .build()?,
    );
    graph.start();

    // Stand-in for the host's animation-frame callback (~60 fps).
    let frames = {
        let graph = graph.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(16));
            loop {
                ticker.tick().await;
                graph.animation_frame();
            }
        })
    };

    // Step 1: follow links
    let root = graph.create_frame_at(
        Point::new(120.0, 120.0),
        "https://en.m.wikipedia.org/wiki/Graph_theory",
    )?;
    graph.register_window("root", root.clone());
    tracing::info!("📄 Root frame {}", root);

    let vertex = graph.route_message(
        &json!({ "type": "link-followed", "href": "/wiki/Vertex_(graph_theory)" }),
        Some("root"),
    )?;
    tracing::info!("🔗 Link followed: {:?}", vertex);

    let edge = graph.route_message(
        &json!({
            "type": "wiki-link",
            "href": "/m?path=%2Fwiki%2FEdge_(graph_theory)",
            "sourceId": root.as_str(),
        }),
        None,
    )?;
    tracing::info!("🔗 Proxied link followed: {:?}", edge);

    // Step 2: duplicate inside the dedup window
    tokio::time::sleep(Duration::from_millis(40)).await;
    let duplicate = graph.route_message(
        &json!({ "type": "link-followed", "href": "/wiki/Vertex_(graph_theory)" }),
        Some("root"),
    )?;
    tracing::info!("🔁 Repeated request: {:?}", duplicate);

    // Step 3: delete a frame
    if let Some(vertex_frame) = created_frame(&vertex) {
        store.delete_shapes(&[vertex_frame.clone()])?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let torn_down = store.settle();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tracing::info!(
            "🗑️  Deleted frame {}; {} binding(s) torn down, root now has {} edge(s)",
            vertex_frame,
            torn_down,
            graph.edges_of(&root).len()
        );
    }

    // Step 4: corrupt a binding behind the graph's back
    if let Some(edge_frame) = created_frame(&edge) {
        let far = graph.create_frame_at(
            Point::new(120.0, 1600.0),
            "https://en.m.wikipedia.org/wiki/Path_(graph_theory)",
        )?;
        let corrupted = graph.create_edge(&edge_frame, &far)?;
        if let Some(end) = store
            .bindings_from(&corrupted)
            .into_iter()
            .find(|b| b.terminal == Terminal::End)
        {
            store.remove_binding(&end.id);
        }
        tokio::time::sleep(graph.config().safety_net_interval() + Duration::from_millis(50)).await;
        tracing::info!(
            "🩹 Edge {} after binding loss: {}",
            corrupted,
            if store.contains(&corrupted) { "still present" } else { "removed" }
        );
    }

    // Step 5: search
    let overlay = graph.open_search(Point::new(400.0, 300.0))?;
    graph.update_search(&overlay, "rust")?;
    tokio::time::sleep(graph.config().suggest_debounce() + Duration::from_millis(50)).await;
    let results = graph.search_results(&overlay)?;
    tracing::info!("🔍 {} suggestion(s) for 'rust'", results.len());
    match results.first() {
        Some(choice) => {
            let outcome = graph.choose_suggestion(&overlay, choice)?;
            tracing::info!("🔍 Opened '{}': {:?}", choice.title, outcome);
        }
        None => graph.dismiss_search(&overlay)?,
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Step 6: summary
    let frames_left = store.shapes_of_kind(ShapeKind::Frame);
    let edges_left = store.shapes_of_kind(ShapeKind::Edge);
    tracing::info!("📊 {} frame(s), {} edge(s)", frames_left.len(), edges_left.len());
    for frame in &frames_left {
        tracing::info!(
            "   {} at ({}, {}) {} [{} edge(s)]",
            frame.id,
            frame.x,
            frame.y,
            frame.url().unwrap_or("-"),
            graph.edges_of(&frame.id).len()
        );
    }
    let violations = graph.index_snapshot().check_consistency();
    if violations.is_empty() {
        tracing::info!("✅ Relationship index consistent");
    } else {
        tracing::warn!("⚠️  Index violations: {:?}", violations);
    }

    frames.abort();
    graph.shutdown().await;
    Ok(())
}
