//! Publish phase: adjacency artifact, metadata row, activation.
//!
//! Ordering is the whole point here. The artifact and the inactive metadata
//! row are durably written before the active flag flips and the store
//! pointer moves; a failure anywhere before activation leaves the previous
//! version serving.

use anyhow::Result;
use chrono::Utc;
use log::info;
use taiga::duration_since_unix_epoch;
use taiga::graph_formats::{GraphArtifact, GraphEdge, GraphNode, GraphSummary, build_adjacency};
use taiga::graph_store::GraphStore;
use taiga::models::GraphMetadata;
use taiga::store;

pub fn make_artifact(
    graph_version: &str,
    dataset_version: &str,
    nodes: &[GraphNode],
    edges: &[GraphEdge],
) -> GraphArtifact {
    GraphArtifact {
        graph_version: graph_version.to_string(),
        node_ids: nodes.iter().map(|n| n.stop_id.clone()).collect(),
        adjacency: build_adjacency(edges),
        summary: GraphSummary {
            dataset_version: dataset_version.to_string(),
            node_count: nodes.len(),
            edge_count: edges.len(),
            built_at_unix_ms: duration_since_unix_epoch().as_millis() as u64,
        },
    }
}

pub async fn publish_graph(
    conn: &mut diesel_async::AsyncPgConnection,
    graph_store: &GraphStore,
    dataset_version: &str,
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    build_started: std::time::Instant,
) -> Result<GraphMetadata> {
    let graph_version = format!("graph-v{}", duration_since_unix_epoch().as_millis());

    let artifact = make_artifact(&graph_version, dataset_version, nodes, edges);
    let backup_path = graph_store.save_graph(&artifact)?;
    info!(
        "wrote artifact {} to {}",
        graph_version,
        backup_path.display()
    );

    let record = GraphMetadata {
        graph_version: graph_version.clone(),
        dataset_version: dataset_version.to_string(),
        node_count: nodes.len() as i32,
        edge_count: edges.len() as i32,
        build_duration_ms: build_started.elapsed().as_millis() as i64,
        cache_key: graph_version.clone(),
        backup_path: Some(backup_path.display().to_string()),
        active: false,
        created_at: Utc::now(),
    };
    store::save_graph_metadata(conn, &record).await?;

    // only after the metadata row is durable: flip active, move the pointer
    store::set_active_graph_metadata(conn, &graph_version).await?;
    graph_store.set_graph_version(&graph_version)?;

    info!(
        "graph {} activated for dataset {} ({} nodes, {} edges)",
        graph_version,
        dataset_version,
        nodes.len(),
        edges.len()
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_mirrors_nodes_and_edges() {
        let nodes = vec![
            GraphNode {
                stop_id: "a".to_string(),
                lat: None,
                lon: None,
                city_id: Some("Алдан".to_string()),
                is_virtual: false,
            },
            GraphNode {
                stop_id: "b".to_string(),
                lat: None,
                lon: None,
                city_id: None,
                is_virtual: true,
            },
        ];
        let edges = vec![GraphEdge {
            from: "a".to_string(),
            to: "b".to_string(),
            weight_minutes: 70.0,
            distance_km: Some(60.0),
            transport_mode: Some(4),
            route_id: Some("r".to_string()),
        }];

        let artifact = make_artifact("graph-v1", "ds-1", &nodes, &edges);
        assert_eq!(artifact.node_ids, vec!["a", "b"]);
        assert_eq!(artifact.summary.node_count, 2);
        assert_eq!(artifact.summary.edge_count, 1);
        assert_eq!(artifact.adjacency["a"][0].neighbor_id, "b");
        assert_eq!(artifact.adjacency["a"][0].metadata.distance, Some(60.0));
    }
}
