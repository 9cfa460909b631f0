//! Published graph artifact types.
//!
//! The route-search service consumes exactly this shape: the full node-id
//! list plus an adjacency map from stop id to weighted neighbor entries.
//! Artifacts are immutable once activated; a rebuild produces a new version.

use ahash::AHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Projection of a stop into the graph. `is_virtual` here means "the stop
/// has no city id", which is deliberately a weaker signal than the stop
/// record's own flag; the two are kept separate on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub stop_id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub city_id: Option<String>,
    pub is_virtual: bool,
}

/// A derived, weighted edge. Never persisted as a first-class entity outside
/// the published adjacency artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub weight_minutes: f64,
    pub distance_km: Option<f64>,
    pub transport_mode: Option<i16>,
    pub route_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborMetadata {
    pub distance: Option<f64>,
    pub transport_mode: Option<i16>,
    pub route_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborEntry {
    pub neighbor_id: String,
    /// Minutes.
    pub weight: f64,
    pub metadata: NeighborMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    pub dataset_version: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub built_at_unix_ms: u64,
}

/// The versioned artifact written to the graph store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphArtifact {
    pub graph_version: String,
    pub node_ids: Vec<String>,
    pub adjacency: AHashMap<String, Vec<NeighborEntry>>,
    pub summary: GraphSummary,
}

/// Fold the edge list into the adjacency map the search service consumes.
pub fn build_adjacency(edges: &[GraphEdge]) -> AHashMap<String, Vec<NeighborEntry>> {
    let mut adjacency: AHashMap<String, Vec<NeighborEntry>> = AHashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.from.clone())
            .or_default()
            .push(NeighborEntry {
                neighbor_id: edge.to.clone(),
                weight: edge.weight_minutes,
                metadata: NeighborMetadata {
                    distance: edge.distance_km,
                    transport_mode: edge.transport_mode,
                    route_id: edge.route_id.clone(),
                },
            });
    }
    adjacency
}

/// Generic helper to save any serde value as bincode.
pub fn save_bincode<T: Serialize>(data: &T, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let config = bincode::config::standard();
    let payload = bincode::serde::encode_to_vec(data, config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("encode error: {}", e)))?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Generic helper to load any serde value from bincode.
pub fn load_bincode<T: DeserializeOwned>(path: &Path) -> io::Result<T> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    let config = bincode::config::standard();
    let (decoded, _) = bincode::serde::decode_from_slice(&buffer, config).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bincode decode error: {}", e),
        )
    })?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacency_groups_by_origin() {
        let edges = vec![
            GraphEdge {
                from: "a".into(),
                to: "b".into(),
                weight_minutes: 120.0,
                distance_km: Some(100.0),
                transport_mode: Some(4),
                route_id: Some("r1".into()),
            },
            GraphEdge {
                from: "a".into(),
                to: "c".into(),
                weight_minutes: 60.0,
                distance_km: None,
                transport_mode: None,
                route_id: None,
            },
            GraphEdge {
                from: "b".into(),
                to: "a".into(),
                weight_minutes: 120.0,
                distance_km: Some(100.0),
                transport_mode: Some(4),
                route_id: Some("r2".into()),
            },
        ];

        let adjacency = build_adjacency(&edges);
        assert_eq!(adjacency.len(), 2);
        assert_eq!(adjacency["a"].len(), 2);
        assert_eq!(adjacency["b"].len(), 1);
        assert_eq!(adjacency["a"][0].neighbor_id, "b");
        assert_eq!(adjacency["a"][0].metadata.route_id.as_deref(), Some("r1"));
    }

    #[test]
    fn artifact_bincode_roundtrip() {
        let edges = vec![GraphEdge {
            from: "a".into(),
            to: "b".into(),
            weight_minutes: 95.5,
            distance_km: Some(80.0),
            transport_mode: Some(2),
            route_id: Some("ferry-1".into()),
        }];
        let artifact = GraphArtifact {
            graph_version: "graph-v1700000000000".to_string(),
            node_ids: vec!["a".into(), "b".into()],
            adjacency: build_adjacency(&edges),
            summary: GraphSummary {
                dataset_version: "ds-1".to_string(),
                node_count: 2,
                edge_count: 1,
                built_at_unix_ms: 1_700_000_000_000,
            },
        };

        let dir = std::env::temp_dir();
        let path = dir.join(format!("taiga-artifact-test-{}.bin", std::process::id()));
        save_bincode(&artifact, &path).expect("save");
        let decoded: GraphArtifact = load_bincode(&path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(decoded.graph_version, artifact.graph_version);
        assert_eq!(decoded.node_ids.len(), 2);
        assert_eq!(decoded.adjacency["a"][0].weight, 95.5);
        assert_eq!(decoded.summary.edge_count, 1);
    }
}
