//! Structural and domain validation. Any reported error aborts the build;
//! warnings are logged and non-fatal. No partial graph is ever published.

use ahash::{AHashMap, AHashSet};
use taiga::enum_to_int::{TransportMode, transport_mode_to_int};
use taiga::graph_formats::{GraphEdge, GraphNode};

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_fatal(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("graph validation failed with {n} error(s): {0:?}", n = .0.len())]
    Validation(Vec<String>),
}

/// Baseline invariants: a non-empty graph, finite positive weights, and
/// every endpoint resolving to a known node.
pub fn validate_structure(nodes: &[GraphNode], edges: &[GraphEdge]) -> ValidationReport {
    let mut report = ValidationReport::default();

    if nodes.is_empty() {
        report.errors.push("graph has no nodes".to_string());
    }
    if edges.is_empty() {
        report.errors.push("graph has no edges".to_string());
    }

    let node_ids: AHashSet<&str> = nodes.iter().map(|n| n.stop_id.as_str()).collect();
    for edge in edges {
        if !edge.weight_minutes.is_finite() || edge.weight_minutes <= 0.0 {
            report.errors.push(format!(
                "edge {} -> {} has non-positive weight {}",
                edge.from, edge.to, edge.weight_minutes
            ));
        }
        if !node_ids.contains(edge.from.as_str()) {
            report
                .errors
                .push(format!("edge references unknown node {}", edge.from));
        }
        if !node_ids.contains(edge.to.as_str()) {
            report
                .errors
                .push(format!("edge references unknown node {}", edge.to));
        }
    }

    report
}

/// Domain validators run with the full node/edge sets after the structural
/// pass.
pub trait GraphValidator {
    fn name(&self) -> &'static str;
    fn validate(&self, nodes: &[GraphNode], edges: &[GraphEdge]) -> ValidationReport;
}

/// Transfer edges (no route, no mode) must stay within one city and carry a
/// weight from the transfer table.
pub struct TransferEdgeValidator;

const TRANSFER_TABLE_WEIGHTS: [f64; 4] = [30.0, 60.0, 90.0, 120.0];

impl GraphValidator for TransferEdgeValidator {
    fn name(&self) -> &'static str {
        "transfer_edges"
    }

    fn validate(&self, nodes: &[GraphNode], edges: &[GraphEdge]) -> ValidationReport {
        let mut report = ValidationReport::default();
        let city_by_node: AHashMap<&str, Option<&str>> = nodes
            .iter()
            .map(|n| (n.stop_id.as_str(), n.city_id.as_deref()))
            .collect();

        for edge in edges {
            if edge.route_id.is_some() || edge.transport_mode.is_some() {
                continue;
            }
            if edge.from == edge.to {
                report
                    .errors
                    .push(format!("transfer edge loops on stop {}", edge.from));
                continue;
            }
            let from_city = city_by_node.get(edge.from.as_str()).copied().flatten();
            let to_city = city_by_node.get(edge.to.as_str()).copied().flatten();
            match (from_city, to_city) {
                (Some(a), Some(b)) if a == b => {}
                _ => report.errors.push(format!(
                    "transfer edge {} -> {} crosses city boundaries",
                    edge.from, edge.to
                )),
            }
            if !TRANSFER_TABLE_WEIGHTS.contains(&edge.weight_minutes) {
                report.warnings.push(format!(
                    "transfer edge {} -> {} has off-table weight {}",
                    edge.from, edge.to, edge.weight_minutes
                ));
            }
        }

        report
    }
}

/// Ferry edges must connect distinct stops and stay within a plausible
/// crossing-plus-wait envelope.
pub struct FerryEdgeValidator;

impl GraphValidator for FerryEdgeValidator {
    fn name(&self) -> &'static str {
        "ferry_edges"
    }

    fn validate(&self, _nodes: &[GraphNode], edges: &[GraphEdge]) -> ValidationReport {
        let mut report = ValidationReport::default();
        let ferry_mode = transport_mode_to_int(&TransportMode::Ferry);

        for edge in edges {
            if edge.transport_mode != Some(ferry_mode) {
                continue;
            }
            if edge.from == edge.to {
                report
                    .errors
                    .push(format!("ferry edge loops on stop {}", edge.from));
            }
            // a week of minutes; anything beyond is a data defect worth eyes
            if edge.weight_minutes > 10_080.0 {
                report.warnings.push(format!(
                    "ferry edge {} -> {} has implausible weight {}",
                    edge.from, edge.to, edge.weight_minutes
                ));
            }
        }

        report
    }
}
