//! Load phase, node derivation and the build orchestration.

use crate::edges::{self, HeuristicClassifier};
use crate::publish;
use crate::validation::{self, BuildError, FerryEdgeValidator, GraphValidator, TransferEdgeValidator};
use anyhow::Result;
use chrono::Datelike;
use log::{info, warn};
use taiga::graph_formats::GraphNode;
use taiga::jobs::{DataProcessed, GRAPH_BUILD_JOB, JobResult};
use taiga::graph_store::GraphStore;
use taiga::models::{Flight, Route, Stop};
use taiga::store;

pub struct GraphSourceData {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub flights: Vec<Flight>,
}

pub async fn load_source_data(
    conn: &mut diesel_async::AsyncPgConnection,
) -> Result<GraphSourceData> {
    let stops = store::get_all_stops(conn).await?;
    let routes = store::get_all_routes(conn).await?;
    let flights = store::get_all_flights(conn).await?;
    Ok(GraphSourceData {
        stops,
        routes,
        flights,
    })
}

/// Virtual routes carry no explicit sequence; normalize them to a two-stop
/// sequence so downstream pairing is uniform across both origins.
pub fn normalized_stop_sequence(route: &Route) -> Vec<String> {
    match &route.stop_sequence {
        Some(sequence) if sequence.iter().flatten().count() >= 2 => {
            sequence.iter().flatten().cloned().collect()
        }
        _ => vec![route.from_stop_id.clone(), route.to_stop_id.clone()],
    }
}

/// One node per stop. `is_virtual` is re-derived as "no city id" here, which
/// is a weaker signal than the stop record's own flag; consumers depend on
/// this exact behavior, so the two definitions stay separate.
pub fn derive_nodes(stops: &[Stop]) -> Vec<GraphNode> {
    stops
        .iter()
        .map(|stop| GraphNode {
            stop_id: stop.stop_id.clone(),
            lat: stop.lat,
            lon: stop.lon,
            city_id: stop.city_id.clone(),
            is_virtual: stop.city_id.is_none(),
        })
        .collect()
}

/// Gate, claim, load, derive, validate, publish.
pub async fn run_graph_build(
    conn: &mut diesel_async::AsyncPgConnection,
    graph_store: &GraphStore,
) -> Result<JobResult> {
    let start = std::time::Instant::now();

    let Some(dataset) = store::get_latest_dataset(conn).await? else {
        return Ok(JobResult::skipped(
            "no current dataset; nothing to build",
            start.elapsed().as_millis() as u64,
        ));
    };

    let existing = store::get_graph_metadata_by_dataset_version(conn, &dataset.version).await?;
    if !existing.is_empty() {
        return Ok(JobResult::skipped(
            format!(
                "graph already built for dataset {} ({} version(s))",
                dataset.version,
                existing.len()
            ),
            start.elapsed().as_millis() as u64,
        ));
    }

    if !store::try_claim_build(conn, &dataset.version, GRAPH_BUILD_JOB).await? {
        return Ok(JobResult::skipped(
            format!("another worker holds the claim for dataset {}", dataset.version),
            start.elapsed().as_millis() as u64,
        ));
    }

    let outcome = build_and_publish(conn, graph_store, &dataset.version, start).await;

    if let Err(e) = store::release_build_claim(conn, &dataset.version, GRAPH_BUILD_JOB).await {
        warn!("failed to release build claim: {}", e);
    }

    let record = outcome?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(JobResult::completed(
        format!(
            "published graph {} for dataset {} ({} nodes, {} edges)",
            record.graph_version, record.dataset_version, record.node_count, record.edge_count
        ),
        elapsed,
        DataProcessed {
            added: (record.node_count + record.edge_count) as u64,
            ..Default::default()
        },
        None,
    ))
}

async fn build_and_publish(
    conn: &mut diesel_async::AsyncPgConnection,
    graph_store: &GraphStore,
    dataset_version: &str,
    build_started: std::time::Instant,
) -> Result<taiga::models::GraphMetadata> {
    info!("step 1: loading stops, routes and flights");
    let source = load_source_data(conn).await?;
    info!(
        "loaded {} stops, {} routes, {} flights",
        source.stops.len(),
        source.routes.len(),
        source.flights.len()
    );

    info!("step 2: deriving nodes");
    let nodes = derive_nodes(&source.stops);

    info!("step 3: deriving edges");
    let month = chrono::Utc::now().month();
    let classifier = HeuristicClassifier;
    let graph_edges = edges::derive_edges(
        &source.stops,
        &source.routes,
        &source.flights,
        &classifier,
        month,
    );
    info!("derived {} edges", graph_edges.len());

    info!("step 4: validating graph");
    let mut report = validation::validate_structure(&nodes, &graph_edges);
    let domain_validators: [&dyn GraphValidator; 2] =
        [&TransferEdgeValidator, &FerryEdgeValidator];
    for validator in domain_validators {
        let result = validator.validate(&nodes, &graph_edges);
        if !result.errors.is_empty() {
            warn!(
                "{} validator reported {} error(s)",
                validator.name(),
                result.errors.len()
            );
        }
        report.merge(result);
    }
    for warning in &report.warnings {
        warn!("graph validation warning: {}", warning);
    }
    if report.is_fatal() {
        return Err(BuildError::Validation(report.errors).into());
    }

    info!("step 5: publishing artifact");
    publish::publish_graph(
        conn,
        graph_store,
        dataset_version,
        &nodes,
        &graph_edges,
        build_started,
    )
    .await
}
