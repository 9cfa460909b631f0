//! Async repository surface over the relational store.
//!
//! Every capability the workers consume lives here: inventory listing and
//! counting, batch persistence of synthesized entities, dataset catalog
//! access, graph metadata bookkeeping and the atomic build claim.

use crate::duration_since_unix_epoch;
use crate::models::{
    Dataset, DatasetStatistics, Flight, GraphMetadata, InProgressBuild, Route, Stop,
};
use crate::schema::transit::{datasets, flights, graph_metadata, in_progress_builds, routes, stops};
use crate::virtual_ids::{normalize_city_name, virtual_stop_id};
use anyhow::Result;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use itertools::Itertools;

const INSERT_CHUNK_SIZE: usize = 128;

// ---------------------------------------------------------------------------
// Stops
// ---------------------------------------------------------------------------

pub async fn get_all_stops(conn: &mut AsyncPgConnection) -> Result<Vec<Stop>> {
    Ok(stops::table.select(Stop::as_select()).load(conn).await?)
}

pub async fn get_all_real_stops(conn: &mut AsyncPgConnection) -> Result<Vec<Stop>> {
    Ok(stops::table
        .filter(stops::is_virtual.eq(false))
        .select(Stop::as_select())
        .load(conn)
        .await?)
}

pub async fn get_all_virtual_stops(conn: &mut AsyncPgConnection) -> Result<Vec<Stop>> {
    Ok(stops::table
        .filter(stops::is_virtual.eq(true))
        .select(Stop::as_select())
        .load(conn)
        .await?)
}

pub async fn count_real_stops(conn: &mut AsyncPgConnection) -> Result<i64> {
    Ok(stops::table
        .filter(stops::is_virtual.eq(false))
        .count()
        .get_result(conn)
        .await?)
}

pub async fn count_virtual_stops(conn: &mut AsyncPgConnection) -> Result<i64> {
    Ok(stops::table
        .filter(stops::is_virtual.eq(true))
        .count()
        .get_result(conn)
        .await?)
}

/// Real stops covering a city, matched on normalized city id or stop name.
/// City ids in upstream feeds are free-form, so the comparison happens here
/// rather than in SQL.
pub async fn get_real_stops_by_city(
    conn: &mut AsyncPgConnection,
    city: &str,
) -> Result<Vec<Stop>> {
    let needle = normalize_city_name(city);
    let all = get_all_real_stops(conn).await?;
    Ok(all
        .into_iter()
        .filter(|stop| {
            stop.city_id
                .as_deref()
                .map(normalize_city_name)
                .is_some_and(|c| c == needle)
                || normalize_city_name(&stop.name) == needle
        })
        .collect())
}

/// Virtual stops for a city resolve through the deterministic id, so the
/// lookup needs no name comparison at all.
pub async fn get_virtual_stops_by_city(
    conn: &mut AsyncPgConnection,
    city: &str,
) -> Result<Vec<Stop>> {
    Ok(stops::table
        .filter(stops::is_virtual.eq(true))
        .filter(stops::stop_id.eq(virtual_stop_id(city)))
        .select(Stop::as_select())
        .load(conn)
        .await?)
}

pub async fn save_virtual_stops_batch(
    conn: &mut AsyncPgConnection,
    virtual_stops: &[Stop],
) -> Result<usize> {
    let mut chunks = Vec::new();
    for chunk in &virtual_stops.iter().chunks(INSERT_CHUNK_SIZE) {
        chunks.push(chunk.cloned().collect::<Vec<Stop>>());
    }

    let inserted = conn
        .build_transaction()
        .run::<usize, diesel::result::Error, _>(|conn| {
            Box::pin(async move {
                let mut inserted = 0;
                for chunk in chunks {
                    inserted += diesel::insert_into(stops::table)
                        .values(chunk)
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                }
                Ok(inserted)
            })
        })
        .await?;

    Ok(inserted)
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub async fn get_all_routes(conn: &mut AsyncPgConnection) -> Result<Vec<Route>> {
    Ok(routes::table.select(Route::as_select()).load(conn).await?)
}

pub async fn get_all_virtual_routes(conn: &mut AsyncPgConnection) -> Result<Vec<Route>> {
    Ok(routes::table
        .filter(routes::is_virtual.eq(true))
        .select(Route::as_select())
        .load(conn)
        .await?)
}

pub async fn count_routes(conn: &mut AsyncPgConnection) -> Result<i64> {
    Ok(routes::table.count().get_result(conn).await?)
}

pub async fn count_virtual_routes(conn: &mut AsyncPgConnection) -> Result<i64> {
    Ok(routes::table
        .filter(routes::is_virtual.eq(true))
        .count()
        .get_result(conn)
        .await?)
}

pub async fn save_virtual_routes_batch(
    conn: &mut AsyncPgConnection,
    virtual_routes: &[Route],
) -> Result<usize> {
    let mut chunks = Vec::new();
    for chunk in &virtual_routes.iter().chunks(INSERT_CHUNK_SIZE) {
        chunks.push(chunk.cloned().collect::<Vec<Route>>());
    }

    let inserted = conn
        .build_transaction()
        .run::<usize, diesel::result::Error, _>(|conn| {
            Box::pin(async move {
                let mut inserted = 0;
                for chunk in chunks {
                    inserted += diesel::insert_into(routes::table)
                        .values(chunk)
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                }
                Ok(inserted)
            })
        })
        .await?;

    Ok(inserted)
}

// ---------------------------------------------------------------------------
// Flights
// ---------------------------------------------------------------------------

pub async fn get_all_flights(conn: &mut AsyncPgConnection) -> Result<Vec<Flight>> {
    Ok(flights::table.select(Flight::as_select()).load(conn).await?)
}

pub async fn count_flights(conn: &mut AsyncPgConnection) -> Result<i64> {
    Ok(flights::table.count().get_result(conn).await?)
}

pub async fn save_flights_batch(
    conn: &mut AsyncPgConnection,
    new_flights: &[Flight],
) -> Result<usize> {
    let mut chunks = Vec::new();
    for chunk in &new_flights.iter().chunks(INSERT_CHUNK_SIZE) {
        chunks.push(chunk.cloned().collect::<Vec<Flight>>());
    }

    let inserted = conn
        .build_transaction()
        .run::<usize, diesel::result::Error, _>(|conn| {
            Box::pin(async move {
                let mut inserted = 0;
                for chunk in chunks {
                    inserted += diesel::insert_into(flights::table)
                        .values(chunk)
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                }
                Ok(inserted)
            })
        })
        .await?;

    Ok(inserted)
}

// ---------------------------------------------------------------------------
// Dataset catalog
// ---------------------------------------------------------------------------

pub async fn get_latest_dataset(conn: &mut AsyncPgConnection) -> Result<Option<Dataset>> {
    Ok(datasets::table
        .filter(datasets::is_current.eq(true))
        .order(datasets::created_at.desc())
        .select(Dataset::as_select())
        .first(conn)
        .await
        .optional()?)
}

pub async fn update_statistics(
    conn: &mut AsyncPgConnection,
    version: &str,
    statistics: DatasetStatistics,
) -> Result<()> {
    diesel::update(datasets::table.filter(datasets::version.eq(version)))
        .set(statistics)
        .execute(conn)
        .await?;
    Ok(())
}

/// Recount every entity class and fold the totals into `DatasetStatistics`.
pub async fn recompute_statistics(conn: &mut AsyncPgConnection) -> Result<DatasetStatistics> {
    let real_stops = count_real_stops(conn).await?;
    let virtual_stops = count_virtual_stops(conn).await?;
    let routes_total = count_routes(conn).await?;
    let virtual_routes = count_virtual_routes(conn).await?;
    let flights_total = count_flights(conn).await?;
    let virtual_flights: i64 = flights::table
        .filter(flights::is_virtual.eq(true))
        .count()
        .get_result(conn)
        .await?;

    Ok(DatasetStatistics {
        stop_count: (real_stops + virtual_stops) as i32,
        virtual_stop_count: virtual_stops as i32,
        route_count: routes_total as i32,
        virtual_route_count: virtual_routes as i32,
        flight_count: flights_total as i32,
        virtual_flight_count: virtual_flights as i32,
    })
}

// ---------------------------------------------------------------------------
// Graph metadata
// ---------------------------------------------------------------------------

pub async fn get_graph_metadata_by_dataset_version(
    conn: &mut AsyncPgConnection,
    dataset_version: &str,
) -> Result<Vec<GraphMetadata>> {
    Ok(graph_metadata::table
        .filter(graph_metadata::dataset_version.eq(dataset_version))
        .select(GraphMetadata::as_select())
        .load(conn)
        .await?)
}

pub async fn save_graph_metadata(
    conn: &mut AsyncPgConnection,
    record: &GraphMetadata,
) -> Result<()> {
    diesel::insert_into(graph_metadata::table)
        .values(record)
        .execute(conn)
        .await?;
    Ok(())
}

/// Deactivate every version and activate the given one, in one transaction,
/// so readers always observe exactly one active row.
pub async fn set_active_graph_metadata(
    conn: &mut AsyncPgConnection,
    graph_version: &str,
) -> Result<()> {
    let graph_version = graph_version.to_string();
    conn.build_transaction()
        .run::<(), diesel::result::Error, _>(|conn| {
            Box::pin(async move {
                diesel::update(graph_metadata::table)
                    .set(graph_metadata::active.eq(false))
                    .execute(conn)
                    .await?;
                diesel::update(
                    graph_metadata::table
                        .filter(graph_metadata::graph_version.eq(graph_version)),
                )
                .set(graph_metadata::active.eq(true))
                .execute(conn)
                .await?;
                Ok(())
            })
        })
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Build claims
// ---------------------------------------------------------------------------

/// Returns true when this invocation owns the claim. A concurrent worker that
/// lost the race gets false and must skip.
pub async fn try_claim_build(
    conn: &mut AsyncPgConnection,
    dataset_version: &str,
    job_name: &str,
) -> Result<bool> {
    let claim = InProgressBuild {
        dataset_version: dataset_version.to_string(),
        job_name: job_name.to_string(),
        claimed_unix_time_ms: duration_since_unix_epoch().as_millis() as i64,
    };

    let inserted = diesel::insert_into(in_progress_builds::table)
        .values(&claim)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;

    Ok(inserted == 1)
}

pub async fn release_build_claim(
    conn: &mut AsyncPgConnection,
    dataset_version: &str,
    job_name: &str,
) -> Result<()> {
    diesel::delete(
        in_progress_builds::table
            .filter(in_progress_builds::dataset_version.eq(dataset_version))
            .filter(in_progress_builds::job_name.eq(job_name)),
    )
    .execute(conn)
    .await?;
    Ok(())
}
