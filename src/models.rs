// Copyright: Taiga Transit Project
// Virtual connectivity and graph derivation for sparsely served regions

use diesel::prelude::*;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::Value;

/// A stop in the unified inventory. Real stops come from authoritative
/// schedules; virtual stops are synthesized by `larch` for cities with no
/// scheduled service. Virtual stop ids are a stable hash of the normalized
/// city name, see `virtual_ids`.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::transit::stops)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Stop {
    pub stop_id: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub city_id: Option<String>,
    pub is_airport: Option<bool>,
    pub is_railway_station: Option<bool>,
    pub metadata: Option<Value>,
    pub grid_type: String,
    pub is_virtual: bool,
}

/// Route topology record. `stop_sequence` is NULL for virtual routes, which
/// are always direct two-stop connections; the graph builder normalizes them
/// to `[from_stop_id, to_stop_id]`.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::transit::routes)]
pub struct Route {
    pub route_id: String,
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub stop_sequence: Option<Vec<Option<String>>>,
    pub transport_mode: i16,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub metadata: Option<Value>,
    pub is_virtual: bool,
}

/// A scheduled trip instance. Kept under its legacy name "flight" even though
/// the mode can be bus, ferry or shuttle.
/// `weekday_mask`: bit 0 = Monday .. bit 6 = Sunday.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::transit::flights)]
pub struct Flight {
    pub flight_id: String,
    pub route_id: Option<String>,
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub weekday_mask: i16,
    pub price: f64,
    pub is_virtual: bool,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::transit::datasets)]
pub struct Dataset {
    pub version: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub is_current: bool,
    pub stop_count: i32,
    pub virtual_stop_count: i32,
    pub route_count: i32,
    pub virtual_route_count: i32,
    pub flight_count: i32,
    pub virtual_flight_count: i32,
}

/// Entity counters written back to the dataset row after synthesis.
#[derive(AsChangeset, Debug, Clone, Copy, Default)]
#[diesel(table_name = crate::schema::transit::datasets)]
pub struct DatasetStatistics {
    pub stop_count: i32,
    pub virtual_stop_count: i32,
    pub route_count: i32,
    pub virtual_route_count: i32,
    pub flight_count: i32,
    pub virtual_flight_count: i32,
}

/// One row per published graph version. At most one row is active at a time;
/// flipping `active` is the last step of a successful build.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::transit::graph_metadata)]
pub struct GraphMetadata {
    pub graph_version: String,
    pub dataset_version: String,
    pub node_count: i32,
    pub edge_count: i32,
    pub build_duration_ms: i64,
    pub cache_key: String,
    pub backup_path: Option<String>,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Claim row turning the "can this run?" gate into an atomic insert.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::transit::in_progress_builds)]
pub struct InProgressBuild {
    pub dataset_version: String,
    pub job_name: String,
    pub claimed_unix_time_ms: i64,
}
