//! Virtual entity synthesis.
//!
//! The planning core is pure: given the city directory and the real-stop
//! inventory it produces every virtual stop, route and flight to persist.
//! The async wrapper handles the run gate, the claim row and persistence.

use ahash::AHashSet;
use anyhow::Result;
use log::{info, warn};
use serde_json::json;
use taiga::MAIN_GRID;
use taiga::city_directory::{CityDirectory, CityEntry};
use taiga::enum_to_int::{TransportMode, transport_mode_to_int};
use taiga::geo;
use taiga::jobs::{DataProcessed, GRAPH_BUILD_JOB, JobResult, SYNTHESIZER_JOB};
use taiga::models::{Flight, Route, Stop};
use taiga::store;
use taiga::virtual_ids::{
    normalize_city_name, virtual_flight_id, virtual_route_id, virtual_stop_id,
};

/// Two departures per day, 08:00 and 16:00 local, minutes since midnight.
const DEPARTURE_SLOTS: [u32; 2] = [480, 960];

/// Fallback ticket price when a route carries no base fare.
const DEFAULT_BASE_FARE: f64 = 1000.0;

/// Bit 0 = Monday .. bit 6 = Sunday. Virtual trips run every day.
const ALL_WEEKDAYS_MASK: i16 = 0b0111_1111;

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub hub_city: String,
    pub horizon_days: u32,
    /// Hard ceiling on route records the no-hub mesh fallback may emit.
    pub mesh_route_cap: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            hub_city: "Якутск".to_string(),
            horizon_days: 365,
            mesh_route_cap: 20_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(
        "no hub stop resolved; a full mesh over {stops} virtual stops would emit {routes} routes (cap {cap})"
    )]
    MeshTooLarge {
        stops: usize,
        routes: usize,
        cap: usize,
    },
}

#[derive(Debug, Default)]
pub struct SynthesisPlan {
    pub virtual_stops: Vec<Stop>,
    pub virtual_routes: Vec<Route>,
    pub virtual_flights: Vec<Flight>,
    pub hub_stop_id: Option<String>,
}

/// Cities present in the directory but not covered by any real stop.
/// Coverage is judged on the normalized city id of real stops.
pub fn missing_cities<'a>(
    directory: &'a CityDirectory,
    real_stops: &[Stop],
) -> Vec<&'a CityEntry> {
    let covered: AHashSet<String> = real_stops
        .iter()
        .filter_map(|stop| stop.city_id.as_deref())
        .map(normalize_city_name)
        .collect();

    directory
        .entries()
        .iter()
        .filter(|entry| !covered.contains(&normalize_city_name(&entry.city)))
        .collect()
}

pub fn make_virtual_stop(city: &CityEntry) -> Stop {
    Stop {
        stop_id: virtual_stop_id(&city.city),
        name: format!("г. {}", city.city),
        lat: Some(city.lat),
        lon: Some(city.lon),
        // deliberately NULL: downstream re-derives "virtual" as "no city id"
        city_id: None,
        is_airport: Some(false),
        is_railway_station: Some(false),
        metadata: Some(json!({ "city": city.city })),
        grid_type: MAIN_GRID.to_string(),
        is_virtual: true,
    }
}

/// Hub resolution order: real stops first, then the freshly synthesized
/// virtual stops (the hub city itself may have been missing).
pub fn resolve_hub(hub_city: &str, real_stops: &[Stop], virtual_stops: &[Stop]) -> Option<Stop> {
    let needle = normalize_city_name(hub_city);

    let real = real_stops.iter().find(|stop| {
        stop.city_id
            .as_deref()
            .map(normalize_city_name)
            .is_some_and(|c| c == needle)
            || normalize_city_name(&stop.name) == needle
    });
    if let Some(stop) = real {
        return Some(stop.clone());
    }

    let hub_id = virtual_stop_id(hub_city);
    virtual_stops
        .iter()
        .find(|stop| stop.stop_id == hub_id)
        .cloned()
}

fn make_virtual_route(from: &Stop, to: &Stop) -> Route {
    let distance = geo::estimate_distance_km(
        from.lat.zip(from.lon),
        to.lat.zip(to.lon),
    );
    let duration = geo::estimate_duration_minutes(distance);

    Route {
        route_id: virtual_route_id(&from.stop_id, &to.stop_id),
        from_stop_id: from.stop_id.clone(),
        to_stop_id: to.stop_id.clone(),
        stop_sequence: None,
        transport_mode: transport_mode_to_int(&TransportMode::Shuttle),
        distance_km: Some(distance),
        duration_minutes: Some(duration),
        metadata: None,
        is_virtual: true,
    }
}

fn hub_star_routes(hub: &Stop, virtual_stops: &[Stop]) -> Vec<Route> {
    let mut out = Vec::with_capacity(virtual_stops.len() * 2);
    for stop in virtual_stops {
        if stop.stop_id == hub.stop_id {
            continue;
        }
        out.push(make_virtual_route(stop, hub));
        out.push(make_virtual_route(hub, stop));
    }
    out
}

fn mesh_routes(virtual_stops: &[Stop]) -> Vec<Route> {
    let mut out = Vec::new();
    for (i, a) in virtual_stops.iter().enumerate() {
        for b in &virtual_stops[i + 1..] {
            out.push(make_virtual_route(a, b));
            out.push(make_virtual_route(b, a));
        }
    }
    out
}

fn route_base_fare(route: &Route) -> f64 {
    route
        .metadata
        .as_ref()
        .and_then(|m| m.get("base_fare"))
        .and_then(|v| v.as_f64())
        .unwrap_or(DEFAULT_BASE_FARE)
}

fn format_hhmm(minutes_of_day: u32) -> String {
    format!("{:02}:{:02}", minutes_of_day / 60, minutes_of_day % 60)
}

/// Two trips per day for the whole rolling horizon, every weekday active,
/// arrival wrapped across midnight.
pub fn plan_flights(route: &Route, horizon_days: u32) -> Vec<Flight> {
    let duration = route
        .duration_minutes
        .unwrap_or(geo::MIN_LEG_DURATION_MINUTES) as u32;
    let price = route_base_fare(route);

    let mut out = Vec::with_capacity(horizon_days as usize * DEPARTURE_SLOTS.len());
    for day_offset in 0..horizon_days {
        for (slot_index, departure) in DEPARTURE_SLOTS.iter().enumerate() {
            let arrival = (departure + duration) % 1440;
            out.push(Flight {
                flight_id: virtual_flight_id(&route.route_id, day_offset, slot_index as u32),
                route_id: Some(route.route_id.clone()),
                from_stop_id: route.from_stop_id.clone(),
                to_stop_id: route.to_stop_id.clone(),
                departure_time: format_hhmm(*departure),
                arrival_time: format_hhmm(arrival),
                weekday_mask: ALL_WEEKDAYS_MASK,
                price,
                is_virtual: true,
            });
        }
    }
    out
}

/// The full pure plan: stops for missing cities, hub-star or capped-mesh
/// routes, and the flight horizon for every route.
pub fn plan_synthesis(
    directory: &CityDirectory,
    real_stops: &[Stop],
    config: &SynthesisConfig,
) -> Result<SynthesisPlan, SynthesisError> {
    let missing = missing_cities(directory, real_stops);
    let virtual_stops: Vec<Stop> = missing.iter().map(|city| make_virtual_stop(city)).collect();

    if virtual_stops.is_empty() {
        return Ok(SynthesisPlan::default());
    }

    let hub = resolve_hub(&config.hub_city, real_stops, &virtual_stops);
    let virtual_routes = match &hub {
        Some(hub) => hub_star_routes(hub, &virtual_stops),
        None => {
            let n = virtual_stops.len();
            let route_count = n * n.saturating_sub(1);
            if route_count > config.mesh_route_cap {
                return Err(SynthesisError::MeshTooLarge {
                    stops: n,
                    routes: route_count,
                    cap: config.mesh_route_cap,
                });
            }
            mesh_routes(&virtual_stops)
        }
    };

    let virtual_flights: Vec<Flight> = virtual_routes
        .iter()
        .flat_map(|route| plan_flights(route, config.horizon_days))
        .collect();

    Ok(SynthesisPlan {
        virtual_stops,
        virtual_routes,
        virtual_flights,
        hub_stop_id: hub.map(|h| h.stop_id),
    })
}

/// Gate, claim, plan, persist, recount. Precondition misses are clean skips.
pub async fn run_synthesis(
    conn: &mut diesel_async::AsyncPgConnection,
    directory: &CityDirectory,
    config: &SynthesisConfig,
) -> Result<JobResult> {
    let start = std::time::Instant::now();

    let Some(dataset) = store::get_latest_dataset(conn).await? else {
        return Ok(JobResult::skipped(
            "no current dataset; nothing to synthesize",
            start.elapsed().as_millis() as u64,
        ));
    };

    let existing = store::count_virtual_stops(conn).await?;
    if existing > 0 {
        return Ok(JobResult::skipped(
            format!(
                "{} virtual stops already exist for dataset {}; synthesis is all-or-nothing",
                existing, dataset.version
            ),
            start.elapsed().as_millis() as u64,
        ));
    }

    if !store::try_claim_build(conn, &dataset.version, SYNTHESIZER_JOB).await? {
        return Ok(JobResult::skipped(
            format!("another worker holds the claim for dataset {}", dataset.version),
            start.elapsed().as_millis() as u64,
        ));
    }

    let outcome = synthesize_into_store(conn, &dataset.version, directory, config).await;

    if let Err(e) = store::release_build_claim(conn, &dataset.version, SYNTHESIZER_JOB).await {
        warn!("failed to release synthesis claim: {}", e);
    }

    let added = outcome?;
    let elapsed = start.elapsed().as_millis() as u64;
    info!(
        "synthesis for dataset {} finished in {} ms ({} records)",
        dataset.version, elapsed, added
    );

    Ok(JobResult::completed(
        format!("synthesized {} virtual records for dataset {}", added, dataset.version),
        elapsed,
        DataProcessed {
            added,
            ..Default::default()
        },
        Some(GRAPH_BUILD_JOB),
    ))
}

async fn synthesize_into_store(
    conn: &mut diesel_async::AsyncPgConnection,
    dataset_version: &str,
    directory: &CityDirectory,
    config: &SynthesisConfig,
) -> Result<u64> {
    info!("step 1: loading real stop inventory");
    let real_stops = store::get_all_real_stops(conn).await?;

    info!(
        "step 2: planning virtual entities ({} directory cities, {} real stops)",
        directory.len(),
        real_stops.len()
    );
    let plan = plan_synthesis(directory, &real_stops, config)?;
    match &plan.hub_stop_id {
        Some(hub) => info!("hub stop resolved: {}", hub),
        None if !plan.virtual_stops.is_empty() => {
            warn!("no hub stop resolved, fell back to full mesh")
        }
        None => {}
    }

    info!(
        "step 3: persisting {} stops, {} routes, {} flights",
        plan.virtual_stops.len(),
        plan.virtual_routes.len(),
        plan.virtual_flights.len()
    );
    let stops_added = store::save_virtual_stops_batch(conn, &plan.virtual_stops).await?;
    let routes_added = store::save_virtual_routes_batch(conn, &plan.virtual_routes).await?;
    let flights_added = store::save_flights_batch(conn, &plan.virtual_flights).await?;

    info!("step 4: updating dataset statistics");
    let statistics = store::recompute_statistics(conn).await?;
    store::update_statistics(conn, dataset_version, statistics).await?;

    Ok((stops_added + routes_added + flights_added) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taiga::city_directory::CityDirectory;

    fn directory_abc() -> CityDirectory {
        CityDirectory::from_entries(vec![
            CityEntry {
                city: "Алдан".to_string(),
                lat: 58.6,
                lon: 125.4,
            },
            CityEntry {
                city: "Батагай".to_string(),
                lat: 67.66,
                lon: 134.63,
            },
            CityEntry {
                city: "Чокурдах".to_string(),
                lat: 70.62,
                lon: 147.9,
            },
        ])
    }

    fn real_stop(id: &str, city: &str, lat: f64, lon: f64) -> Stop {
        Stop {
            stop_id: id.to_string(),
            name: format!("Автовокзал {}", city),
            lat: Some(lat),
            lon: Some(lon),
            city_id: Some(city.to_string()),
            is_airport: Some(false),
            is_railway_station: Some(false),
            metadata: None,
            grid_type: MAIN_GRID.to_string(),
            is_virtual: false,
        }
    }

    fn config_with_hub(hub: &str) -> SynthesisConfig {
        SynthesisConfig {
            hub_city: hub.to_string(),
            ..SynthesisConfig::default()
        }
    }

    #[test]
    fn hub_star_yields_two_stops_four_routes_2920_flights() {
        // directory {A, B, C}, real stop only in A, hub city = A
        let real = vec![real_stop("real-1", "Алдан", 58.6, 125.4)];
        let plan =
            plan_synthesis(&directory_abc(), &real, &config_with_hub("Алдан")).unwrap();

        assert_eq!(plan.virtual_stops.len(), 2);
        assert_eq!(plan.virtual_routes.len(), 4);
        assert_eq!(plan.virtual_flights.len(), 4 * 365 * 2);
        assert_eq!(plan.hub_stop_id.as_deref(), Some("real-1"));
    }

    #[test]
    fn every_missing_city_gets_exactly_one_stop() {
        let plan =
            plan_synthesis(&directory_abc(), &[], &config_with_hub("Алдан")).unwrap();
        assert_eq!(plan.virtual_stops.len(), 3);

        for city in ["Алдан", "Батагай", "Чокурдах"] {
            let matching: Vec<_> = plan
                .virtual_stops
                .iter()
                .filter(|s| s.stop_id == virtual_stop_id(city))
                .collect();
            assert_eq!(matching.len(), 1, "city {}", city);
            assert_eq!(matching[0].name, format!("г. {}", city));
            assert_eq!(matching[0].grid_type, MAIN_GRID);
            assert!(matching[0].city_id.is_none());
        }
    }

    #[test]
    fn hub_may_be_a_virtual_stop_itself() {
        // hub city has no real stop, so its own virtual stop becomes the hub
        let plan =
            plan_synthesis(&directory_abc(), &[], &config_with_hub("Батагай")).unwrap();
        assert_eq!(plan.hub_stop_id.as_deref(), Some(virtual_stop_id("Батагай").as_str()));
        // hub-star over 3 virtual stops, hub excluded from its own spokes
        assert_eq!(plan.virtual_routes.len(), 4);
    }

    #[test]
    fn no_hub_falls_back_to_full_mesh() {
        let plan =
            plan_synthesis(&directory_abc(), &[], &config_with_hub("Мирный")).unwrap();
        assert!(plan.hub_stop_id.is_none());
        // 2 * C(3,2) = 6
        assert_eq!(plan.virtual_routes.len(), 6);
    }

    #[test]
    fn mesh_cap_fails_the_run() {
        let mut config = config_with_hub("Мирный");
        config.mesh_route_cap = 4;
        let err = plan_synthesis(&directory_abc(), &[], &config).unwrap_err();
        match err {
            SynthesisError::MeshTooLarge { stops, routes, cap } => {
                assert_eq!(stops, 3);
                assert_eq!(routes, 6);
                assert_eq!(cap, 4);
            }
        }
    }

    #[test]
    fn covered_cities_are_not_synthesized() {
        let real = vec![
            real_stop("real-1", "Алдан", 58.6, 125.4),
            real_stop("real-2", "Батагай", 67.66, 134.63),
        ];
        let plan =
            plan_synthesis(&directory_abc(), &real, &config_with_hub("Алдан")).unwrap();
        assert_eq!(plan.virtual_stops.len(), 1);
        assert_eq!(plan.virtual_stops[0].stop_id, virtual_stop_id("Чокурдах"));
    }

    #[test]
    fn flights_carry_slots_and_wrapped_arrivals() {
        let from = make_virtual_stop(&CityEntry {
            city: "Батагай".to_string(),
            lat: 67.66,
            lon: 134.63,
        });
        let to = make_virtual_stop(&CityEntry {
            city: "Чокурдах".to_string(),
            lat: 70.62,
            lon: 147.9,
        });
        let route = make_virtual_route(&from, &to);
        let duration = route.duration_minutes.unwrap() as u32;

        let flights = plan_flights(&route, 2);
        assert_eq!(flights.len(), 4);
        assert_eq!(flights[0].departure_time, "08:00");
        assert_eq!(flights[1].departure_time, "16:00");
        assert_eq!(flights[0].weekday_mask, ALL_WEEKDAYS_MASK);
        assert_eq!(flights[0].price, DEFAULT_BASE_FARE);

        let arr = flights[1].arrival_time.clone();
        let expected = (960 + duration) % 1440;
        assert_eq!(arr, format!("{:02}:{:02}", expected / 60, expected % 60));
    }

    #[test]
    fn flight_ids_are_stable_across_regeneration() {
        let real = vec![real_stop("real-1", "Алдан", 58.6, 125.4)];
        let a = plan_synthesis(&directory_abc(), &real, &config_with_hub("Алдан")).unwrap();
        let b = plan_synthesis(&directory_abc(), &real, &config_with_hub("Алдан")).unwrap();

        let ids_a: Vec<&str> = a.virtual_flights.iter().map(|f| f.flight_id.as_str()).collect();
        let ids_b: Vec<&str> = b.virtual_flights.iter().map(|f| f.flight_id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn route_duration_respects_floor() {
        // two cities ~60 km apart => raw estimate is right at the floor
        let a = make_virtual_stop(&CityEntry {
            city: "Ближний".to_string(),
            lat: 62.0,
            lon: 129.7,
        });
        let b = make_virtual_stop(&CityEntry {
            city: "Дальний".to_string(),
            lat: 62.05,
            lon: 129.8,
        });
        let route = make_virtual_route(&a, &b);
        assert!(route.duration_minutes.unwrap() >= 60);
    }
}
