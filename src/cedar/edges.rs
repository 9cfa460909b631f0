//! Edge derivation.
//!
//! Edges are built into an insert-only dedup map in three strictly ordered
//! phases: scheduled-trip edges, route-topology edges, same-city transfer
//! edges. The first writer for a dedup key wins; later phases never
//! overwrite, so a scheduled edge always beats a topology default and a
//! transfer edge never displaces either.

use crate::builder::normalized_stop_sequence;
use ahash::{AHashMap, AHashSet};
use taiga::enum_to_int::{TransportMode, int_to_transport_mode};
use taiga::graph_formats::GraphEdge;
use taiga::models::{Flight, Route, Stop};

/// Fallback when a scheduled trip's times cannot be trusted.
pub const DEFAULT_FLIGHT_WEIGHT: f64 = 180.0;

/// Fallback for routes without a precomputed duration.
pub const DEFAULT_ROUTE_WEIGHT: f64 = 60.0;

/// Expected ferry wait during the navigation season (April-September).
pub const SUMMER_FERRY_WAIT: f64 = 17.5;

/// Expected ferry wait outside the navigation season.
pub const WINTER_FERRY_WAIT: f64 = 37.5;

const TRANSFER_KEY: &str = "TRANSFER";
const DIRECT_KEY: &str = "direct";

/// Stop categories used only for transfer weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    FerryTerminal,
    Airport,
    Ground,
}

/// Classification seam: production uses the string heuristic below, tests
/// inject unambiguous types.
pub trait StopClassifier {
    fn classify(&self, stop: &Stop) -> StopKind;
}

// Known fragile to renames; the typed metadata field wins when present.
const FERRY_ID_MARKERS: [&str; 6] = ["ferry", "pier", "parom", "паром", "причал", "пристан"];
const AIRPORT_ID_MARKERS: [&str; 5] = ["airport", "aero", "avia", "аэропорт", "авиа"];

pub struct HeuristicClassifier;

impl StopClassifier for HeuristicClassifier {
    fn classify(&self, stop: &Stop) -> StopKind {
        let id = stop.stop_id.to_lowercase();
        let meta_type = stop
            .metadata
            .as_ref()
            .and_then(|m| m.get("type"))
            .and_then(|v| v.as_str());

        if meta_type == Some("ferry_terminal")
            || FERRY_ID_MARKERS.iter().any(|marker| id.contains(marker))
        {
            return StopKind::FerryTerminal;
        }
        if stop.is_airport == Some(true)
            || AIRPORT_ID_MARKERS.iter().any(|marker| id.contains(marker))
        {
            return StopKind::Airport;
        }
        StopKind::Ground
    }
}

/// Asymmetric same-city transfer weights in minutes.
pub fn transfer_weight(from: StopKind, to: StopKind) -> f64 {
    use StopKind::*;
    match (from, to) {
        (Airport, Ground) => 90.0,
        (Ground, Airport) => 120.0,
        (Airport, FerryTerminal) => 90.0,
        (FerryTerminal, Ground) => 30.0,
        (Ground, FerryTerminal) => 30.0,
        (FerryTerminal, Airport) => 90.0,
        (Ground, Ground) => 60.0,
        _ => 60.0,
    }
}

pub fn parse_hhmm(value: &str) -> Option<i32> {
    let (h, m) = value.split_once(':')?;
    let h: i32 = h.parse().ok()?;
    let m: i32 = m.parse().ok()?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return None;
    }
    Some(h * 60 + m)
}

/// Arrival minus departure in minutes, wrapped across midnight. Unparseable
/// times and results outside (0, 10000) fall back to the 180-minute default.
pub fn flight_edge_weight(departure: &str, arrival: &str) -> f64 {
    let (Some(dep), Some(arr)) = (parse_hhmm(departure), parse_hhmm(arrival)) else {
        return DEFAULT_FLIGHT_WEIGHT;
    };
    let mut minutes = arr - dep;
    if minutes < 0 {
        minutes += 1440;
    }
    let minutes = minutes as f64;
    if minutes <= 0.0 || minutes >= 10000.0 {
        DEFAULT_FLIGHT_WEIGHT
    } else {
        minutes
    }
}

pub fn seasonal_ferry_wait(month: u32) -> f64 {
    if (4..=9).contains(&month) {
        SUMMER_FERRY_WAIT
    } else {
        WINTER_FERRY_WAIT
    }
}

pub fn is_seasonal_ferry(route: &Route) -> bool {
    int_to_transport_mode(route.transport_mode) == TransportMode::Ferry
        && route
            .metadata
            .as_ref()
            .and_then(|m| m.get("seasonal_schedule"))
            .is_some()
}

fn apply_seasonal_ferry(weight: f64, route: Option<&Route>, month: u32) -> f64 {
    match route {
        Some(route) if is_seasonal_ferry(route) => weight + seasonal_ferry_wait(month),
        _ => weight,
    }
}

/// Insert-only edge map keyed by `(from, to, route-or-marker)`.
#[derive(Default)]
pub struct EdgeAccumulator {
    seen: AHashSet<(String, String, String)>,
    edges: Vec<GraphEdge>,
}

impl EdgeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the key was already taken by an earlier phase.
    pub fn insert_if_absent(&mut self, dedup_route: &str, edge: GraphEdge) -> bool {
        let key = (edge.from.clone(), edge.to.clone(), dedup_route.to_string());
        if !self.seen.insert(key) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn into_edges(self) -> Vec<GraphEdge> {
        self.edges
    }
}

/// Run all three phases over the loaded inventory. `month` drives the ferry
/// seasonality and is a parameter so the weighting is testable year-round.
pub fn derive_edges(
    stops: &[Stop],
    routes: &[Route],
    flights: &[Flight],
    classifier: &dyn StopClassifier,
    month: u32,
) -> Vec<GraphEdge> {
    let route_by_id: AHashMap<&str, &Route> = routes
        .iter()
        .map(|route| (route.route_id.as_str(), route))
        .collect();

    let mut acc = EdgeAccumulator::new();

    // phase 1: scheduled trips
    for flight in flights {
        let route = flight
            .route_id
            .as_deref()
            .and_then(|id| route_by_id.get(id).copied());
        let dedup_route = flight.route_id.as_deref().unwrap_or(DIRECT_KEY);
        let weight = apply_seasonal_ferry(
            flight_edge_weight(&flight.departure_time, &flight.arrival_time),
            route,
            month,
        );
        acc.insert_if_absent(
            dedup_route,
            GraphEdge {
                from: flight.from_stop_id.clone(),
                to: flight.to_stop_id.clone(),
                weight_minutes: weight,
                distance_km: route.and_then(|r| r.distance_km),
                transport_mode: route.map(|r| r.transport_mode),
                route_id: flight.route_id.clone(),
            },
        );
    }

    // phase 2: route topology, covers routes with no scheduled trips
    for route in routes {
        let sequence = normalized_stop_sequence(route);
        let weight = apply_seasonal_ferry(
            route
                .duration_minutes
                .map(|d| d as f64)
                .unwrap_or(DEFAULT_ROUTE_WEIGHT),
            Some(route),
            month,
        );
        for pair in sequence.windows(2) {
            acc.insert_if_absent(
                &route.route_id,
                GraphEdge {
                    from: pair[0].clone(),
                    to: pair[1].clone(),
                    weight_minutes: weight,
                    distance_km: route.distance_km,
                    transport_mode: Some(route.transport_mode),
                    route_id: Some(route.route_id.clone()),
                },
            );
        }
    }

    // phase 3: same-city transfers, last so they never displace service edges
    let mut stops_by_city: AHashMap<&str, Vec<&Stop>> = AHashMap::new();
    for stop in stops {
        if let Some(city) = stop.city_id.as_deref() {
            stops_by_city.entry(city).or_default().push(stop);
        }
    }
    for members in stops_by_city.values() {
        if members.len() < 2 {
            continue;
        }
        for a in members {
            for b in members {
                if a.stop_id == b.stop_id {
                    continue;
                }
                let weight = transfer_weight(classifier.classify(a), classifier.classify(b));
                acc.insert_if_absent(
                    TRANSFER_KEY,
                    GraphEdge {
                        from: a.stop_id.clone(),
                        to: b.stop_id.clone(),
                        weight_minutes: weight,
                        distance_km: None,
                        transport_mode: None,
                        route_id: None,
                    },
                );
            }
        }
    }

    acc.into_edges()
}
