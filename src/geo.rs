/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average ground speed assumed for synthesized shuttle connections.
const AVERAGE_SPEED_KMH: f64 = 60.0;

/// Minimum plausible duration for any synthesized leg, in minutes.
pub const MIN_LEG_DURATION_MINUTES: i32 = 60;

pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Great-circle distance between two optional coordinate pairs, rounded to
/// the nearest kilometer. Returns 0 when either endpoint has no coordinates.
pub fn estimate_distance_km(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> f64 {
    match (a, b) {
        (Some((lat1, lon1)), Some((lat2, lon2))) => haversine_km(lat1, lon1, lat2, lon2).round(),
        _ => 0.0,
    }
}

/// Travel-time model for synthesized connections: distance at 60 km/h,
/// floored at one hour.
pub fn estimate_duration_minutes(distance_km: f64) -> i32 {
    let minutes = (distance_km / AVERAGE_SPEED_KMH * 60.0).round() as i32;
    minutes.max(MIN_LEG_DURATION_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Yakutsk and Zhigansk, roughly 610 km apart along the Lena.
    const YAKUTSK: (f64, f64) = (62.0355, 129.6755);
    const ZHIGANSK: (f64, f64) = (66.7697, 123.3711);

    #[test]
    fn haversine_sane_range() {
        let d = haversine_km(YAKUTSK.0, YAKUTSK.1, ZHIGANSK.0, ZHIGANSK.1);
        assert!(d > 500.0 && d < 700.0, "got {}", d);
    }

    #[test]
    fn distance_zero_without_coords() {
        assert_eq!(estimate_distance_km(None, Some(YAKUTSK)), 0.0);
        assert_eq!(estimate_distance_km(Some(YAKUTSK), None), 0.0);
    }

    #[test]
    fn distance_rounds_to_km() {
        let d = estimate_distance_km(Some(YAKUTSK), Some(ZHIGANSK));
        assert_eq!(d, d.round());
        assert!(d > 0.0);
    }

    #[test]
    fn duration_floor_is_one_hour() {
        assert_eq!(estimate_duration_minutes(0.0), 60);
        assert_eq!(estimate_duration_minutes(12.0), 60);
        // exactly at the floor boundary
        assert_eq!(estimate_duration_minutes(60.0), 60);
        assert_eq!(estimate_duration_minutes(90.0), 90);
    }
}
