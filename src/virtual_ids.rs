//! Deterministic identifiers for synthesized entities.
//!
//! All ids are pure functions of their inputs so regeneration is idempotent
//! and the synthesizer can be tested without a database. Hashing uses
//! seahash, which is stable across platforms and releases.

/// Canonical form of a city name used for coverage comparison and hashing:
/// lowercase, everything outside `[a-z0-9а-я]` stripped.
pub fn normalize_city_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | 'а'..='я'))
        .collect()
}

pub fn virtual_stop_id(city_name: &str) -> String {
    let normalized = normalize_city_name(city_name);
    format!("virt-stop-{:016x}", seahash::hash(normalized.as_bytes()))
}

pub fn virtual_route_id(from_stop_id: &str, to_stop_id: &str) -> String {
    let key = format!("{}|{}", from_stop_id, to_stop_id);
    format!("virt-route-{:016x}", seahash::hash(key.as_bytes()))
}

/// Trip ids are keyed by (route, day offset, slot index) so every run of the
/// synthesizer emits the same ids for the same horizon.
pub fn virtual_flight_id(route_id: &str, day_offset: u32, slot_index: u32) -> String {
    format!("{}-d{:03}-s{}", route_id, day_offset, slot_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_city_name("Усть-Мая"), "устьмая");
        assert_eq!(normalize_city_name("г. Якутск"), "гякутск");
        assert_eq!(normalize_city_name("Tiksi 2"), "tiksi2");
        // 'ё' is outside а-я and gets stripped, as does the diacritic form
        assert_eq!(normalize_city_name("Алёховщина"), "алховщина");
    }

    #[test]
    fn stop_ids_are_deterministic_and_case_insensitive() {
        assert_eq!(virtual_stop_id("Якутск"), virtual_stop_id("ЯКУТСК"));
        assert_eq!(virtual_stop_id("Усть-Мая"), virtual_stop_id("усть мая"));
        assert_ne!(virtual_stop_id("Якутск"), virtual_stop_id("Тикси"));
        assert!(virtual_stop_id("Тикси").starts_with("virt-stop-"));
    }

    #[test]
    fn route_ids_are_directional() {
        let ab = virtual_route_id("virt-stop-aa", "virt-stop-bb");
        let ba = virtual_route_id("virt-stop-bb", "virt-stop-aa");
        assert_ne!(ab, ba);
        assert_eq!(ab, virtual_route_id("virt-stop-aa", "virt-stop-bb"));
    }

    #[test]
    fn flight_ids_embed_day_and_slot() {
        let id = virtual_flight_id("virt-route-0123", 7, 1);
        assert_eq!(id, "virt-route-0123-d007-s1");
        assert_ne!(id, virtual_flight_id("virt-route-0123", 7, 0));
    }
}
