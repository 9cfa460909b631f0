use serde_derive::Deserialize;
use serde_derive::Serialize;

/// Transport modes carried by route records. Stored as `Int2` in postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    Bus,
    Rail,
    Ferry,
    Air,
    /// Synthesized connections between virtual stops are always shuttles.
    Shuttle,
    Other(i16),
}

pub fn transport_mode_to_int(input: &TransportMode) -> i16 {
    match input {
        TransportMode::Bus => 0,
        TransportMode::Rail => 1,
        TransportMode::Ferry => 2,
        TransportMode::Air => 3,
        TransportMode::Shuttle => 4,
        TransportMode::Other(i) => *i,
    }
}

pub fn int_to_transport_mode(input: i16) -> TransportMode {
    match input {
        0 => TransportMode::Bus,
        1 => TransportMode::Rail,
        2 => TransportMode::Ferry,
        3 => TransportMode::Air,
        4 => TransportMode::Shuttle,
        i => TransportMode::Other(i),
    }
}
