// Copyright: Taiga Transit Project
// Virtual connectivity and graph derivation for sparsely served regions

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

pub mod city_directory;
pub mod enum_to_int;
pub mod geo;
pub mod graph_formats;
pub mod graph_store;
pub mod jobs;
pub mod models;
pub mod postgres_tools;
pub mod schema;
pub mod store;
pub mod virtual_ids;

use std::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

/// Grid tier assigned to synthesized stops.
pub const MAIN_GRID: &str = "MAIN_GRID";

pub fn duration_since_unix_epoch() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap()
}
