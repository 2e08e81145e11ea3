//! Weft Slab Engine
//!
//! The renter-side pipeline for dispersing data across hosts:
//! - Erasure-code and encrypt a byte stream into slabs (`upload_slabs`)
//! - Reconstruct arbitrary byte ranges from a slice list (`download_range`)
//! - Move shards off departing hosts (`migrate_slab`, `migrate_slabs`)
//! - Reclaim space host-by-host (`delete_slabs`)
//!
//! Hosts are reached through the `HostSession` capability; the caller
//! supplies ordered host lists and the engine substitutes past failures.

mod dispatch;
pub mod engine;
pub mod session;
pub mod types;

pub use engine::{
    delete_slabs, download_range, migrate_slab, migrate_slabs, upload_slabs, EngineError,
};
pub use session::{HostSession, SessionError};
pub use types::{HostError, HostErrorSet, NotStored, Sector, Slab, Slice};

/// Default redundancy: any 10 of 30 shards recover the data
///
/// Override at runtime via WEFT_MIN_SHARDS / WEFT_TOTAL_SHARDS env vars.
pub const MIN_SHARDS: u8 = 10;
pub const TOTAL_SHARDS: u8 = 30;

/// Read redundancy parameters from the environment, falling back to the
/// compile-time defaults. Returns (min_shards, total_shards).
pub fn redundancy_from_env() -> (u8, u8) {
    let min = std::env::var("WEFT_MIN_SHARDS")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(MIN_SHARDS);
    let total = std::env::var("WEFT_TOTAL_SHARDS")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(TOTAL_SHARDS);
    (min, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redundancy_from_env() {
        std::env::remove_var("WEFT_MIN_SHARDS");
        std::env::remove_var("WEFT_TOTAL_SHARDS");
        assert_eq!(redundancy_from_env(), (MIN_SHARDS, TOTAL_SHARDS));

        std::env::set_var("WEFT_MIN_SHARDS", "4");
        std::env::set_var("WEFT_TOTAL_SHARDS", "12");
        assert_eq!(redundancy_from_env(), (4, 12));
        std::env::remove_var("WEFT_MIN_SHARDS");
        std::env::remove_var("WEFT_TOTAL_SHARDS");
    }
}
