//! Weft Core Library
//!
//! Core primitives for the weft renter engine. This crate provides:
//! - Sector constants and blake3 sector Merkle roots
//! - Reed-Solomon erasure coding with leaf-aligned striping
//! - Per-slab XChaCha20 shard encryption
//! - Common value types (hashes, host keys, signatures, currency)
//! - Unified error handling

pub mod crypto;
pub mod erasure;
pub mod error;
pub mod merkle;
pub mod types;

pub use crypto::SlabKey;
pub use erasure::ErasureCoder;
pub use error::{Result, WeftError};
pub use merkle::sector_root;
pub use types::{Currency, Hash256, HostPublicKey, Signature};

/// Size of a sector stored on a host (4 MiB)
pub const SECTOR_SIZE: usize = 1 << 22;

/// Merkle leaf size, also the plaintext stripe unit (64 bytes)
///
/// Equal to the ChaCha block size, so every leaf-aligned shard region
/// starts on a keystream boundary.
pub const LEAF_SIZE: usize = 64;

/// Number of Merkle leaves in a sector
pub const LEAVES_PER_SECTOR: usize = SECTOR_SIZE / LEAF_SIZE;
