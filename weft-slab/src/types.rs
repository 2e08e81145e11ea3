//! Slab value types
//!
//! A slab is the unit of erasure coding: `min_shards * SECTOR_SIZE` bytes
//! of plaintext striped and coded into one sector per host. A slice is a
//! byte window into a slab's plaintext; objects are ordered lists of
//! slices over possibly many slabs.

use crate::session::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use weft_core::erasure::striped_join;
use weft_core::{ErasureCoder, Hash256, HostPublicKey, SlabKey, LEAF_SIZE, SECTOR_SIZE};

/// One erasure-coded shard stored as a full sector on a single host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    /// Public key of the host storing the sector
    pub host: HostPublicKey,

    /// Merkle root of the sector bytes
    pub root: Hash256,
}

/// An erasure-coded unit of data dispersed across hosts
///
/// `shards[i]` holds the placement of shard `i`; the index is the shard's
/// position in the code, not a host identity. Every placed shard lives on
/// a distinct host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slab {
    /// Symmetric key encrypting this slab's shards
    pub key: SlabKey,

    /// Number of data shards required to reconstruct the plaintext
    pub min_shards: u8,

    /// Placement of each shard, ordered by shard index
    pub shards: Vec<Sector>,
}

impl Slab {
    /// Bytes of plaintext a slab of this redundancy stores
    pub fn plaintext_size(&self) -> usize {
        self.min_shards as usize * SECTOR_SIZE
    }

    fn coder(&self, total_shards: usize) -> weft_core::Result<ErasureCoder> {
        let parity = total_shards
            .checked_sub(self.min_shards as usize)
            .ok_or(weft_core::WeftError::InvalidRedundancy {
                min_shards: self.min_shards as usize,
                total_shards,
            })?;
        ErasureCoder::new(self.min_shards as usize, parity)
    }

    /// Erasure-encode a plaintext buffer into `total_shards` sector-sized shards
    pub fn encode(&self, buf: &[u8], total_shards: u8) -> weft_core::Result<Vec<Vec<u8>>> {
        self.coder(total_shards as usize)?.encode(buf, SECTOR_SIZE)
    }

    /// Encrypt freshly encoded shards in place
    pub fn encrypt(&self, shards: &mut [Vec<u8>]) {
        for (i, shard) in shards.iter_mut().enumerate() {
            self.key.xor_keystream(i as u8, 0, shard);
        }
    }

    /// Reconstruct every missing shard in place
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> weft_core::Result<()> {
        self.coder(shards.len())?.reconstruct(shards)
    }

    /// Reconstruct only the missing data shards in place
    pub fn reconstruct_data(&self, shards: &mut [Option<Vec<u8>>]) -> weft_core::Result<()> {
        self.coder(shards.len())?.reconstruct_data(shards)
    }
}

/// A byte window into a slab's plaintext
///
/// `offset + length` never exceeds the slab's plaintext size. An object is
/// an ordered list of slices; consecutive slices may reference distinct
/// slabs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slice {
    /// The slab the window reads from
    pub slab: Slab,

    /// Byte offset within the slab's plaintext
    pub offset: u32,

    /// Length of the window in bytes
    pub length: u32,
}

impl Slice {
    /// The region of each shard that must be fetched to recover this slice
    ///
    /// Plaintext is striped across the data shards in `LEAF_SIZE` units, so
    /// a plaintext window maps to one leaf-aligned region common to every
    /// shard. Returns `(offset, length)` in shard bytes.
    pub fn sector_region(&self) -> (u32, u32) {
        let min_chunk = self.slab.min_shards as u32 * LEAF_SIZE as u32;
        let leaf = LEAF_SIZE as u32;
        let start = (self.offset / min_chunk) * leaf;
        let mut end = ((self.offset + self.length) / min_chunk) * leaf;
        if (self.offset + self.length) % min_chunk != 0 {
            end += leaf;
        }
        (start, end - start)
    }

    /// Decrypt fetched shard regions in place; absent shards are skipped
    ///
    /// The keystream is seeked to the region offset so partial regions
    /// decrypt without fetching the shard prefix.
    pub fn decrypt(&self, shards: &mut [Option<Vec<u8>>]) {
        let (region_offset, _) = self.sector_region();
        for (i, shard) in shards.iter_mut().enumerate() {
            if let Some(shard) = shard {
                self.slab
                    .key
                    .xor_keystream(i as u8, region_offset as u64, shard);
            }
        }
    }

    /// Recover the slice's plaintext from reconstructed data shards
    ///
    /// The first `min_shards` entries must be populated. Returns exactly
    /// `length` bytes.
    pub fn recover(&self, shards: &[Option<Vec<u8>>]) -> weft_core::Result<Vec<u8>> {
        let m = self.slab.min_shards as usize;
        let mut data = Vec::with_capacity(m);
        for shard in shards.iter().take(m) {
            match shard {
                Some(shard) => data.push(shard.as_slice()),
                None => {
                    return Err(weft_core::WeftError::InsufficientShards {
                        available: shards.iter().take(m).filter(|s| s.is_some()).count(),
                        required: m,
                    })
                }
            }
        }

        let skip = self.offset as usize % (m * LEAF_SIZE);
        let mut out = Vec::with_capacity(self.length as usize);
        striped_join(&mut out, &data, skip, self.length as usize)?;
        Ok(out)
    }
}

/// A failed operation against a single host
#[derive(Debug, Error)]
#[error("host {host}: {cause}")]
pub struct HostError {
    /// The host that failed
    pub host: HostPublicKey,

    /// The underlying error, opaque to the engine
    #[source]
    pub cause: SessionError,
}

/// Aggregate of per-host failures
///
/// Returned when an operation ran out of candidate hosts before every task
/// could be retired.
#[derive(Debug, Default)]
pub struct HostErrorSet(pub Vec<HostError>);

impl HostErrorSet {
    /// Record one host failure
    pub fn push(&mut self, err: HostError) {
        self.0.push(err);
    }

    /// Number of recorded failures
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no failures were recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HostErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} host(s) failed:", self.0.len())?;
        for err in &self.0 {
            writeln!(f, "  {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for HostErrorSet {}

/// A download was attempted against a host that stores none of the slab's
/// sectors; the dispatcher substitutes past it
#[derive(Debug, Error)]
#[error("slab is not stored on this host")]
pub struct NotStored;
