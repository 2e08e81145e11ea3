//! Reed-Solomon erasure coding
//!
//! Slab plaintext is striped across the data shards in `LEAF_SIZE` units
//! and extended with parity shards computed over GF(2^8). Any `m` of the
//! `n` total shards recover the plaintext. The stripe unit equals the
//! Merkle leaf size, so a contiguous byte range of the plaintext maps to
//! one aligned region of every shard.

use crate::error::{Result, WeftError};
use crate::LEAF_SIZE;
use reed_solomon_erasure::galois_8::ReedSolomon;

/// Reed-Solomon encoder/decoder for one (m, n) configuration
pub struct ErasureCoder {
    data_shards: usize,
    parity_shards: usize,
    // None when parity_shards == 0; the backing library rejects pure
    // striping configurations.
    inner: Option<ReedSolomon>,
}

impl ErasureCoder {
    /// Create a coder for `data_shards` data and `parity_shards` parity shards
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self> {
        if data_shards == 0 {
            return Err(WeftError::InvalidRedundancy {
                min_shards: data_shards,
                total_shards: data_shards + parity_shards,
            });
        }
        let inner = if parity_shards > 0 {
            Some(ReedSolomon::new(data_shards, parity_shards)?)
        } else {
            None
        };
        Ok(Self {
            data_shards,
            parity_shards,
            inner,
        })
    }

    /// Number of data shards (m)
    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    /// Total number of shards (n)
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Encode a plaintext buffer into `n` shards of `shard_size` bytes
    ///
    /// The buffer is striped across the first `m` shards (zero-padded to
    /// `m * shard_size`); the remaining shards are computed parity.
    /// Deterministic.
    pub fn encode(&self, buf: &[u8], shard_size: usize) -> Result<Vec<Vec<u8>>> {
        debug_assert!(shard_size % LEAF_SIZE == 0);
        if buf.len() > self.data_shards * shard_size {
            return Err(WeftError::ShardSizeMismatch {
                expected: self.data_shards * shard_size,
                actual: buf.len(),
            });
        }

        let mut shards = vec![vec![0u8; shard_size]; self.total_shards()];
        striped_split(buf, &mut shards[..self.data_shards]);
        if let Some(rs) = &self.inner {
            rs.encode(&mut shards)?;
        }
        Ok(shards)
    }

    /// Reconstruct every missing shard in place
    ///
    /// Present shards must all have the same length; missing shards are
    /// `None` and are populated on return.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> Result<()> {
        self.check_present(shards)?;
        if let Some(rs) = &self.inner {
            rs.reconstruct(shards)?;
        }
        Ok(())
    }

    /// Reconstruct only the missing data shards in place
    ///
    /// Cheaper than `reconstruct` when parity shards are not needed again,
    /// which is the ranged-download path.
    pub fn reconstruct_data(&self, shards: &mut [Option<Vec<u8>>]) -> Result<()> {
        self.check_present(shards)?;
        if let Some(rs) = &self.inner {
            rs.reconstruct_data(shards)?;
        }
        Ok(())
    }

    fn check_present(&self, shards: &[Option<Vec<u8>>]) -> Result<()> {
        if shards.len() != self.total_shards() {
            return Err(WeftError::ShardSizeMismatch {
                expected: self.total_shards(),
                actual: shards.len(),
            });
        }
        let available = shards.iter().filter(|s| s.is_some()).count();
        if available < self.data_shards {
            return Err(WeftError::InsufficientShards {
                available,
                required: self.data_shards,
            });
        }
        // Without parity there is nothing to recompute from; every data
        // shard must already be present.
        if self.inner.is_none() && shards.iter().any(|s| s.is_none()) {
            return Err(WeftError::InsufficientShards {
                available,
                required: self.data_shards,
            });
        }
        Ok(())
    }
}

/// Stripe `buf` across `data_shards` in `LEAF_SIZE` units
///
/// Shards must be pre-sized; bytes past the end of `buf` are left zeroed.
fn striped_split(buf: &[u8], data_shards: &mut [Vec<u8>]) {
    let m = data_shards.len();
    for (i, chunk) in buf.chunks(LEAF_SIZE).enumerate() {
        let offset = (i / m) * LEAF_SIZE;
        data_shards[i % m][offset..offset + chunk.len()].copy_from_slice(chunk);
    }
}

/// Inverse of `striped_split`: interleave `data_shards` into `out`,
/// skipping `skip` leading bytes and emitting exactly `write_len` bytes
pub fn striped_join(
    out: &mut Vec<u8>,
    data_shards: &[&[u8]],
    mut skip: usize,
    mut write_len: usize,
) -> Result<()> {
    let mut offset = 0;
    while write_len > 0 {
        for shard in data_shards {
            if offset >= shard.len() {
                return Err(WeftError::Internal(
                    "shards are too small to supply the requested data".to_string(),
                ));
            }
            let chunk = &shard[offset..(offset + LEAF_SIZE).min(shard.len())];
            if skip >= chunk.len() {
                skip -= chunk.len();
                continue;
            }
            let chunk = &chunk[skip..];
            skip = 0;
            let take = write_len.min(chunk.len());
            out.extend_from_slice(&chunk[..take]);
            write_len -= take;
            if write_len == 0 {
                break;
            }
        }
        offset += LEAF_SIZE;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_rejects_zero_data_shards() {
        assert!(matches!(
            ErasureCoder::new(0, 2),
            Err(WeftError::InvalidRedundancy { .. })
        ));
    }

    #[test]
    fn test_striped_split_layout() {
        // Two data shards: leaves alternate between them.
        let buf = pattern(4 * LEAF_SIZE);
        let mut shards = vec![vec![0u8; 2 * LEAF_SIZE]; 2];
        striped_split(&buf, &mut shards);

        assert_eq!(&shards[0][..LEAF_SIZE], &buf[..LEAF_SIZE]);
        assert_eq!(&shards[1][..LEAF_SIZE], &buf[LEAF_SIZE..2 * LEAF_SIZE]);
        assert_eq!(&shards[0][LEAF_SIZE..], &buf[2 * LEAF_SIZE..3 * LEAF_SIZE]);
        assert_eq!(&shards[1][LEAF_SIZE..], &buf[3 * LEAF_SIZE..]);
    }

    #[test]
    fn test_encode_join_roundtrip() {
        let coder = ErasureCoder::new(3, 2).unwrap();
        let buf = pattern(3 * 4 * LEAF_SIZE);
        let shards = coder.encode(&buf, 4 * LEAF_SIZE).unwrap();
        assert_eq!(shards.len(), 5);

        let data: Vec<&[u8]> = shards[..3].iter().map(|s| s.as_slice()).collect();
        let mut out = Vec::new();
        striped_join(&mut out, &data, 0, buf.len()).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn test_join_skip_and_trim() {
        let coder = ErasureCoder::new(2, 1).unwrap();
        let buf = pattern(2 * 4 * LEAF_SIZE);
        let shards = coder.encode(&buf, 4 * LEAF_SIZE).unwrap();

        let data: Vec<&[u8]> = shards[..2].iter().map(|s| s.as_slice()).collect();
        let mut out = Vec::new();
        striped_join(&mut out, &data, 5, 100).unwrap();
        assert_eq!(out, &buf[5..105]);
    }

    #[test]
    fn test_reconstruct_from_any_m() {
        let coder = ErasureCoder::new(2, 2).unwrap();
        let buf = pattern(2 * 4 * LEAF_SIZE);
        let shards = coder.encode(&buf, 4 * LEAF_SIZE).unwrap();

        // Drop both data shards; parity alone must bring them back.
        let mut opts: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        opts[0] = None;
        opts[1] = None;
        coder.reconstruct(&mut opts).unwrap();

        for (opt, shard) in opts.iter().zip(&shards) {
            assert_eq!(opt.as_ref().unwrap(), shard);
        }
    }

    #[test]
    fn test_reconstruct_data_fills_only_data() {
        let coder = ErasureCoder::new(2, 2).unwrap();
        let buf = pattern(2 * 4 * LEAF_SIZE);
        let shards = coder.encode(&buf, 4 * LEAF_SIZE).unwrap();

        let mut opts: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        opts[0] = None;
        opts[3] = None;
        coder.reconstruct_data(&mut opts).unwrap();

        assert_eq!(opts[0].as_ref().unwrap(), &shards[0]);
        assert!(opts[3].is_none());
    }

    #[test]
    fn test_too_few_shards() {
        let coder = ErasureCoder::new(3, 1).unwrap();
        let buf = pattern(3 * LEAF_SIZE);
        let shards = coder.encode(&buf, LEAF_SIZE).unwrap();

        let mut opts: Vec<Option<Vec<u8>>> = shards.into_iter().map(Some).collect();
        opts[0] = None;
        opts[1] = None;
        assert!(matches!(
            coder.reconstruct(&mut opts),
            Err(WeftError::InsufficientShards {
                available: 2,
                required: 3
            })
        ));
    }

    #[test]
    fn test_zero_parity_is_pure_striping() {
        let coder = ErasureCoder::new(2, 0).unwrap();
        let buf = pattern(2 * 2 * LEAF_SIZE);
        let shards = coder.encode(&buf, 2 * LEAF_SIZE).unwrap();
        assert_eq!(shards.len(), 2);

        let mut opts: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        coder.reconstruct(&mut opts).unwrap();

        opts[1] = None;
        assert!(matches!(
            coder.reconstruct(&mut opts),
            Err(WeftError::InsufficientShards { .. })
        ));
    }

    #[test]
    fn test_encode_deterministic() {
        let coder = ErasureCoder::new(4, 2).unwrap();
        let buf = pattern(4 * 4 * LEAF_SIZE);
        let a = coder.encode(&buf, 4 * LEAF_SIZE).unwrap();
        let b = coder.encode(&buf, 4 * LEAF_SIZE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_rejects_oversized_buffer() {
        let coder = ErasureCoder::new(2, 1).unwrap();
        let buf = pattern(2 * LEAF_SIZE + 1);
        assert!(matches!(
            coder.encode(&buf, LEAF_SIZE),
            Err(WeftError::ShardSizeMismatch { .. })
        ));
    }
}
