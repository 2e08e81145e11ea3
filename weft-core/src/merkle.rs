//! Sector Merkle roots
//!
//! Each sector is addressed by the root of a Merkle tree over its 64-byte
//! leaves. Leaf and interior hashes use distinct blake3 domain prefixes so
//! a leaf can never be presented as a subtree root.

use crate::error::{Result, WeftError};
use crate::types::Hash256;
use crate::{LEAF_SIZE, SECTOR_SIZE};

/// Domain prefix for leaf hashes
const LEAF_PREFIX: &[u8] = &[0x00];

/// Domain prefix for interior node hashes
const NODE_PREFIX: &[u8] = &[0x01];

/// Hash a single 64-byte leaf
fn leaf_hash(leaf: &[u8]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(LEAF_PREFIX);
    hasher.update(leaf);
    hasher.finalize()
}

/// Hash a pair of child nodes
fn node_hash(left: &blake3::Hash, right: &blake3::Hash) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(NODE_PREFIX);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hasher.finalize()
}

/// Compute the Merkle root of a full sector
///
/// The sector must be exactly `SECTOR_SIZE` bytes; hosts store nothing
/// smaller, so there is no partial-sector tree shape.
pub fn sector_root(sector: &[u8]) -> Result<Hash256> {
    if sector.len() != SECTOR_SIZE {
        return Err(WeftError::InvalidSectorSize {
            size: sector.len(),
            expected: SECTOR_SIZE,
        });
    }

    let mut layer: Vec<blake3::Hash> = sector.chunks(LEAF_SIZE).map(leaf_hash).collect();

    // SECTOR_SIZE / LEAF_SIZE is a power of two, so every layer pairs evenly.
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| node_hash(&pair[0], &pair[1]))
            .collect();
    }

    Ok(Hash256::from(layer[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_root_rejects_short_input() {
        let result = sector_root(&[0u8; 64]);
        assert!(matches!(result, Err(WeftError::InvalidSectorSize { .. })));
    }

    #[test]
    fn test_sector_root_deterministic() {
        let sector = vec![0xabu8; SECTOR_SIZE];
        assert_eq!(sector_root(&sector).unwrap(), sector_root(&sector).unwrap());
    }

    #[test]
    fn test_sector_root_detects_bit_flip() {
        let sector = vec![0u8; SECTOR_SIZE];
        let root = sector_root(&sector).unwrap();

        let mut flipped = sector.clone();
        flipped[SECTOR_SIZE - 1] ^= 0x01;
        assert_ne!(root, sector_root(&flipped).unwrap());
    }

    #[test]
    fn test_leaf_and_node_domains_differ() {
        // A 64-byte buffer hashed as a leaf must differ from the same bytes
        // hashed as an interior pair of 32-byte children.
        let bytes = [0x11u8; 64];
        let as_leaf = leaf_hash(&bytes);

        let mut left = [0u8; 32];
        let mut right = [0u8; 32];
        left.copy_from_slice(&bytes[..32]);
        right.copy_from_slice(&bytes[32..]);
        let as_node = node_hash(
            &blake3::Hash::from_bytes(left),
            &blake3::Hash::from_bytes(right),
        );
        assert_ne!(as_leaf, as_node);
    }
}
