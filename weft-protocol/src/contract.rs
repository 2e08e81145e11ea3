//! File contract types
//!
//! The renter-side view of an on-chain file contract: the revision object
//! that payments mutate, and the digest a renter signs to authorize a
//! revision. Contract formation and renewal happen elsewhere; this crate
//! only revises.

use serde::{Deserialize, Serialize};
use std::fmt;
use weft_core::{Currency, Hash256};

/// Identifier of a file contract
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileContractId([u8; 32]);

impl FileContractId {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for FileContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileContractId({})", &hex::encode(self.0)[..16])
    }
}

impl fmt::Display for FileContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Destination of a payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A payout entry in a contract's proof output arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiacoinOutput {
    /// Amount paid out
    pub value: Currency,

    /// Destination address
    pub address: Address,
}

/// A signed update to a file contract
///
/// Proof output arrays hold the renter payout at index 0 and the host
/// payout at index 1, in both the valid (proof submitted) and missed
/// (window elapsed) cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContractRevision {
    /// The contract being revised
    pub parent_id: FileContractId,

    /// Monotonically increasing revision counter
    pub revision_number: u64,

    /// Total size of the contract's data
    pub file_size: u64,

    /// Merkle root over the contract's data
    pub file_merkle_root: Hash256,

    /// First block height at which a storage proof is accepted
    pub window_start: u64,

    /// Last block height at which a storage proof is accepted
    pub window_end: u64,

    /// Payouts when the host submits a valid proof
    pub valid_proof_outputs: Vec<SiacoinOutput>,

    /// Payouts when the proof window elapses without a proof
    pub missed_proof_outputs: Vec<SiacoinOutput>,
}

impl FileContractRevision {
    /// The renter's payout if the host proves storage
    pub fn valid_renter_payout(&self) -> Option<Currency> {
        self.valid_proof_outputs.first().map(|o| o.value)
    }

    /// The host's payout if the host proves storage
    pub fn valid_host_payout(&self) -> Option<Currency> {
        self.valid_proof_outputs.get(1).map(|o| o.value)
    }

    /// The renter's payout if the proof window elapses
    pub fn missed_renter_payout(&self) -> Option<Currency> {
        self.missed_proof_outputs.first().map(|o| o.value)
    }

    /// The host's payout if the proof window elapses
    pub fn missed_host_payout(&self) -> Option<Currency> {
        self.missed_proof_outputs.get(1).map(|o| o.value)
    }

    /// The digest a renter signs to authorize this revision
    ///
    /// Covers the revision as the single revised contract (index 0) and
    /// binds the proof window end, after which the signature is useless.
    /// Every field is hashed in declaration order with length-prefixed
    /// arrays, so the digest is canonical.
    pub fn sig_hash(&self) -> Hash256 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"weft/sig/filecontractrevision");
        hasher.update(&0u64.to_le_bytes());
        hasher.update(self.parent_id.as_bytes());
        hasher.update(&self.revision_number.to_le_bytes());
        hasher.update(&self.file_size.to_le_bytes());
        hasher.update(self.file_merkle_root.as_bytes());
        hasher.update(&self.window_start.to_le_bytes());
        hasher.update(&self.window_end.to_le_bytes());
        for outputs in [&self.valid_proof_outputs, &self.missed_proof_outputs] {
            hasher.update(&(outputs.len() as u64).to_le_bytes());
            for output in outputs.iter() {
                hasher.update(&output.value.to_le_bytes());
                hasher.update(output.address.as_bytes());
            }
        }
        hasher.update(&self.window_end.to_le_bytes());
        Hash256::from(hasher.finalize())
    }
}
