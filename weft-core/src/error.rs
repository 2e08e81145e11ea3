//! Error types for weft
//!
//! Provides a unified error type for the core primitives; higher-level
//! crates wrap this with their own operation-specific enums.

use thiserror::Error;

/// Result type alias for weft core operations
pub type Result<T> = std::result::Result<T, WeftError>;

/// Unified error type for weft core primitives
#[derive(Error, Debug)]
pub enum WeftError {
    // ===== Erasure Coding Errors =====
    #[error("Erasure coding error: {0}")]
    ErasureCoding(String),

    #[error("Insufficient shards: have {available}, need {required}")]
    InsufficientShards { available: usize, required: usize },

    #[error("Shard size mismatch: expected {expected}, got {actual}")]
    ShardSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid redundancy: {min_shards} of {total_shards}")]
    InvalidRedundancy { min_shards: usize, total_shards: usize },

    // ===== Cryptography Errors =====
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    // ===== Sector Errors =====
    #[error("Invalid sector size: {size} bytes (expected {expected})")]
    InvalidSectorSize { size: usize, expected: usize },

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Generic Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reed_solomon_erasure::Error> for WeftError {
    fn from(err: reed_solomon_erasure::Error) -> Self {
        WeftError::ErasureCoding(err.to_string())
    }
}
