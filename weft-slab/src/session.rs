//! Host session capability
//!
//! The engine talks to hosts exclusively through this trait. Implementations
//! own the RPC transport, payment attachment, and Merkle verification; the
//! engine only sees sector-level operations and opaque errors.

use bytes::Bytes;
use weft_core::{Hash256, HostPublicKey};

/// Opaque error produced by a host session
///
/// The engine never inspects these; they are recorded against the host and
/// trigger substitution.
pub type SessionError = Box<dyn std::error::Error + Send + Sync>;

/// An authenticated session with a single host
#[async_trait::async_trait]
pub trait HostSession: Send + Sync {
    /// The host's public key, stable for the session lifetime
    fn public_key(&self) -> HostPublicKey;

    /// Upload one full-size sector, returning its Merkle root
    async fn upload_sector(&self, sector: Bytes) -> Result<Hash256, SessionError>;

    /// Download `length` bytes starting at `offset` within the identified
    /// sector; implementations verify the data against `root`
    async fn download_sector(
        &self,
        root: Hash256,
        offset: u32,
        length: u32,
    ) -> Result<Bytes, SessionError>;

    /// Remove the listed sector roots from the host; an empty list is a no-op
    async fn delete_sectors(&self, roots: Vec<Hash256>) -> Result<(), SessionError>;
}
