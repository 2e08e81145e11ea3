//! Slab engine
//!
//! The four renter-facing operations: upload a byte stream as slabs,
//! download an arbitrary byte range from a slice list, migrate shards off
//! departing hosts, and delete a slab set host-by-host. All fan-out goes
//! through the substituting dispatcher; per-host failures are aggregated,
//! never surfaced one at a time.

use crate::dispatch::dispatch;
use crate::session::{HostSession, SessionError};
use crate::types::{HostError, HostErrorSet, NotStored, Sector, Slab, Slice};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use weft_core::{Hash256, HostPublicKey, SlabKey, WeftError, SECTOR_SIZE};

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the slab engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid redundancy: {min_shards} of {total_shards}")]
    InvalidRedundancy { min_shards: u8, total_shards: u8 },

    #[error("Not enough hosts: have {available}, need {required}")]
    InsufficientHosts { available: usize, required: usize },

    #[error("Requested range is out of bounds: offset {offset} + length {length} > {size}")]
    RangeOutOfBounds { offset: u64, length: u64, size: u64 },

    #[error(transparent)]
    Core(#[from] WeftError),

    #[error(transparent)]
    Hosts(#[from] HostErrorSet),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read until `buf` is full or the reader reaches EOF; returns bytes read
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Collect dispatch results, treating any unretired task as failure
fn complete<R>(
    results: Vec<Option<R>>,
    errors: HostErrorSet,
) -> std::result::Result<Vec<R>, HostErrorSet> {
    let mut out = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Some(value) => out.push(value),
            None => return Err(errors),
        }
    }
    Ok(out)
}

/// Upload the shards of one slab in parallel, one sector per host
async fn parallel_upload_slab(
    shards: &[Bytes],
    hosts: &[Arc<dyn HostSession>],
) -> Result<Vec<Sector>> {
    if hosts.len() < shards.len() {
        return Err(EngineError::InsufficientHosts {
            available: hosts.len(),
            required: shards.len(),
        });
    }

    let tasks: Vec<usize> = (0..shards.len()).collect();
    let (results, errors) = dispatch(&tasks, hosts, |host, shard_index| {
        let host = host.clone();
        let data = shards[shard_index].clone();
        async move {
            let root = host.upload_sector(data).await?;
            Ok(Sector {
                host: host.public_key(),
                root,
            })
        }
    })
    .await;

    Ok(complete(results, errors)?)
}

/// Upload slabs read from `reader` until EOF
///
/// Each slab covers `min_shards * SECTOR_SIZE` bytes of the stream; a final
/// short read is zero-padded into one last slab. The upload is
/// all-or-nothing: the first slab that cannot be placed aborts the whole
/// call with the aggregate host errors.
#[instrument(skip(reader, hosts), fields(hosts = hosts.len()))]
pub async fn upload_slabs<R>(
    reader: &mut R,
    min_shards: u8,
    total_shards: u8,
    hosts: &[Arc<dyn HostSession>],
) -> Result<Vec<Slab>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if min_shards == 0 || min_shards > total_shards {
        return Err(EngineError::InvalidRedundancy {
            min_shards,
            total_shards,
        });
    }

    let mut slabs = Vec::new();
    let mut buf = vec![0u8; min_shards as usize * SECTOR_SIZE];
    loop {
        let read = read_full(reader, &mut buf).await?;
        if read == 0 {
            break;
        }
        buf[read..].fill(0);

        let mut slab = Slab {
            key: SlabKey::generate(),
            min_shards,
            shards: Vec::new(),
        };
        let mut shards = slab.encode(&buf, total_shards)?;
        slab.encrypt(&mut shards);
        let shards: Vec<Bytes> = shards.into_iter().map(Bytes::from).collect();

        slab.shards = parallel_upload_slab(&shards, hosts).await?;
        debug!(slab = slabs.len(), bytes = read, "uploaded slab");
        slabs.push(slab);

        if read < buf.len() {
            break;
        }
    }

    info!(slabs = slabs.len(), "upload complete");
    Ok(slabs)
}

/// Download the sector regions covering `slice` from `min_shards` hosts
///
/// Only hosts storing one of the slab's sectors are eligible; each maps to
/// the shard index of the sector it stores. Other candidates fail with
/// `NotStored` and are substituted past.
async fn parallel_download_slab(
    slice: &Slice,
    hosts: &[Arc<dyn HostSession>],
) -> Result<Vec<Option<Vec<u8>>>> {
    let m = slice.slab.min_shards as usize;
    if hosts.len() < m {
        return Err(EngineError::InsufficientHosts {
            available: hosts.len(),
            required: m,
        });
    }

    let (region_offset, region_length) = slice.sector_region();
    let tasks: Vec<usize> = (0..m).collect();
    let (results, errors) = dispatch(&tasks, hosts, |host, _slot| {
        let host = host.clone();
        let stored = slice
            .slab
            .shards
            .iter()
            .position(|sector| sector.host == host.public_key())
            .map(|i| (i, slice.slab.shards[i].root));
        async move {
            let Some((shard_index, root)) = stored else {
                return Err(Box::new(NotStored) as SessionError);
            };
            let data = host
                .download_sector(root, region_offset, region_length)
                .await?;
            if data.len() != region_length as usize {
                return Err(format!(
                    "host returned {} bytes, expected {}",
                    data.len(),
                    region_length
                )
                .into());
            }
            Ok((shard_index, data.to_vec()))
        }
    })
    .await;

    let fetched = complete(results, errors)?;
    let mut shards: Vec<Option<Vec<u8>>> = vec![None; slice.slab.shards.len()];
    for (shard_index, data) in fetched {
        shards[shard_index] = Some(data);
    }
    Ok(shards)
}

/// Trim a slice list to the covering window for `[offset, offset+length)`
///
/// The first retained slice is advanced to start at the requested byte;
/// the last is truncated to end at the final byte.
fn slices_for_range(slices: &[Slice], offset: u64, length: u64) -> Vec<Slice> {
    let mut slices = slices.to_vec();

    let mut first_offset = offset;
    for i in 0..slices.len() {
        if first_offset <= slices[i].length as u64 {
            slices.drain(..i);
            break;
        }
        first_offset -= slices[i].length as u64;
    }
    slices[0].offset += first_offset as u32;
    slices[0].length -= first_offset as u32;

    let mut last_length = length;
    for i in 0..slices.len() {
        if last_length <= slices[i].length as u64 {
            slices.truncate(i + 1);
            break;
        }
        last_length -= slices[i].length as u64;
    }
    let last = slices.len() - 1;
    slices[last].length = last_length as u32;

    slices
}

/// Download the byte range `[offset, offset+length)` of the object
/// described by `slices`, writing the plaintext to `writer`
#[instrument(skip(writer, slices, hosts), fields(slices = slices.len()))]
pub async fn download_range<W>(
    writer: &mut W,
    slices: &[Slice],
    offset: u64,
    length: u64,
    hosts: &[Arc<dyn HostSession>],
) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let size: u64 = slices.iter().map(|s| s.length as u64).sum();
    if offset.checked_add(length).map_or(true, |end| end > size) {
        return Err(EngineError::RangeOutOfBounds {
            offset,
            length,
            size,
        });
    }
    if length == 0 {
        return Ok(());
    }

    for slice in slices_for_range(slices, offset, length) {
        let mut shards = parallel_download_slab(&slice, hosts).await?;
        slice.decrypt(&mut shards);
        slice.slab.reconstruct_data(&mut shards)?;
        let recovered = slice.recover(&shards)?;
        writer.write_all(&recovered).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Move a slab's shards onto hosts in `to`, downloading from `from`
///
/// Only shards whose current host is absent from `to` move. Destination
/// candidates exclude hosts already holding a kept shard, so placements
/// stay distinct. Each successful placement is committed to `slab` even
/// when others fail; the aggregate failure is then returned.
#[instrument(skip(slab, from, to), fields(shards = slab.shards.len()))]
pub async fn migrate_slab(
    slab: &mut Slab,
    from: &[Arc<dyn HostSession>],
    to: &[Arc<dyn HostSession>],
) -> Result<()> {
    let to_keys: Vec<HostPublicKey> = to.iter().map(|h| h.public_key()).collect();
    let moving: Vec<usize> = slab
        .shards
        .iter()
        .enumerate()
        .filter(|(_, sector)| !to_keys.contains(&sector.host))
        .map(|(i, _)| i)
        .collect();
    if moving.is_empty() {
        debug!("all shards already on destination hosts");
        return Ok(());
    }
    if moving.len() > to.len() {
        return Err(EngineError::InsufficientHosts {
            available: to.len(),
            required: moving.len(),
        });
    }

    // Download and reconstruct the whole slab, then re-encrypt. The
    // keystream is deterministic in (key, shard index), so recovered
    // shards match their original ciphertext byte for byte.
    let slice = Slice {
        offset: 0,
        length: slab.plaintext_size() as u32,
        slab: slab.clone(),
    };
    let mut shards = parallel_download_slab(&slice, from).await?;
    slice.decrypt(&mut shards);
    slab.reconstruct(&mut shards)?;

    let mut plaintext = Vec::with_capacity(shards.len());
    for shard in shards {
        plaintext.push(shard.ok_or_else(|| {
            WeftError::Internal("reconstruction left a shard unpopulated".to_string())
        })?);
    }
    slab.encrypt(&mut plaintext);
    let shards: Vec<Bytes> = plaintext.into_iter().map(Bytes::from).collect();

    let kept: Vec<HostPublicKey> = slab
        .shards
        .iter()
        .enumerate()
        .filter(|(i, _)| !moving.contains(i))
        .map(|(_, sector)| sector.host)
        .collect();
    let candidates: Vec<Arc<dyn HostSession>> = to
        .iter()
        .filter(|h| !kept.contains(&h.public_key()))
        .cloned()
        .collect();
    if candidates.len() < moving.len() {
        return Err(EngineError::InsufficientHosts {
            available: candidates.len(),
            required: moving.len(),
        });
    }

    let (results, errors) = dispatch(&moving, &candidates, |host, shard_index| {
        let host = host.clone();
        let data = shards[shard_index].clone();
        async move {
            let root = host.upload_sector(data).await?;
            Ok(Sector {
                host: host.public_key(),
                root,
            })
        }
    })
    .await;

    let mut failed = 0;
    for (slot, result) in results.into_iter().enumerate() {
        match result {
            Some(sector) => slab.shards[moving[slot]] = sector,
            None => failed += 1,
        }
    }
    if failed > 0 {
        warn!(failed, "shards left on their original hosts");
        return Err(errors.into());
    }

    info!(moved = moving.len(), "migrated slab");
    Ok(())
}

/// Migrate a batch of slabs in order, stopping at the first failure
pub async fn migrate_slabs(
    slabs: &mut [Slab],
    from: &[Arc<dyn HostSession>],
    to: &[Arc<dyn HostSession>],
) -> Result<()> {
    for slab in slabs.iter_mut() {
        migrate_slab(slab, from, to).await?;
    }
    Ok(())
}

/// Delete every sector the slab set references, one bulk call per host
///
/// Every host is attempted; failures are aggregated rather than aborting
/// the remaining deletions.
#[instrument(skip(slabs, hosts), fields(slabs = slabs.len(), hosts = hosts.len()))]
pub async fn delete_slabs(slabs: &[Slab], hosts: &[Arc<dyn HostSession>]) -> Result<()> {
    let mut roots_by_host: HashMap<HostPublicKey, Vec<Hash256>> = HashMap::new();
    for slab in slabs {
        for sector in &slab.shards {
            roots_by_host
                .entry(sector.host)
                .or_default()
                .push(sector.root);
        }
    }

    let (tx, mut rx) = mpsc::channel(hosts.len().max(1));
    for host in hosts {
        let Some(roots) = roots_by_host.remove(&host.public_key()) else {
            continue;
        };
        let host = host.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = host.delete_sectors(roots).await;
            let _ = tx.send((host.public_key(), result)).await;
        });
    }
    drop(tx);

    let mut errors = HostErrorSet::default();
    while let Some((host, result)) = rx.recv().await {
        if let Err(cause) = result {
            warn!(host = %host, error = %cause, "bulk delete failed");
            errors.push(HostError { host, cause });
        }
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(length: u32) -> Slice {
        Slice {
            slab: Slab {
                key: SlabKey::from_bytes([0u8; 32]),
                min_shards: 1,
                shards: Vec::new(),
            },
            offset: 0,
            length,
        }
    }

    #[test]
    fn test_slices_for_range_single() {
        let slices = vec![slice(100)];
        let trimmed = slices_for_range(&slices, 10, 50);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].offset, 10);
        assert_eq!(trimmed[0].length, 50);
    }

    #[test]
    fn test_slices_for_range_spanning() {
        let slices = vec![slice(100), slice(100), slice(100)];
        let trimmed = slices_for_range(&slices, 150, 100);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].offset, 50);
        assert_eq!(trimmed[0].length, 50);
        assert_eq!(trimmed[1].offset, 0);
        assert_eq!(trimmed[1].length, 50);
    }

    #[test]
    fn test_slices_for_range_drops_outer_slices() {
        let slices = vec![slice(10), slice(10), slice(10)];
        let trimmed = slices_for_range(&slices, 12, 3);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].offset, 2);
        assert_eq!(trimmed[0].length, 3);
    }

    #[test]
    fn test_slices_for_range_full() {
        let slices = vec![slice(10), slice(20)];
        let trimmed = slices_for_range(&slices, 0, 30);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].length, 10);
        assert_eq!(trimmed[1].length, 20);
    }
}
