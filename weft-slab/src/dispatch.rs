//! Host-substituting parallel dispatch
//!
//! Runs one task per shard against an ordered candidate host list. Each
//! task starts on the host sharing its index; a failed attempt records a
//! `HostError` and moves the task to the next unused host. Hosts are
//! consumed left-to-right and carry at most one inflight task, so shard
//! placements stay distinct. Results are recorded by task slot, never by
//! completion order.

use crate::session::{HostSession, SessionError};
use crate::types::{HostError, HostErrorSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Outcome of a dispatch run: per-slot results plus every host failure
/// observed along the way
///
/// A `None` slot means the candidate list ran out before the task retired.
/// Callers with all-or-nothing semantics treat any `None` as failure;
/// migration applies the `Some` slots as partial progress.
pub(crate) type DispatchOutcome<R> = (Vec<Option<R>>, HostErrorSet);

pub(crate) async fn dispatch<T, R, F, Fut>(
    tasks: &[T],
    hosts: &[Arc<dyn HostSession>],
    run: F,
) -> DispatchOutcome<R>
where
    T: Copy,
    R: Send + 'static,
    F: Fn(&Arc<dyn HostSession>, T) -> Fut,
    Fut: Future<Output = Result<R, SessionError>> + Send + 'static,
{
    debug_assert!(hosts.len() >= tasks.len());

    let (tx, mut rx) = mpsc::channel(hosts.len().max(1));
    let spawn_attempt = |slot: usize, host: &Arc<dyn HostSession>, fut: Fut| {
        let tx = tx.clone();
        let host_key = host.public_key();
        tokio::spawn(async move {
            // The receiver is dropped once the dispatch is decided; late
            // completions go nowhere.
            let _ = tx.send((slot, host_key, fut.await)).await;
        });
    };

    let mut host_index = 0;
    let mut inflight = 0;
    for (slot, &task) in tasks.iter().enumerate() {
        let host = &hosts[host_index];
        host_index += 1;
        spawn_attempt(slot, host, run(host, task));
        inflight += 1;
    }

    let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(tasks.len()).collect();
    let mut remaining = tasks.len();
    let mut errors = HostErrorSet::default();
    while remaining > 0 && inflight > 0 {
        let Some((slot, host, result)) = rx.recv().await else {
            break;
        };
        inflight -= 1;
        match result {
            Ok(value) => {
                results[slot] = Some(value);
                remaining -= 1;
            }
            Err(cause) => {
                warn!(host = %host, error = %cause, "host operation failed");
                errors.push(HostError { host, cause });
                if host_index < hosts.len() {
                    let next = &hosts[host_index];
                    host_index += 1;
                    spawn_attempt(slot, next, run(next, tasks[slot]));
                    inflight += 1;
                }
            }
        }
    }

    (results, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weft_core::{Hash256, HostPublicKey};

    struct ScriptedHost {
        key: HostPublicKey,
        fail: bool,
        delay_ms: u64,
        calls: AtomicUsize,
    }

    impl ScriptedHost {
        fn new(id: u8, fail: bool, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                key: HostPublicKey::from_bytes([id; 32]),
                fail,
                delay_ms,
                calls: AtomicUsize::new(0),
            })
        }
    }

    fn as_sessions(hosts: &[Arc<ScriptedHost>]) -> Vec<Arc<dyn HostSession>> {
        hosts
            .iter()
            .map(|h| h.clone() as Arc<dyn HostSession>)
            .collect()
    }

    #[async_trait::async_trait]
    impl HostSession for ScriptedHost {
        fn public_key(&self) -> HostPublicKey {
            self.key
        }

        async fn upload_sector(&self, _sector: Bytes) -> Result<Hash256, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }
            if self.fail {
                return Err("scripted failure".into());
            }
            Ok(Hash256::from_bytes(*self.key.as_bytes()))
        }

        async fn download_sector(
            &self,
            _root: Hash256,
            _offset: u32,
            _length: u32,
        ) -> Result<Bytes, SessionError> {
            unimplemented!("dispatch tests only upload")
        }

        async fn delete_sectors(&self, _roots: Vec<Hash256>) -> Result<(), SessionError> {
            unimplemented!("dispatch tests only upload")
        }
    }

    async fn run_upload(
        tasks: usize,
        hosts: &[Arc<dyn HostSession>],
    ) -> DispatchOutcome<(usize, HostPublicKey)> {
        let task_ids: Vec<usize> = (0..tasks).collect();
        dispatch(&task_ids, hosts, |host, task| {
            let host = host.clone();
            async move {
                host.upload_sector(Bytes::new()).await?;
                Ok((task, host.public_key()))
            }
        })
        .await
    }

    #[tokio::test]
    async fn test_all_tasks_retire_in_slot_order() {
        // Completion order is scrambled by delays; slots must not be.
        let hosts: Vec<_> = (0..4)
            .map(|i| ScriptedHost::new(i as u8, false, (4 - i) as u64 * 10))
            .collect();
        let (results, errors) = run_upload(4, &as_sessions(&hosts)).await;

        assert!(errors.is_empty());
        for (slot, result) in results.iter().enumerate() {
            let (task, host) = result.as_ref().unwrap();
            assert_eq!(*task, slot);
            assert_eq!(*host, hosts[slot].public_key());
        }
    }

    #[tokio::test]
    async fn test_substitutes_failed_hosts() {
        // Hosts 0 and 2 fail; their tasks land on the spare hosts 4 and 5.
        let hosts: Vec<_> = (0..6u8)
            .map(|i| ScriptedHost::new(i, i == 0 || i == 2, 0))
            .collect();
        let (results, errors) = run_upload(4, &as_sessions(&hosts)).await;

        assert_eq!(errors.len(), 2);
        let placed: Vec<HostPublicKey> = results.iter().map(|r| r.as_ref().unwrap().1).collect();
        for (a, key) in placed.iter().enumerate() {
            assert_ne!(*key, hosts[0].public_key());
            assert_ne!(*key, hosts[2].public_key());
            for other in &placed[a + 1..] {
                assert_ne!(key, other);
            }
        }
    }

    #[tokio::test]
    async fn test_exhaustion_reports_every_failure() {
        // Three failing hosts against two tasks: the candidate list runs
        // out with one task unretired.
        let hosts: Vec<_> = (0..3u8).map(|i| ScriptedHost::new(i, i != 1, 0)).collect();
        let (results, errors) = run_upload(2, &as_sessions(&hosts)).await;

        assert_eq!(results.iter().filter(|r| r.is_none()).count(), 1);
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn test_each_host_attempted_at_most_once() {
        let hosts: Vec<_> = (0..5u8).map(|i| ScriptedHost::new(i, i < 2, 0)).collect();
        let (results, errors) = run_upload(3, &as_sessions(&hosts)).await;

        assert!(results.iter().all(|r| r.is_some()));
        assert_eq!(errors.len(), 2);
        for host in &hosts {
            assert!(host.calls.load(Ordering::SeqCst) <= 1);
        }
    }
}
