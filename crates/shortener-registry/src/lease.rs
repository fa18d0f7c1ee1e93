use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::RedisResult;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::Error;

const KEY_PREFIX: &str = "worker_id:lease:";

pub const DEFAULT_LEASE_TTL_SECS: u64 = 60;
pub const DEFAULT_RENEWAL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MAX_WORKER_ID: u16 = 1023;

fn key_for(worker_id: u16) -> String {
    format!("{KEY_PREFIX}{worker_id}")
}

/// Atomically sets `key` to `value` with expiry `ttl_secs`, only if absent.
/// Returns `true` if the lease was acquired.
async fn set_if_absent(conn: &mut ConnectionManager, key: &str, ttl_secs: u64) -> RedisResult<bool> {
    let result: Option<String> = redis::cmd("SET")
        .arg(key)
        .arg("leased")
        .arg("NX")
        .arg("EX")
        .arg(ttl_secs)
        .query_async(conn)
        .await?;
    Ok(result.is_some())
}

/// Extends `key`'s TTL to `ttl_secs`. Returns whether the key existed.
async fn extend_ttl(conn: &mut ConnectionManager, key: &str, ttl_secs: u64) -> RedisResult<bool> {
    redis::cmd("EXPIRE")
        .arg(key)
        .arg(ttl_secs)
        .query_async(conn)
        .await
}

async fn delete(conn: &mut ConnectionManager, key: &str) -> RedisResult<()> {
    redis::cmd("DEL").arg(key).query_async(conn).await
}

/// A held worker-ID lease, with its background renewal task.
///
/// Dropping this value does *not* release the lease or stop renewal - call
/// [`WorkerIdLease::release`] explicitly during orderly shutdown. A crashed
/// process relies on the lease's TTL for eventual reclamation, matching
/// §4.3's "Release is best-effort".
pub struct WorkerIdLease {
    conn: ConnectionManager,
    worker_id: u16,
    lease_ttl_secs: u64,
    renewal_task: Option<JoinHandle<()>>,
    lease_lost: Arc<Notify>,
}

impl WorkerIdLease {
    /// Walks candidate worker IDs `0..=max_worker_id` in order, issuing an
    /// atomic create-if-absent lease request for each, and returns the first
    /// one acquired. Spawns a background renewal task on success.
    pub async fn acquire(
        mut conn: ConnectionManager,
        max_worker_id: u16,
        lease_ttl_secs: u64,
        renewal_interval_secs: u64,
    ) -> Result<Self, Error> {
        for candidate in 0..=max_worker_id {
            let key = key_for(candidate);
            if set_if_absent(&mut conn, &key, lease_ttl_secs).await? {
                tracing::info!(worker_id = candidate, "acquired worker id lease");

                let lease_lost = Arc::new(Notify::new());
                let renewal_task = tokio::spawn(renew_loop(
                    conn.clone(),
                    candidate,
                    lease_ttl_secs,
                    renewal_interval_secs,
                    lease_lost.clone(),
                ));

                return Ok(Self {
                    conn,
                    worker_id: candidate,
                    lease_ttl_secs,
                    renewal_task: Some(renewal_task),
                    lease_lost,
                });
            }
        }

        Err(Error::NoWorkerIdAvailable(max_worker_id))
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }

    /// Resolves when the renewal task has detected that this lease was lost
    /// (its slot was re-taken after a TTL expiry), yielding the
    /// [`Error::LeaseLost`] that describes it. The caller must treat its
    /// `worker_id` as possibly duplicated once this fires - per §9's
    /// lease-lost policy, this process re-initialises from scratch or shuts
    /// down; it must never continue silently.
    pub async fn wait_lease_lost(&self) -> Error {
        self.lease_lost.notified().await;
        Error::LeaseLost(self.worker_id)
    }

    /// Cancels the renewal task and deletes the lease key. Best-effort: a
    /// transport failure here is logged, not propagated, since the TTL will
    /// reclaim the slot regardless.
    pub async fn release(mut self) {
        if let Some(task) = self.renewal_task.take() {
            task.abort();
        }
        let key = key_for(self.worker_id);
        if let Err(err) = delete(&mut self.conn, &key).await {
            tracing::warn!(worker_id = self.worker_id, %err, "failed to delete worker id lease key on release");
        } else {
            tracing::info!(worker_id = self.worker_id, "released worker id lease");
        }
    }
}

async fn renew_loop(
    mut conn: ConnectionManager,
    worker_id: u16,
    lease_ttl_secs: u64,
    renewal_interval_secs: u64,
    lease_lost: Arc<Notify>,
) {
    let key = key_for(worker_id);
    loop {
        tokio::time::sleep(Duration::from_secs(renewal_interval_secs)).await;

        match extend_ttl(&mut conn, &key, lease_ttl_secs).await {
            Ok(true) => {
                tracing::debug!(worker_id, "renewed worker id lease");
            }
            Ok(false) => {
                tracing::warn!(
                    worker_id,
                    "worker id lease expired before renewal; attempting to reacquire"
                );
                match set_if_absent(&mut conn, &key, lease_ttl_secs).await {
                    Ok(true) => {
                        tracing::warn!(worker_id, "reacquired worker id lease after expiry");
                    }
                    Ok(false) => {
                        tracing::error!(
                            worker_id,
                            "worker id lease slot was taken by another process; lease lost"
                        );
                        lease_lost.notify_one();
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(worker_id, %err, "transport error reacquiring worker id lease; will retry next interval");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(worker_id, %err, "transport error renewing worker id lease; will retry next interval");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_worker_id_lease_prefix() {
        assert_eq!(key_for(7), "worker_id:lease:7");
        assert_eq!(key_for(0), "worker_id:lease:0");
    }
}
