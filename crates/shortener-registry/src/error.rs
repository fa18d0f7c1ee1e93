/// Errors produced by the worker-ID registry client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// All candidate worker IDs in `0..=max_worker_id` are currently leased
    /// by other processes.
    #[error("no worker id available in 0..={max}", max = .0)]
    NoWorkerIdAvailable(u16),

    /// The renewal task observed its lease key re-taken by another holder
    /// after a TTL expiry; the process's `worker_id` must be treated as
    /// possibly duplicated.
    #[error("worker id {0} lease lost: slot was re-acquired by another process")]
    LeaseLost(u16),

    /// The underlying Redis connection or command failed.
    #[error("redis transport error: {0}")]
    Transport(#[from] redis::RedisError),
}
