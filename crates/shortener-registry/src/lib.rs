//! Cluster-wide worker-ID leasing for the Snowflake generator (component C3).
//!
//! State machine per process: `Unleased -> Acquiring -> Held(n) -> Releasing
//! -> Unleased`. `Held(n)` is the steady state during which the process may
//! run the ID generator with machine ID `n`.

mod error;
mod lease;

pub use error::Error;
pub use lease::{WorkerIdLease, DEFAULT_LEASE_TTL_SECS, DEFAULT_MAX_WORKER_ID, DEFAULT_RENEWAL_INTERVAL_SECS};
