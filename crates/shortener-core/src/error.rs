/// Errors produced by `shortener-core`.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A character outside the Base62 alphabet (`0-9a-zA-Z`) was decoded.
    #[error("invalid base62 symbol: {0:?}")]
    InvalidSymbol(char),

    /// The generator's constructor was given a worker ID outside `[0, 1023]`.
    #[error("worker id {0} out of range [0, {MAX}]", MAX = crate::snowflake::MAX_WORKER_ID)]
    InvalidWorkerId(u16),

    /// The wall clock moved backward relative to the last ID the generator
    /// emitted; no ID is produced when this happens.
    #[error("clock moved backward by {delta_ms}ms")]
    ClockRegressed { delta_ms: u64 },
}
