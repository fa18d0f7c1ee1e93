/// Errors produced by the shared infrastructure clients.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A `code` unique-constraint violation on insert. Per the registry's
    /// worker-ID uniqueness invariant this should never happen; surfacing it
    /// distinctly lets callers treat it as fatal rather than retrying.
    #[error("short code {0:?} already exists")]
    DuplicateCode(String),

    /// The Postgres connection pool or a query against it failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The Redis connection or a cache command failed.
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// The AMQP connection, channel, or publish call failed.
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    /// A click event failed to serialise to or deserialise from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
