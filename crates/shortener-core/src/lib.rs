//! Base62 codec and Snowflake-style 64-bit ID generator.
//!
//! This crate has no I/O of its own: the generator is parameterised over a
//! [`Clock`] so that callers (and tests) can control time, and the worker ID
//! is supplied by whoever owns the cluster-wide lease (see
//! `shortener-registry`).

mod base62;
mod error;
mod snowflake;
mod time;

pub use base62::{decode, encode};
pub use error::Error;
pub use snowflake::{ParsedId, ShortflakeGenerator, EPOCH_MILLIS, MAX_SEQUENCE, MAX_WORKER_ID};
pub use time::{Clock, SystemClock};
