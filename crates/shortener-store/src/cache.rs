use redis::aio::ConnectionManager;

use crate::Error;

const KEY_PREFIX: &str = "short_url:";

/// Default TTL for a cached redirect: one day, per §3 "Cache entry".
pub const DEFAULT_TTL_SECS: u64 = 86_400;

fn key_for(code: &str) -> String {
    format!("{KEY_PREFIX}{code}")
}

/// Redis-backed redirect cache: `short_url:{code} -> original_url`.
///
/// Absence is never authoritative - callers fall back to the relational
/// store on a miss (§4.4).
#[derive(Clone)]
pub struct RedirectCache {
    conn: ConnectionManager,
}

impl RedirectCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Reads the cached `original_url` for `code`, if present.
    pub async fn get(&self, code: &str) -> Result<Option<String>, Error> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key_for(code))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    /// Writes `original_url` for `code` with `ttl_secs`. Callers on the hot
    /// path treat a failure here as log-and-swallow (§4.4 step 3, §4.5 step
    /// 4) - this method still returns the error so the caller decides.
    pub async fn set(&self, code: &str, original_url: &str, ttl_secs: u64) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        redis::cmd("SETEX")
            .arg(key_for(code))
            .arg(ttl_secs)
            .arg(original_url)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
