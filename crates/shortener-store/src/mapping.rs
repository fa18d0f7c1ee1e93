use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::Error;

/// The authoritative `(id, original_url, code, created_at)` record (§3
/// "Mapping record"). `id` is the Snowflake ID allocated by `shortener-core`
/// and doubles as the primary key - there is no surrogate auto-increment
/// column.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct MappingRecord {
    pub id: i64,
    pub original_url: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// Postgres-backed repository for mapping records.
///
/// Holds a connection pool, not a single connection; every method borrows
/// `&self` and is safe to call concurrently.
#[derive(Clone)]
pub struct MappingRepository {
    pool: PgPool,
}

impl MappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new mapping. `id` and `code` must already satisfy `code =
    /// Base62(id)` (invariant M1) - this repository does not compute either.
    ///
    /// A unique-constraint violation on `code` surfaces as
    /// [`Error::DuplicateCode`] rather than being retried here: per §9, a
    /// collision implies a broken worker-ID invariant or a generator bug,
    /// and masking it by silently minting a new code would hide that.
    pub async fn insert(&self, id: i64, original_url: &str, code: &str) -> Result<MappingRecord, Error> {
        sqlx::query_as::<_, MappingRecord>(
            r#"
            INSERT INTO mappings (id, original_url, code, created_at)
            VALUES ($1, $2, $3, now())
            RETURNING id, original_url, code, created_at
            "#,
        )
        .bind(id)
        .bind(original_url)
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                Error::DuplicateCode(code.to_string())
            }
            _ => Error::Database(err),
        })
    }

    /// Looks up the mapping for `code`. Returns `Ok(None)` rather than an
    /// error when absent - "not found" is a normal outcome of this query,
    /// not a failure of the store.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<MappingRecord>, Error> {
        let record = sqlx::query_as::<_, MappingRecord>(
            r#"
            SELECT id, original_url, code, created_at
            FROM mappings
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
