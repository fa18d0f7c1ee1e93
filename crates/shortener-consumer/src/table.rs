use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use serde::Serialize;

/// One row of the append-only `click_events` table (§3 "Event row").
#[derive(Debug, Clone, Row, Serialize)]
pub struct EventRow {
    pub code: String,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub ip_address: String,
    pub referrer: String,
    pub original_url: String,
}

/// Idempotently creates the `click_events` table if it doesn't already
/// exist, per §4.7.
pub async fn ensure_table(client: &Client) -> clickhouse::error::Result<()> {
    client
        .query(
            r#"
            CREATE TABLE IF NOT EXISTS click_events (
                code String,
                timestamp DateTime,
                user_agent String,
                ip_address String,
                referrer String,
                original_url String
            ) ENGINE = MergeTree()
            ORDER BY (code, timestamp)
            "#,
        )
        .execute()
        .await
}

/// Appends a single row. One round trip per event - the consumer
/// acknowledges one message at a time (§4.7), so there is no batching
/// window to amortise an `insert()` writer across.
pub async fn insert_row(client: &Client, row: &EventRow) -> clickhouse::error::Result<()> {
    let mut insert = client.insert("click_events")?;
    insert.write(row).await?;
    insert.end().await
}
