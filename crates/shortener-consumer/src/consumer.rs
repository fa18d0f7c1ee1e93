use chrono::{DateTime, SubsecRound, Utc};
use clickhouse::Client as ClickHouseClient;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use shortener_store::ClickEvent;

use crate::table::{self, EventRow};

/// Connects, declares the exchange/queue/binding (mirroring the producer
/// side - "should already exist, but ensure it"), and returns the connection
/// alongside a channel ready to consume. The caller must keep `Connection`
/// alive for as long as the channel is in use - dropping it closes the
/// channel.
pub async fn connect(
    amqp_url: &str,
    exchange: &str,
    queue: &str,
) -> Result<(Connection, Channel), lapin::Error> {
    let properties = ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);
    let connection = Connection::connect(amqp_url, properties).await?;
    let channel = connection.create_channel().await?;

    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            queue,
            exchange,
            queue,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    Ok((connection, channel))
}

/// Drains `queue` on `channel`, appending each decoded event into
/// ClickHouse. Runs until the channel or connection closes.
///
/// Each message is acknowledged iff it decodes and appends successfully
/// (§4.7); any failure nacks with `requeue = true`, returning the message to
/// the queue (or a dead-letter queue, if the broker is configured with one).
pub async fn run(channel: Channel, queue: &str, ch_client: ClickHouseClient) -> Result<(), lapin::Error> {
    let mut consumer = channel
        .basic_consume(
            queue,
            "shortener-consumer",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery?;

        match process(&ch_client, &delivery.data).await {
            Ok(()) => {
                delivery.ack(BasicAckOptions::default()).await?;
            }
            Err(reason) => {
                tracing::warn!(%reason, "failed to process click event; returning to queue");
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await?;
            }
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum ProcessError {
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("append error: {0}")]
    Append(#[from] clickhouse::error::Error),
}

async fn process(ch_client: &ClickHouseClient, payload: &[u8]) -> Result<(), ProcessError> {
    let event: ClickEvent = serde_json::from_slice(payload)?;

    let timestamp = normalize_timestamp(&event.timestamp);
    let row = EventRow {
        code: event.short_code,
        timestamp,
        user_agent: event.user_agent,
        ip_address: event.ip_address,
        referrer: event.referrer,
        original_url: event.original_url,
    };

    table::insert_row(ch_client, &row).await?;
    Ok(())
}

/// Parses an ISO-8601 timestamp (with or without a trailing `Z`) and
/// truncates to whole-second precision - ClickHouse's `DateTime` has no
/// sub-second resolution. Falls back to the current time if the timestamp
/// fails to parse, rather than dropping the event.
fn normalize_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|err| {
            tracing::warn!(%err, raw, "failed to parse click event timestamp; using ingest time");
            Utc::now()
        })
        .trunc_subsecs(0)
}
