use lapin::options::{
    BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

use crate::events::ClickEvent;

/// Publishes click events onto a durable AMQP topic exchange (§4.6).
///
/// `Disabled` is the null-object variant used when startup fails to connect:
/// the redirect path then degrades to "redirect served, no event recorded"
/// instead of propagating the failure.
pub enum Publisher {
    Active {
        channel: Channel,
        exchange: String,
        routing_key: String,
    },
    Disabled,
}

impl Publisher {
    /// Connects, declares the exchange/queue/binding, and returns an active
    /// publisher. On any failure, logs at `error` and returns
    /// `Publisher::Disabled` rather than propagating - startup continues
    /// with analytics degraded, matching "if it does, the publisher is
    /// disabled (null object)".
    pub async fn connect(amqp_url: &str, exchange: &str, queue: &str) -> Self {
        match Self::try_connect(amqp_url, exchange, queue).await {
            Ok(publisher) => publisher,
            Err(err) => {
                tracing::error!(%err, "failed to initialize event publisher; analytics will be disabled");
                Publisher::Disabled
            }
        }
    }

    async fn try_connect(amqp_url: &str, exchange: &str, queue: &str) -> Result<Self, lapin::Error> {
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

        tracing::info!(exchange, queue, "event publisher initialized");

        Ok(Publisher::Active {
            channel,
            exchange: exchange.to_string(),
            routing_key: queue.to_string(),
        })
    }

    /// Publishes `event`. Never returns an error: connection loss, channel
    /// closure, and serialization failure are all logged at `warn` and
    /// swallowed (§4.6 step 3, property E1) - the redirect hot path must
    /// never observe an analytics failure.
    pub async fn publish(&self, event: &ClickEvent) {
        let (channel, exchange, routing_key) = match self {
            Publisher::Active {
                channel,
                exchange,
                routing_key,
            } => (channel, exchange, routing_key),
            Publisher::Disabled => return,
        };

        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(%err, short_code = %event.short_code, "failed to serialize click event");
                return;
            }
        };

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(2);

        let result = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await;

        match result {
            Ok(confirm) => {
                if let Err(err) = confirm.await {
                    tracing::warn!(%err, short_code = %event.short_code, "click event publish was not confirmed");
                }
            }
            Err(err) => {
                tracing::warn!(%err, short_code = %event.short_code, "failed to publish click event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_publisher_swallows_publish() {
        let publisher = Publisher::Disabled;
        let event = ClickEvent::now("abc", "https://example.com", "curl/8", "127.0.0.1", "");
        // Must return without touching the network - there's nothing to connect to.
        publisher.publish(&event).await;
    }
}
