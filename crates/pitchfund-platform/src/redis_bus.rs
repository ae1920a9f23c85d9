use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitchfund_core::{EventEnvelope, EventStore, SettlementEvent};
use redis::{AsyncCommands, Client};
use serde::Serialize;
use tracing::warn;

pub const SETTLEMENT_CHANNEL: &str = "settlement.events";

#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PublishedEvent<'a> {
    sequence: i64,
    stream: &'a str,
    stored_at: DateTime<Utc>,
    event: &'a SettlementEvent,
}

impl<'a> From<&'a EventEnvelope> for PublishedEvent<'a> {
    fn from(envelope: &'a EventEnvelope) -> Self {
        Self {
            sequence: envelope.sequence,
            stream: &envelope.stream,
            stored_at: envelope.stored_at,
            event: &envelope.event,
        }
    }
}

/// Journal that fans every appended event out on [`SETTLEMENT_CHANNEL`].
/// Publishing never fails an append.
pub struct PublishingEventStore {
    inner: Arc<dyn EventStore>,
    bus: RedisBus,
}

impl PublishingEventStore {
    pub fn new(inner: Arc<dyn EventStore>, bus: RedisBus) -> Self {
        Self { inner, bus }
    }
}

#[async_trait]
impl EventStore for PublishingEventStore {
    async fn append(&self, stream: &str, event: SettlementEvent) -> Result<EventEnvelope> {
        let envelope = self.inner.append(stream, event).await?;
        if let Err(err) = self
            .bus
            .publish_json(SETTLEMENT_CHANNEL, &PublishedEvent::from(&envelope))
            .await
        {
            warn!(stream, sequence = envelope.sequence, "failed to publish settlement event: {err}");
        }
        Ok(envelope)
    }

    async fn stream(&self, stream: &str) -> Result<Vec<EventEnvelope>> {
        self.inner.stream(stream).await
    }
}
