use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitchfund_core::{EventEnvelope, EventStore, Filter, RecordStore, SettlementEvent, Table};
use serde::Deserialize;
use serde_json::json;

/// Settlement journal persisted as rows of `settlement_events`.
///
/// The store's row id is the sequence, so ordering is global across streams
/// and survives restarts.
pub struct RecordEventStore {
    store: Arc<dyn RecordStore>,
}

#[derive(Deserialize)]
struct EventRow {
    id: i64,
    stream: String,
    payload: SettlementEvent,
    stored_at: DateTime<Utc>,
}

impl From<EventRow> for EventEnvelope {
    fn from(row: EventRow) -> Self {
        Self {
            sequence: row.id,
            stream: row.stream,
            event: row.payload,
            stored_at: row.stored_at,
        }
    }
}

impl RecordEventStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Every drift event across all streams, in append order.
    pub async fn drift(&self) -> anyhow::Result<Vec<EventEnvelope>> {
        self.load(Filter::new().is("drift", true).order_by("id", false))
            .await
    }

    async fn load(&self, filter: Filter) -> anyhow::Result<Vec<EventEnvelope>> {
        let rows = self
            .store
            .get_by_query(Table::SettlementEvents, &filter)
            .await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value::<EventRow>(row)
                    .map(EventEnvelope::from)
                    .context("malformed settlement_events row")
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for RecordEventStore {
    async fn append(&self, stream: &str, event: SettlementEvent) -> anyhow::Result<EventEnvelope> {
        let payload = serde_json::to_value(&event)?;
        let row = json!({
            "stream": stream,
            "kind": payload["kind"],
            "drift": event.is_drift(),
            "payload": payload,
            "stored_at": Utc::now(),
        });

        let stored = self
            .store
            .insert(Table::SettlementEvents, row)
            .await
            .with_context(|| format!("failed to append to {stream}"))?;
        let row: EventRow =
            serde_json::from_value(stored).context("malformed settlement_events row")?;
        Ok(row.into())
    }

    async fn stream(&self, stream: &str) -> anyhow::Result<Vec<EventEnvelope>> {
        self.load(Filter::new().eq("stream", stream).order_by("id", false))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRecordStore;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[tokio::test]
    async fn events_are_stored_as_rows_and_drift_is_collected() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryRecordStore::new());
        let journal = RecordEventStore::new(store.clone());
        let investor_id = Uuid::new_v4();

        journal
            .append(
                "pitch:1",
                SettlementEvent::InvestmentRefunded {
                    investment_id: 3,
                    pitch_id: 1,
                    investor_id,
                    amount: dec!(100),
                },
            )
            .await?;
        let stale = journal
            .append(
                "pitch:2",
                SettlementEvent::ProfitTransferFlagStale {
                    profit_id: 9,
                    reason: "timeout".to_string(),
                },
            )
            .await?;

        assert_eq!(stale.sequence, 2);
        let rows = store.rows(Table::SettlementEvents).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["kind"], json!("profit_transfer_flag_stale"));

        let refunds = journal.stream("pitch:1").await?;
        assert_eq!(refunds.len(), 1);
        assert!(matches!(
            refunds[0].event,
            SettlementEvent::InvestmentRefunded { investment_id: 3, .. }
        ));
        assert!(journal.stream("pitch:3").await?.is_empty());

        let drift = journal.drift().await?;
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].stream, "pitch:2");
        Ok(())
    }

    #[tokio::test]
    async fn a_restarted_journal_reads_earlier_appends() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryRecordStore::new());
        RecordEventStore::new(store.clone())
            .append(
                "pitch:4",
                SettlementEvent::ProfitTransferFlagStale {
                    profit_id: 2,
                    reason: "timeout".to_string(),
                },
            )
            .await?;

        let reopened = RecordEventStore::new(store);
        assert_eq!(reopened.stream("pitch:4").await?.len(), 1);
        assert_eq!(reopened.drift().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_appends_are_errors() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.fail_writes(Table::SettlementEvents, None).await;
        let journal = RecordEventStore::new(store);

        let result = journal
            .append(
                "pitch:1",
                SettlementEvent::ProfitTransferFlagStale {
                    profit_id: 1,
                    reason: "timeout".to_string(),
                },
            )
            .await;
        assert!(result.is_err());
    }
}
