use std::sync::Arc;

use pitchfund_core::{
    EventEnvelope, EventStore, Pitch, Repository, SettlementError, SettlementEvent, SettlementResult,
    events::pitch_stream,
};
use pitchfund_ledger::{BalanceLedger, KeyedLocks};
use tracing::warn;
use uuid::Uuid;

/// Runs settlement operations against the record store.
///
/// Money always moves through the [`BalanceLedger`]. Each operation appends
/// what it did, and any bookkeeping it could not finish, to the settlement
/// journal under the pitch's stream.
pub struct SettlementEngine {
    pub(crate) repo: Repository,
    pub(crate) ledger: Arc<BalanceLedger>,
    pub(crate) locks: KeyedLocks,
    journal: Arc<dyn EventStore>,
}

impl SettlementEngine {
    pub fn new(ledger: Arc<BalanceLedger>, journal: Arc<dyn EventStore>) -> Self {
        Self {
            repo: ledger.repository().clone(),
            ledger,
            locks: KeyedLocks::new(),
            journal,
        }
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    pub(crate) async fn record(&self, pitch_id: i64, event: SettlementEvent) {
        if event.is_drift() {
            warn!(pitch_id, ?event, "settlement bookkeeping left incomplete");
        }
        if let Err(err) = self.journal.append(&pitch_stream(pitch_id), event).await {
            warn!(pitch_id, "failed to append settlement event: {err:#}");
        }
    }

    /// The pitch's journal stream, oldest first. Only the pitch owner may read it.
    pub async fn journal_for_owner(
        &self,
        owner_id: Uuid,
        pitch_id: i64,
    ) -> SettlementResult<Vec<EventEnvelope>> {
        self.owned_pitch(owner_id, pitch_id).await?;
        self.journal
            .stream(&pitch_stream(pitch_id))
            .await
            .map_err(|err| SettlementError::Journal(format!("{err:#}")))
    }

    pub(crate) async fn load_pitch(&self, pitch_id: i64) -> SettlementResult<Pitch> {
        self.repo
            .pitch(pitch_id)
            .await?
            .ok_or(SettlementError::NotFound("pitch"))
    }

    pub(crate) async fn owned_pitch(&self, owner_id: Uuid, pitch_id: i64) -> SettlementResult<Pitch> {
        let pitch = self.load_pitch(pitch_id).await?;
        if pitch.owner_id != owner_id {
            return Err(SettlementError::Forbidden(
                "you do not own this pitch".to_string(),
            ));
        }
        Ok(pitch)
    }
}
