use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Journal entries written by settlement operations.
///
/// The `*Failed` and `*Stale` variants record best-effort bookkeeping that
/// did not complete, so the drift can be reconciled later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlementEvent {
    InvestmentCreated {
        investment_id: i64,
        pitch_id: i64,
        investor_id: Uuid,
        tier_id: i64,
        amount: Decimal,
    },
    InvestmentRefunded {
        investment_id: i64,
        pitch_id: i64,
        investor_id: Uuid,
        amount: Decimal,
    },
    ProfitDeclared {
        profit_id: i64,
        pitch_id: i64,
        total_profit: Decimal,
        distributable_amount: Decimal,
    },
    ProfitDistributed {
        profit_id: i64,
        pitch_id: i64,
        debited: Decimal,
        credited: Decimal,
        investors_paid: usize,
        investors_unpaid: usize,
    },
    PitchRaisedAmountStale {
        pitch_id: i64,
        expected_raised: Decimal,
        reason: String,
    },
    CompensationFailed {
        user_id: Uuid,
        amount: Decimal,
        reason: String,
    },
    RefundCreditFailed {
        investment_id: i64,
        investor_id: Uuid,
        amount: Decimal,
        reason: String,
    },
    InvestorCreditFailed {
        profit_id: i64,
        investment_id: i64,
        investor_id: Uuid,
        amount: Decimal,
        reason: String,
    },
    DistributionRecordFailed {
        profit_id: i64,
        investment_id: i64,
        investor_id: Uuid,
        amount: Decimal,
        paid: bool,
        reason: String,
    },
    ProfitTransferFlagStale {
        profit_id: i64,
        reason: String,
    },
}

impl SettlementEvent {
    pub fn is_drift(&self) -> bool {
        matches!(
            self,
            SettlementEvent::PitchRaisedAmountStale { .. }
                | SettlementEvent::CompensationFailed { .. }
                | SettlementEvent::RefundCreditFailed { .. }
                | SettlementEvent::InvestorCreditFailed { .. }
                | SettlementEvent::DistributionRecordFailed { .. }
                | SettlementEvent::ProfitTransferFlagStale { .. }
        )
    }
}

/// Journal stream that settlement events for a pitch are appended to.
pub fn pitch_stream(pitch_id: i64) -> String {
    format!("pitch:{pitch_id}")
}
