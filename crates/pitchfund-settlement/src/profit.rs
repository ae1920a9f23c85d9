use chrono::NaiveDate;
use pitchfund_core::{
    NewProfit, Profit, SettlementError, SettlementEvent, SettlementResult,
    money::{percent_of, round_money},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::SettlementEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitDeclaration {
    pub pitch_id: i64,
    pub total_profit: Decimal,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl SettlementEngine {
    /// Record a profit for a pitch the caller owns. The distributable amount
    /// is the pitch's profit share of `total_profit`, rounded to minor units.
    pub async fn declare_profit(
        &self,
        owner_id: Uuid,
        declaration: ProfitDeclaration,
    ) -> SettlementResult<Profit> {
        if declaration.pitch_id <= 0 {
            return Err(SettlementError::validation("pitch_id must be positive"));
        }
        if declaration.total_profit <= Decimal::ZERO {
            return Err(SettlementError::validation("total_profit must be positive"));
        }
        if declaration.period_end < declaration.period_start {
            return Err(SettlementError::validation(
                "period_end must be on or after period_start",
            ));
        }

        let pitch = self.owned_pitch(owner_id, declaration.pitch_id).await?;
        let share = percent_of(declaration.total_profit, pitch.profit_share_percent)
            .ok_or_else(|| SettlementError::validation("total_profit is too large"))?;
        let distributable_amount = round_money(share);

        let profit = self
            .repo
            .create_profit(&NewProfit {
                pitch_id: pitch.id,
                declared_by: owner_id,
                period_start: declaration.period_start,
                period_end: declaration.period_end,
                total_profit: declaration.total_profit,
                distributable_amount,
                transferred: false,
            })
            .await?;

        info!(
            profit_id = profit.id,
            pitch_id = pitch.id,
            total_profit = %profit.total_profit,
            %distributable_amount,
            "profit declared"
        );
        self.record(
            pitch.id,
            SettlementEvent::ProfitDeclared {
                profit_id: profit.id,
                pitch_id: pitch.id,
                total_profit: profit.total_profit,
                distributable_amount,
            },
        )
        .await;

        Ok(profit)
    }

    pub async fn profit_for_owner(&self, owner_id: Uuid, profit_id: i64) -> SettlementResult<Profit> {
        let profit = self
            .repo
            .profit(profit_id)
            .await?
            .ok_or(SettlementError::NotFound("profit"))?;
        self.owned_pitch(owner_id, profit.pitch_id).await?;
        Ok(profit)
    }

    pub async fn profits_for_pitch(&self, owner_id: Uuid, pitch_id: i64) -> SettlementResult<Vec<Profit>> {
        self.owned_pitch(owner_id, pitch_id).await?;
        Ok(self.repo.profits_for_pitches(&[pitch_id]).await?)
    }

    /// Every profit declared on any pitch the caller owns.
    pub async fn profits_for_owner(&self, owner_id: Uuid) -> SettlementResult<Vec<Profit>> {
        let pitch_ids: Vec<i64> = self
            .repo
            .pitches_owned_by(owner_id)
            .await?
            .into_iter()
            .map(|pitch| pitch.id)
            .collect();
        Ok(self.repo.profits_for_pitches(&pitch_ids).await?)
    }
}
