use pitchfund_core::{
    Investment, NewInvestment, PitchStatus, SettlementError, SettlementEvent, SettlementResult,
    money::is_whole_units,
};
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::SettlementEngine;
use crate::tiers::select_tier;

impl SettlementEngine {
    /// Commit `amount` from the investor's wallet to an active pitch.
    ///
    /// The wallet is debited before the investment row is written; if the
    /// write fails the debit is returned. Updating the pitch's raised amount
    /// afterwards is best-effort.
    pub async fn create_investment(
        &self,
        investor_id: Uuid,
        pitch_id: i64,
        amount: Decimal,
    ) -> SettlementResult<Investment> {
        if amount <= Decimal::ZERO {
            return Err(SettlementError::validation("amount must be positive"));
        }
        if !is_whole_units(amount) {
            return Err(SettlementError::validation(
                "amount must be a whole currency amount",
            ));
        }

        let _guard = self.locks.lock(format!("pitch:{pitch_id}")).await;

        let pitch = self.load_pitch(pitch_id).await?;
        if !pitch.is_accepting_investments() {
            return Err(SettlementError::InvalidState(
                "pitch is no longer active".to_string(),
            ));
        }

        let new_raised = pitch
            .raised_amount
            .checked_add(amount)
            .filter(|raised| *raised <= pitch.target_amount)
            .ok_or(SettlementError::LimitExceeded)?;

        let tiers = self.repo.tiers_for_pitch(pitch_id).await?;
        let tier = select_tier(&tiers, amount).ok_or(SettlementError::NoMatchingTier)?;

        self.ledger.adjust_wallet_balance(investor_id, -amount).await?;

        let new_investment = NewInvestment {
            pitch_id,
            investor_id,
            tier_id: tier.id,
            amount,
            refunded: false,
        };
        let investment = match self.repo.create_investment(&new_investment).await {
            Ok(investment) => investment,
            Err(err) => {
                if let Err(compensation) = self.ledger.adjust_wallet_balance(investor_id, amount).await {
                    error!(
                        %investor_id,
                        pitch_id,
                        %amount,
                        "failed to return debited funds after investment insert failed: {compensation}"
                    );
                    self.record(
                        pitch_id,
                        SettlementEvent::CompensationFailed {
                            user_id: investor_id,
                            amount,
                            reason: compensation.to_string(),
                        },
                    )
                    .await;
                }
                return Err(err.into());
            }
        };

        let status = (new_raised == pitch.target_amount).then_some(PitchStatus::Funded);
        if let Err(err) = self
            .repo
            .update_pitch_funding(pitch_id, new_raised, status)
            .await
        {
            self.record(
                pitch_id,
                SettlementEvent::PitchRaisedAmountStale {
                    pitch_id,
                    expected_raised: new_raised,
                    reason: err.to_string(),
                },
            )
            .await;
        }

        info!(
            investment_id = investment.id,
            pitch_id,
            %investor_id,
            tier_id = tier.id,
            %amount,
            "investment created"
        );
        self.record(
            pitch_id,
            SettlementEvent::InvestmentCreated {
                investment_id: investment.id,
                pitch_id,
                investor_id,
                tier_id: tier.id,
                amount,
            },
        )
        .await;

        Ok(investment)
    }

    /// Refund an investment on a pitch that is still raising.
    ///
    /// The refunded flag is the commit point: if it cannot be written nothing
    /// is credited. The pitch rollback and the wallet credit are best-effort.
    pub async fn refund_investment(
        &self,
        investor_id: Uuid,
        investment_id: i64,
    ) -> SettlementResult<Investment> {
        let investment = self.investment_for_investor(investor_id, investment_id).await?;
        if investment.refunded {
            return Err(SettlementError::AlreadyRefunded);
        }

        let pitch_id = investment.pitch_id;
        let _guard = self.locks.lock(format!("pitch:{pitch_id}")).await;

        // Re-read under the pitch lock so a concurrent refund is seen.
        let investment = self.investment_for_investor(investor_id, investment_id).await?;
        if investment.refunded {
            return Err(SettlementError::AlreadyRefunded);
        }

        let pitch = self.load_pitch(pitch_id).await?;
        if pitch.status != PitchStatus::Active {
            return Err(SettlementError::InvalidState(
                "refunds are only possible on active pitches".to_string(),
            ));
        }

        let new_raised = pitch
            .raised_amount
            .checked_sub(investment.amount)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
        if let Err(err) = self
            .repo
            .update_pitch_funding(pitch_id, new_raised, None)
            .await
        {
            self.record(
                pitch_id,
                SettlementEvent::PitchRaisedAmountStale {
                    pitch_id,
                    expected_raised: new_raised,
                    reason: err.to_string(),
                },
            )
            .await;
        }

        self.repo.mark_investment_refunded(investment_id).await?;

        if let Err(err) = self
            .ledger
            .adjust_wallet_balance(investor_id, investment.amount)
            .await
        {
            warn!(
                investment_id,
                %investor_id,
                amount = %investment.amount,
                "failed to credit refund to wallet: {err}"
            );
            self.record(
                pitch_id,
                SettlementEvent::RefundCreditFailed {
                    investment_id,
                    investor_id,
                    amount: investment.amount,
                    reason: err.to_string(),
                },
            )
            .await;
        }

        info!(investment_id, pitch_id, %investor_id, amount = %investment.amount, "investment refunded");
        self.record(
            pitch_id,
            SettlementEvent::InvestmentRefunded {
                investment_id,
                pitch_id,
                investor_id,
                amount: investment.amount,
            },
        )
        .await;

        Ok(Investment {
            refunded: true,
            ..investment
        })
    }

    pub async fn investment_for_investor(
        &self,
        investor_id: Uuid,
        investment_id: i64,
    ) -> SettlementResult<Investment> {
        let investment = self
            .repo
            .investment(investment_id)
            .await?
            .ok_or(SettlementError::NotFound("investment"))?;
        if investment.investor_id != investor_id {
            return Err(SettlementError::Forbidden(
                "you do not own this investment".to_string(),
            ));
        }
        Ok(investment)
    }

    pub async fn investments_for_investor(&self, investor_id: Uuid) -> SettlementResult<Vec<Investment>> {
        Ok(self.repo.investments_for_investor(investor_id).await?)
    }
}
