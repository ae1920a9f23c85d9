use std::collections::HashMap;

use pitchfund_core::{
    Investment, InvestmentTier, NewProfitDistribution, ProfitDistribution, SettlementError,
    SettlementEvent, SettlementResult, money::round_money,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::SettlementEngine;

/// An investment's weighted claim on a distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stake {
    pub investment_id: i64,
    pub investor_id: Uuid,
    pub shares: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payout {
    pub investment_id: i64,
    pub investor_id: Uuid,
    pub shares: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub profit_id: i64,
    pub pitch_id: i64,
    pub debited: Decimal,
    pub paid: Vec<Payout>,
    pub unpaid: Vec<Payout>,
    /// Payouts whose distribution row could not be written.
    pub unrecorded: Vec<Payout>,
}

impl DistributionReport {
    pub fn credited(&self) -> Decimal {
        self.paid
            .iter()
            .fold(Decimal::ZERO, |total, payout| total.saturating_add(payout.amount))
    }
}

/// `amount * multiplier` for every investment whose tier resolves. Investments
/// without a known tier carry no stake.
pub fn weigh_investments(
    investments: &[Investment],
    tiers: &[InvestmentTier],
) -> SettlementResult<Vec<Stake>> {
    let multipliers: HashMap<i64, Decimal> = tiers
        .iter()
        .map(|tier| (tier.id, tier.multiplier))
        .collect();

    let mut stakes = Vec::with_capacity(investments.len());
    for investment in investments {
        let Some(multiplier) = investment.tier_id.and_then(|id| multipliers.get(&id)) else {
            continue;
        };
        let shares = investment
            .amount
            .checked_mul(*multiplier)
            .ok_or_else(|| share_overflow(investment.id))?;
        stakes.push(Stake {
            investment_id: investment.id,
            investor_id: investment.investor_id,
            shares,
        });
    }
    Ok(stakes)
}

/// Split `distributable` across stakes pro rata, each payout rounded half-up
/// to minor units. Rounding drift against `distributable` is not redistributed.
pub fn plan_payouts(distributable: Decimal, stakes: &[Stake]) -> SettlementResult<Vec<Payout>> {
    let mut total_shares = Decimal::ZERO;
    for stake in stakes {
        total_shares = total_shares
            .checked_add(stake.shares)
            .ok_or_else(|| share_overflow(stake.investment_id))?;
    }
    if total_shares <= Decimal::ZERO {
        return Err(SettlementError::NoValidShares);
    }

    let profit_per_share = distributable
        .checked_div(total_shares)
        .ok_or_else(|| SettlementError::validation("profit per share is out of range"))?;
    stakes
        .iter()
        .map(|stake| {
            let amount = profit_per_share
                .checked_mul(stake.shares)
                .ok_or_else(|| share_overflow(stake.investment_id))?;
            Ok(Payout {
                investment_id: stake.investment_id,
                investor_id: stake.investor_id,
                shares: stake.shares,
                amount: round_money(amount),
            })
        })
        .collect()
}

fn share_overflow(investment_id: i64) -> SettlementError {
    SettlementError::validation(format!(
        "shares for investment {investment_id} are out of range"
    ))
}

impl SettlementEngine {
    /// Pay a declared profit out to the pitch's investors.
    ///
    /// Debiting the business wallet for the full distributable amount is the
    /// commit point; every precondition is checked before it and nothing is
    /// written if it fails. After it, investor credits, distribution rows and
    /// the transferred flag are best-effort and recorded in the journal when
    /// they fail.
    pub async fn distribute_profit(
        &self,
        owner_id: Uuid,
        profit_id: i64,
    ) -> SettlementResult<DistributionReport> {
        let _guard = self.locks.lock(format!("profit:{profit_id}")).await;

        let profit = self
            .repo
            .profit(profit_id)
            .await?
            .ok_or(SettlementError::NotFound("profit"))?;
        if profit.transferred {
            return Err(SettlementError::AlreadyDistributed);
        }

        let pitch = self.owned_pitch(owner_id, profit.pitch_id).await?;
        let distributable = profit.distributable_amount;
        if self.ledger.wallet_balance(owner_id).await? < distributable {
            return Err(SettlementError::InsufficientFunds);
        }

        let investments = self.repo.active_investments_for_pitch(pitch.id).await?;
        if investments.is_empty() {
            return Err(SettlementError::NoActiveInvestments);
        }
        let tiers = self.repo.tiers_for_pitch(pitch.id).await?;
        let stakes = weigh_investments(&investments, &tiers)?;
        let payouts = plan_payouts(distributable, &stakes)?;

        self.ledger
            .adjust_wallet_balance(owner_id, -distributable)
            .await?;

        let mut report = DistributionReport {
            profit_id,
            pitch_id: pitch.id,
            debited: distributable,
            paid: Vec::new(),
            unpaid: Vec::new(),
            unrecorded: Vec::new(),
        };

        for payout in payouts {
            let paid = match self
                .ledger
                .adjust_wallet_balance(payout.investor_id, payout.amount)
                .await
            {
                Ok(_) => true,
                Err(err) => {
                    self.record(
                        pitch.id,
                        SettlementEvent::InvestorCreditFailed {
                            profit_id,
                            investment_id: payout.investment_id,
                            investor_id: payout.investor_id,
                            amount: payout.amount,
                            reason: err.to_string(),
                        },
                    )
                    .await;
                    false
                }
            };

            let row = NewProfitDistribution {
                profit_id,
                investment_id: payout.investment_id,
                investor_id: payout.investor_id,
                shares: payout.shares,
                amount: payout.amount,
                paid,
            };
            if let Err(err) = self.repo.create_distribution(&row).await {
                self.record(
                    pitch.id,
                    SettlementEvent::DistributionRecordFailed {
                        profit_id,
                        investment_id: payout.investment_id,
                        investor_id: payout.investor_id,
                        amount: payout.amount,
                        paid,
                        reason: err.to_string(),
                    },
                )
                .await;
                report.unrecorded.push(payout.clone());
            }

            if paid {
                report.paid.push(payout);
            } else {
                report.unpaid.push(payout);
            }
        }

        if let Err(err) = self.repo.mark_profit_transferred(profit_id).await {
            self.record(
                pitch.id,
                SettlementEvent::ProfitTransferFlagStale {
                    profit_id,
                    reason: err.to_string(),
                },
            )
            .await;
        }

        if !report.unpaid.is_empty() {
            warn!(
                profit_id,
                unpaid = report.unpaid.len(),
                "profit distributed with uncredited investors"
            );
        }
        info!(
            profit_id,
            pitch_id = pitch.id,
            debited = %report.debited,
            credited = %report.credited(),
            investors = report.paid.len() + report.unpaid.len(),
            "profit distributed"
        );
        self.record(
            pitch.id,
            SettlementEvent::ProfitDistributed {
                profit_id,
                pitch_id: pitch.id,
                debited: report.debited,
                credited: report.credited(),
                investors_paid: report.paid.len(),
                investors_unpaid: report.unpaid.len(),
            },
        )
        .await;

        Ok(report)
    }

    pub async fn distributions_for_investor(
        &self,
        investor_id: Uuid,
    ) -> SettlementResult<Vec<ProfitDistribution>> {
        Ok(self.repo.distributions_for_investor(investor_id).await?)
    }
}
