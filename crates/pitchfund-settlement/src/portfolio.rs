use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pitchfund_core::{InvestmentTier, Pitch, PitchStatus, SettlementResult};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::SettlementEngine;

#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub investor_id: Uuid,
    pub items: Vec<PortfolioItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioItem {
    pub investment_id: i64,
    pub pitch_id: i64,
    pub pitch_title: String,
    pub target_amount: Decimal,
    pub raised_amount: Decimal,
    pub status: Option<PitchStatus>,
    pub amount: Decimal,
    pub multiplier: Decimal,
    pub total_profit: Decimal,
    pub roi: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}

impl SettlementEngine {
    /// Non-refunded investments, newest first, with the profit each has
    /// received so far.
    pub async fn portfolio(&self, investor_id: Uuid) -> SettlementResult<Portfolio> {
        let investments = self.repo.active_investments_for_investor(investor_id).await?;

        let mut received: HashMap<i64, Decimal> = HashMap::new();
        for distribution in self.repo.distributions_for_investor(investor_id).await? {
            let total = received.entry(distribution.investment_id).or_default();
            *total = total.saturating_add(distribution.amount);
        }

        let mut pitches: HashMap<i64, Option<Pitch>> = HashMap::new();
        let mut tiers: HashMap<i64, Vec<InvestmentTier>> = HashMap::new();
        let mut items = Vec::with_capacity(investments.len());

        for investment in investments {
            if !pitches.contains_key(&investment.pitch_id) {
                let pitch = self.repo.pitch(investment.pitch_id).await?;
                pitches.insert(investment.pitch_id, pitch);
            }
            if !tiers.contains_key(&investment.pitch_id) {
                let pitch_tiers = self.repo.tiers_for_pitch(investment.pitch_id).await?;
                tiers.insert(investment.pitch_id, pitch_tiers);
            }

            let pitch = pitches.get(&investment.pitch_id).and_then(Option::as_ref);
            let multiplier = tiers
                .get(&investment.pitch_id)
                .and_then(|pitch_tiers| {
                    pitch_tiers
                        .iter()
                        .find(|tier| Some(tier.id) == investment.tier_id)
                })
                .map(|tier| tier.multiplier)
                .unwrap_or_default();
            let total_profit = received
                .get(&investment.id)
                .copied()
                .unwrap_or_default();
            let roi = if investment.amount > Decimal::ZERO {
                total_profit.checked_div(investment.amount).unwrap_or_default()
            } else {
                Decimal::ZERO
            };

            items.push(PortfolioItem {
                investment_id: investment.id,
                pitch_id: investment.pitch_id,
                pitch_title: pitch.map(|p| p.title.clone()).unwrap_or_default(),
                target_amount: pitch.map(|p| p.target_amount).unwrap_or_default(),
                raised_amount: pitch.map(|p| p.raised_amount).unwrap_or_default(),
                status: pitch.map(|p| p.status),
                amount: investment.amount,
                multiplier,
                total_profit,
                roi,
                created_at: investment.created_at,
            });
        }

        Ok(Portfolio { investor_id, items })
    }
}
