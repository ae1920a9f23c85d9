use pitchfund_core::InvestmentTier;
use rust_decimal::Decimal;

/// The tier with the highest `min_amount` that `amount` still reaches.
pub fn select_tier(tiers: &[InvestmentTier], amount: Decimal) -> Option<&InvestmentTier> {
    tiers
        .iter()
        .filter(|tier| tier.min_amount <= amount)
        .max_by(|left, right| left.min_amount.cmp(&right.min_amount))
}
