//! Fixed-point helpers shared by the ledger and the settlement engine.

use rust_decimal::{Decimal, RoundingStrategy};

/// Minor-unit precision of every persisted monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Round half-up to two decimal places.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * percent / 100`, unrounded. `None` if the product overflows.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount
        .checked_mul(percent)?
        .checked_div(Decimal::ONE_HUNDRED)
}

pub fn is_whole_units(amount: Decimal) -> bool {
    amount.fract().is_zero()
}
