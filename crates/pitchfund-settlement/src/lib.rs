//! Settlement engine: investment creation and refund, profit declaration,
//! and profit distribution to investors.

mod distribution;
mod engine;
mod investment;
mod portfolio;
mod profit;
mod tiers;

pub use distribution::{DistributionReport, Payout, Stake, plan_payouts, weigh_investments};
pub use engine::SettlementEngine;
pub use portfolio::{Portfolio, PortfolioItem};
pub use profit::ProfitDeclaration;
pub use tiers::select_tier;
