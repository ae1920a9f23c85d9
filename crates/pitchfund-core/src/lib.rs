pub mod error;
pub mod events;
pub mod identity;
pub mod models;
pub mod money;
pub mod repository;
pub mod storage;

pub use error::{SettlementError, SettlementResult, StoreError};
pub use events::SettlementEvent;
pub use identity::IdentityVerifier;
pub use models::{
    BankAccount, Investment, InvestmentTier, NewBankAccount, NewInvestment, NewProfit,
    NewProfitDistribution, Pitch, PitchStatus, Profile, Profit, ProfitDistribution, Role,
};
pub use repository::Repository;
pub use storage::{Condition, EventEnvelope, EventStore, Filter, RecordStore, Table};
