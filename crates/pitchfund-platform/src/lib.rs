pub mod config;
pub mod contracts;
pub mod db;
pub mod identity;
pub mod redis_bus;
pub mod rest_store;

pub use config::{RecordStoreConfig, ServiceConfig};
pub use contracts::{
    BankBalanceResponse, CreateBankAccountRequest, CreateInvestmentRequest, DeclareProfitRequest,
    DistributeQuery, InvestmentQuery, JournalQuery, ProfitQuery, UpdateBankBalanceRequest,
    UpdateInvestmentRequest, WalletAmountRequest, WalletBalanceResponse,
};
pub use db::connect_record_store;
pub use identity::Hs256Verifier;
pub use redis_bus::{PublishingEventStore, RedisBus, SETTLEMENT_CHANNEL};
pub use rest_store::RestRecordStore;
