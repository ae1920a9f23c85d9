use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvestmentRequest {
    pub pitch_id: i64,
    pub amount: Decimal,
}

/// Body of `PATCH /investments?id=`. Only `{"refunded": true}` is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInvestmentRequest {
    #[serde(default)]
    pub refunded: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvestmentQuery {
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclareProfitRequest {
    pub pitch_id: i64,
    pub total_profit: Decimal,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfitQuery {
    pub id: Option<i64>,
    pub pitch_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributeQuery {
    pub profit_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalQuery {
    pub pitch_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAmountRequest {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalanceResponse {
    pub dashboard_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBankAccountRequest {
    pub account_holder_name: String,
    pub sort_code: String,
    pub account_number: String,
    #[serde(default)]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBankBalanceRequest {
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankBalanceResponse {
    pub balance: Decimal,
}
