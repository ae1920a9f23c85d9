use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Investor,
    Business,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Investor => "investor",
            Role::Business => "business",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub role: Role,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub dashboard_balance: Option<Decimal>,
}

impl Profile {
    /// Wallet balance, with an unset column read as zero.
    pub fn wallet_balance(&self) -> Decimal {
        self.dashboard_balance.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: i64,
    #[serde(rename = "user_id")]
    pub owner_id: Uuid,
    pub account_holder_name: String,
    pub sort_code: String,
    pub account_number: String,
    pub balance: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBankAccount {
    #[serde(rename = "user_id")]
    pub owner_id: Uuid,
    pub account_holder_name: String,
    pub sort_code: String,
    pub account_number: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PitchStatus {
    Draft,
    Active,
    Funded,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pitch {
    pub id: i64,
    #[serde(rename = "user_id")]
    pub owner_id: Uuid,
    #[serde(default)]
    pub title: String,
    pub target_amount: Decimal,
    #[serde(default)]
    pub raised_amount: Decimal,
    pub status: PitchStatus,
    pub profit_share_percent: Decimal,
}

impl Pitch {
    pub fn is_accepting_investments(&self) -> bool {
        self.status == PitchStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentTier {
    pub id: i64,
    pub pitch_id: i64,
    #[serde(default)]
    pub name: String,
    pub min_amount: Decimal,
    pub multiplier: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    pub id: i64,
    pub pitch_id: i64,
    pub investor_id: Uuid,
    #[serde(default)]
    pub tier_id: Option<i64>,
    pub amount: Decimal,
    #[serde(default)]
    pub refunded: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewInvestment {
    pub pitch_id: i64,
    pub investor_id: Uuid,
    pub tier_id: i64,
    pub amount: Decimal,
    pub refunded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profit {
    pub id: i64,
    pub pitch_id: i64,
    pub declared_by: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_profit: Decimal,
    pub distributable_amount: Decimal,
    #[serde(default)]
    pub transferred: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProfit {
    pub pitch_id: i64,
    pub declared_by: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_profit: Decimal,
    pub distributable_amount: Decimal,
    pub transferred: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitDistribution {
    pub id: i64,
    pub profit_id: i64,
    pub investment_id: i64,
    pub investor_id: Uuid,
    pub shares: Decimal,
    pub amount: Decimal,
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProfitDistribution {
    pub profit_id: i64,
    pub investment_id: i64,
    pub investor_id: Uuid,
    pub shares: Decimal,
    pub amount: Decimal,
    pub paid: bool,
}
