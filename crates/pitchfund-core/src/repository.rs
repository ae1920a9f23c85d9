use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    BankAccount, Investment, InvestmentTier, NewBankAccount, NewInvestment, NewProfit,
    NewProfitDistribution, Pitch, PitchStatus, Profile, Profit, ProfitDistribution,
};
use crate::storage::{Filter, RecordStore, Table};

type StoreResult<T> = Result<T, StoreError>;

/// Typed access to the tables the ledger and settlement engine touch.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn RecordStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        self.fetch(Table::Profile, &user_id.to_string()).await
    }

    pub async fn set_wallet_balance(&self, user_id: Uuid, balance: Decimal) -> StoreResult<()> {
        self.patch(
            Table::Profile,
            &user_id.to_string(),
            json!({ "dashboard_balance": balance }),
        )
        .await
    }

    /// First linked bank account for the user, if any.
    pub async fn bank_account_for(&self, owner_id: Uuid) -> StoreResult<Option<BankAccount>> {
        let filter = Filter::new()
            .eq("user_id", owner_id.to_string())
            .order_by("id", false);
        let accounts: Vec<BankAccount> = self.fetch_all(Table::BankAccount, &filter).await?;
        Ok(accounts.into_iter().next())
    }

    pub async fn bank_account(&self, id: i64) -> StoreResult<Option<BankAccount>> {
        self.fetch(Table::BankAccount, &id.to_string()).await
    }

    pub async fn create_bank_account(&self, account: &NewBankAccount) -> StoreResult<BankAccount> {
        self.create(Table::BankAccount, account).await
    }

    pub async fn set_bank_balance(&self, id: i64, balance: Decimal) -> StoreResult<()> {
        self.patch(
            Table::BankAccount,
            &id.to_string(),
            json!({ "balance": balance }),
        )
        .await
    }

    pub async fn delete_bank_account(&self, id: i64) -> StoreResult<()> {
        self.store
            .delete_by_id(Table::BankAccount, &id.to_string())
            .await
    }

    pub async fn pitch(&self, id: i64) -> StoreResult<Option<Pitch>> {
        self.fetch(Table::Pitch, &id.to_string()).await
    }

    pub async fn pitches_owned_by(&self, owner_id: Uuid) -> StoreResult<Vec<Pitch>> {
        let filter = Filter::new().eq("user_id", owner_id.to_string());
        self.fetch_all(Table::Pitch, &filter).await
    }

    pub async fn update_pitch_funding(
        &self,
        id: i64,
        raised_amount: Decimal,
        status: Option<PitchStatus>,
    ) -> StoreResult<()> {
        let mut patch = json!({ "raised_amount": raised_amount });
        if let Some(status) = status {
            patch["status"] = json!(status);
        }
        self.patch(Table::Pitch, &id.to_string(), patch).await
    }

    pub async fn tiers_for_pitch(&self, pitch_id: i64) -> StoreResult<Vec<InvestmentTier>> {
        let filter = Filter::new().eq("pitch_id", pitch_id);
        self.fetch_all(Table::InvestmentTier, &filter).await
    }

    pub async fn investment(&self, id: i64) -> StoreResult<Option<Investment>> {
        self.fetch(Table::Investments, &id.to_string()).await
    }

    pub async fn investments_for_investor(&self, investor_id: Uuid) -> StoreResult<Vec<Investment>> {
        let filter = Filter::new()
            .eq("investor_id", investor_id.to_string())
            .order_by("id", true);
        self.fetch_all(Table::Investments, &filter).await
    }

    pub async fn active_investments_for_investor(
        &self,
        investor_id: Uuid,
    ) -> StoreResult<Vec<Investment>> {
        let filter = Filter::new()
            .eq("investor_id", investor_id.to_string())
            .is("refunded", false)
            .order_by("id", true);
        self.fetch_all(Table::Investments, &filter).await
    }

    pub async fn active_investments_for_pitch(&self, pitch_id: i64) -> StoreResult<Vec<Investment>> {
        let filter = Filter::new().eq("pitch_id", pitch_id).is("refunded", false);
        self.fetch_all(Table::Investments, &filter).await
    }

    pub async fn create_investment(&self, investment: &NewInvestment) -> StoreResult<Investment> {
        self.create(Table::Investments, investment).await
    }

    pub async fn mark_investment_refunded(&self, id: i64) -> StoreResult<()> {
        self.patch(
            Table::Investments,
            &id.to_string(),
            json!({ "refunded": true }),
        )
        .await
    }

    pub async fn profit(&self, id: i64) -> StoreResult<Option<Profit>> {
        self.fetch(Table::Profits, &id.to_string()).await
    }

    pub async fn profits_for_pitches(&self, pitch_ids: &[i64]) -> StoreResult<Vec<Profit>> {
        if pitch_ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::new()
            .in_list("pitch_id", pitch_ids.iter().copied())
            .order_by("id", false);
        self.fetch_all(Table::Profits, &filter).await
    }

    pub async fn create_profit(&self, profit: &NewProfit) -> StoreResult<Profit> {
        self.create(Table::Profits, profit).await
    }

    pub async fn mark_profit_transferred(&self, id: i64) -> StoreResult<()> {
        self.patch(
            Table::Profits,
            &id.to_string(),
            json!({ "transferred": true }),
        )
        .await
    }

    pub async fn create_distribution(
        &self,
        distribution: &NewProfitDistribution,
    ) -> StoreResult<ProfitDistribution> {
        self.create(Table::ProfitDistributions, distribution).await
    }

    pub async fn distributions_for_investor(
        &self,
        investor_id: Uuid,
    ) -> StoreResult<Vec<ProfitDistribution>> {
        let filter = Filter::new().eq("investor_id", investor_id.to_string());
        self.fetch_all(Table::ProfitDistributions, &filter).await
    }

    async fn fetch<T: DeserializeOwned>(&self, table: Table, id: &str) -> StoreResult<Option<T>> {
        match self.store.get_by_id(table, id).await? {
            Some(row) => decode(table, row).map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_all<T: DeserializeOwned>(&self, table: Table, filter: &Filter) -> StoreResult<Vec<T>> {
        self.store
            .get_by_query(table, filter)
            .await?
            .into_iter()
            .map(|row| decode(table, row))
            .collect()
    }

    async fn create<T, N>(&self, table: Table, row: &N) -> StoreResult<T>
    where
        T: DeserializeOwned,
        N: Serialize + Sync,
    {
        let row = serde_json::to_value(row).map_err(|err| StoreError::Decode {
            table: table.name(),
            message: err.to_string(),
        })?;
        let inserted = self.store.insert(table, row).await?;
        decode(table, inserted)
    }

    async fn patch(&self, table: Table, id: &str, patch: Value) -> StoreResult<()> {
        self.store.update_by_id(table, id, patch).await.map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(table: Table, row: Value) -> StoreResult<T> {
    serde_json::from_value(row).map_err(|err| StoreError::Decode {
        table: table.name(),
        message: err.to_string(),
    })
}
