use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::events::SettlementEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profile,
    BankAccount,
    Pitch,
    InvestmentTier,
    Investments,
    Profits,
    ProfitDistributions,
    SettlementEvents,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Profile => "profile",
            Table::BankAccount => "bank_account",
            Table::Pitch => "pitch",
            Table::InvestmentTier => "investment_tier",
            Table::Investments => "investments",
            Table::Profits => "profits",
            Table::ProfitDistributions => "profit_distributions",
            Table::SettlementEvents => "settlement_events",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    Is(String, bool),
    In(String, Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// Row filter understood by every [`RecordStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub order: Option<Order>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    pub fn is(mut self, column: &str, value: bool) -> Self {
        self.conditions.push(Condition::Is(column.to_string(), value));
        self
    }

    pub fn in_list<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending,
        });
        self
    }
}

/// Keyed row access over named tables.
///
/// Single-row reads and writes are atomic; there are no multi-row
/// transactions.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_by_id(&self, table: Table, id: &str) -> Result<Option<Value>, StoreError>;
    async fn get_by_query(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, StoreError>;
    /// Insert a row and return it as stored, including the generated `id`.
    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError>;
    async fn update_by_id(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError>;
    async fn delete_by_id(&self, table: Table, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub sequence: i64,
    pub stream: String,
    pub event: SettlementEvent,
    pub stored_at: DateTime<Utc>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, stream: &str, event: SettlementEvent) -> anyhow::Result<EventEnvelope>;
    async fn stream(&self, stream: &str) -> anyhow::Result<Vec<EventEnvelope>>;
}
