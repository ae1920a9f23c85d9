use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use pitchfund_core::{Condition, Filter, RecordStore, StoreError, Table};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Record store held in process memory.
///
/// Rows without an `id` get the next serial id of their table. Writes can be
/// made to fail on purpose with [`InMemoryRecordStore::fail_writes`], which
/// tests use to exercise the best-effort paths of settlement.
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    sequences: RwLock<HashMap<Table, i64>>,
    failing: RwLock<Vec<WriteFault>>,
}

#[derive(Debug, Clone, PartialEq)]
struct WriteFault {
    table: Table,
    id: Option<String>,
    matching: Option<(String, Value)>,
}

impl WriteFault {
    fn applies(&self, table: Table, id: Option<&str>, row: Option<&Value>) -> bool {
        if self.table != table {
            return false;
        }
        if let Some(expected) = &self.id
            && id != Some(expected.as_str())
        {
            return false;
        }
        match (&self.matching, row) {
            (Some((column, value)), Some(row)) => row
                .get(column)
                .is_some_and(|actual| loosely_equal(actual, value)),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every insert, update or delete against `table`, or only those
    /// addressed to row `id` when one is given.
    pub async fn fail_writes(&self, table: Table, id: Option<&str>) {
        self.failing.write().await.push(WriteFault {
            table,
            id: id.map(str::to_string),
            matching: None,
        });
    }

    /// Reject writes against `table` whose row carries `column = value`.
    pub async fn fail_writes_where(&self, table: Table, column: &str, value: impl Into<Value>) {
        self.failing.write().await.push(WriteFault {
            table,
            id: None,
            matching: Some((column.to_string(), value.into())),
        });
    }

    pub async fn clear_faults(&self) {
        self.failing.write().await.clear();
    }

    pub async fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    async fn check_fault(&self, table: Table, id: Option<&str>, row: Option<&Value>) -> Result<(), StoreError> {
        let failing = self.failing.read().await;
        if failing.iter().any(|fault| fault.applies(table, id, row)) {
            return Err(StoreError::Rejected {
                status: 503,
                body: format!("injected write failure on {}", table.name()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_by_id(&self, table: Table, id: &str) -> Result<Option<Value>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table)
            .and_then(|rows| rows.iter().find(|row| row_has_id(row, id)))
            .cloned())
    }

    async fn get_by_query(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter.conditions.iter().all(|condition| satisfies(row, condition)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &filter.order {
            rows.sort_by(|left, right| {
                let ordering = compare_values(left.get(&order.column), right.get(&order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = row else {
            return Err(StoreError::Rejected {
                status: 400,
                body: format!("{} rows must be JSON objects", table.name()),
            });
        };
        let candidate = Value::Object(fields.clone());
        self.check_fault(table, None, Some(&candidate)).await?;

        if fields.get("id").is_none_or(Value::is_null) {
            let mut sequences = self.sequences.write().await;
            let next = sequences.entry(table).or_insert(0);
            *next += 1;
            fields.insert("id".to_string(), Value::from(*next));
        }

        let stored = Value::Object(fields);
        let mut tables = self.tables.write().await;
        tables.entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn update_by_id(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::Rejected {
                status: 400,
                body: "patch must be a JSON object".to_string(),
            });
        };

        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row_has_id(row, id)))
            .ok_or_else(|| StoreError::MissingRow {
                table: table.name(),
                id: id.to_string(),
            })?;
        self.check_fault(table, Some(id), Some(&*row)).await?;

        if let Value::Object(fields) = row {
            merge(fields, patch);
        }
        Ok(row.clone())
    }

    async fn delete_by_id(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.check_fault(table, Some(id), None).await?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !row_has_id(row, id));
        if rows.len() == before {
            return Err(StoreError::MissingRow {
                table: table.name(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn merge(fields: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (column, value) in patch {
        fields.insert(column, value);
    }
}

fn row_has_id(row: &Value, id: &str) -> bool {
    row.get("id").and_then(as_text).is_some_and(|value| value == id)
}

fn satisfies(row: &Value, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(column, expected) => row
            .get(column)
            .is_some_and(|actual| loosely_equal(actual, expected)),
        Condition::Is(column, expected) => row.get(column) == Some(&Value::Bool(*expected)),
        Condition::In(column, candidates) => row.get(column).is_some_and(|actual| {
            candidates
                .iter()
                .any(|candidate| loosely_equal(actual, candidate))
        }),
    }
}

/// Equality the way a SQL-backed REST store compares a column to a query
/// parameter: numbers and their string forms are the same value.
fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    if let (Some(left), Some(right)) = (as_number(actual), as_number(expected)) {
        return left == right;
    }
    matches!((as_text(actual), as_text(expected)), (Some(left), Some(right)) if left == right)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse::<f64>().ok(),
        _ => None,
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => match (as_number(left), as_number(right)) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            _ => as_text(left).cmp(&as_text(right)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new();
        for (pitch_id, amount, refunded) in [(1, 100, false), (1, 250, true), (2, 75, false)] {
            store
                .insert(
                    Table::Investments,
                    json!({ "pitch_id": pitch_id, "amount": amount, "refunded": refunded }),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn assigns_serial_ids_per_table() {
        let store = seeded().await;
        let tier = store
            .insert(Table::InvestmentTier, json!({ "pitch_id": 1 }))
            .await
            .unwrap();
        let explicit = store
            .insert(Table::Profile, json!({ "id": "abc", "role": "investor" }))
            .await
            .unwrap();

        assert_eq!(tier["id"], json!(1));
        assert_eq!(explicit["id"], json!("abc"));
        assert!(store.get_by_id(Table::Investments, "3").await.unwrap().is_some());
        assert!(store.get_by_id(Table::Investments, "4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filters_and_orders_rows() {
        let store = seeded().await;

        let active = store
            .get_by_query(
                Table::Investments,
                &Filter::new().eq("pitch_id", "1").is("refunded", false),
            )
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["amount"], json!(100));

        let newest_first = store
            .get_by_query(
                Table::Investments,
                &Filter::new().in_list("pitch_id", [1, 2]).order_by("id", true),
            )
            .await
            .unwrap();
        let ids: Vec<Value> = newest_first.iter().map(|row| row["id"].clone()).collect();
        assert_eq!(ids, vec![json!(3), json!(2), json!(1)]);
    }

    #[tokio::test]
    async fn updates_merge_and_missing_rows_fail() {
        let store = seeded().await;

        let updated = store
            .update_by_id(Table::Investments, "1", json!({ "refunded": true }))
            .await
            .unwrap();
        assert_eq!(updated["refunded"], json!(true));
        assert_eq!(updated["amount"], json!(100));

        let missing = store
            .update_by_id(Table::Investments, "42", json!({ "refunded": true }))
            .await;
        assert!(matches!(missing, Err(StoreError::MissingRow { .. })));

        store.delete_by_id(Table::Investments, "1").await.unwrap();
        assert!(store.get_by_id(Table::Investments, "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_faults_reject_targeted_writes_only() {
        let store = seeded().await;
        store.fail_writes(Table::Investments, Some("2")).await;
        store
            .fail_writes_where(Table::ProfitDistributions, "investment_id", 2)
            .await;

        assert!(
            store
                .update_by_id(Table::Investments, "2", json!({ "refunded": false }))
                .await
                .is_err()
        );
        assert!(
            store
                .update_by_id(Table::Investments, "1", json!({ "refunded": true }))
                .await
                .is_ok()
        );
        assert!(
            store
                .insert(Table::ProfitDistributions, json!({ "investment_id": 2 }))
                .await
                .is_err()
        );
        assert!(
            store
                .insert(Table::ProfitDistributions, json!({ "investment_id": 1 }))
                .await
                .is_ok()
        );

        store.clear_faults().await;
        assert!(
            store
                .update_by_id(Table::Investments, "2", json!({ "refunded": false }))
                .await
                .is_ok()
        );
    }
}
