use async_trait::async_trait;
use pitchfund_core::{Condition, Filter, RecordStore, StoreError, Table};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;

/// [`RecordStore`] over a PostgREST-style HTTP API.
#[derive(Clone)]
pub struct RestRecordStore {
    client: Client,
    base_url: String,
    service_key: String,
}

impl RestRecordStore {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn endpoint(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        self.client
            .request(method, self.endpoint(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn rows(&self, table: Table, request: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        debug!(table = table.name(), %status, "record store response");

        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: truncate(&body, 256).to_string(),
            });
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&body) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(row @ Value::Object(_)) => Ok(vec![row]),
            Ok(other) => Err(StoreError::Decode {
                table: table.name(),
                message: format!("expected rows, got {other}"),
            }),
            Err(err) => Err(StoreError::Decode {
                table: table.name(),
                message: err.to_string(),
            }),
        }
    }

    async fn single(
        &self,
        table: Table,
        id: &str,
        request: RequestBuilder,
    ) -> Result<Value, StoreError> {
        self.rows(table, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::MissingRow {
                table: table.name(),
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn get_by_id(&self, table: Table, id: &str) -> Result<Option<Value>, StoreError> {
        let request = self
            .request(Method::GET, table)
            .query(&[("id", format!("eq.{id}")), ("limit", "1".to_string())]);
        Ok(self.rows(table, request).await?.into_iter().next())
    }

    async fn get_by_query(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let request = self
            .request(Method::GET, table)
            .query(&query_params(filter));
        self.rows(table, request).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&row);
        self.single(table, "<new>", request).await
    }

    async fn update_by_id(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let request = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))])
            .json(&patch);
        self.single(table, id, request).await
    }

    async fn delete_by_id(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let request = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))]);
        self.single(table, id, request).await.map(|_| ())
    }
}

/// Render a [`Filter`] as PostgREST query parameters.
pub fn query_params(filter: &Filter) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = filter
        .conditions
        .iter()
        .map(|condition| match condition {
            Condition::Eq(column, value) => (column.clone(), format!("eq.{}", literal(value))),
            Condition::Is(column, value) => (column.clone(), format!("is.{value}")),
            Condition::In(column, values) => {
                let list: Vec<String> = values.iter().map(literal).collect();
                (column.clone(), format!("in.({})", list.join(",")))
            }
        })
        .collect();

    if let Some(order) = &filter.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    params
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}
