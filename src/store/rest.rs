//! Reqwest-backed client for a hosted PostgREST-compatible backend.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

use super::{scalar_text, Filter, Query, Row, Store, StoreError};

const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Clone)]
pub struct RestStore {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// `base_url` is the project root, e.g. `https://xyz.supabase.co`.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn rows(response: Response) -> Result<Vec<Row>, StoreError> {
        let response = check_status(response).await?;
        Ok(response.json::<Vec<Row>>().await?)
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), %body, "backend rejected request");
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

/// PostgREST query-string parameters for `query`.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        match filter {
            Filter::Eq(column, value) => {
                params.push((column.clone(), format!("eq.{}", scalar_text(value))));
            }
            Filter::In(column, values) => {
                let list = values
                    .iter()
                    .map(|v| quote_list_item(&scalar_text(v)))
                    .collect::<Vec<_>>()
                    .join(",");
                params.push((column.clone(), format!("in.({list})")));
            }
        }
    }
    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn quote_list_item(item: &str) -> String {
    format!("\"{}\"", item.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl Store for RestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let response = self
            .request(Method::GET, self.table_url(&query.table))
            .query(&query_params(query))
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        let response = self
            .request(Method::POST, self.table_url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&rows)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        let response = self
            .request(Method::PATCH, self.table_url(&query.table))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&query_params(query))
            .json(&patch)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let response = self
            .request(Method::DELETE, self.table_url(&query.table))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&query_params(query))
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let response = self.request(Method::POST, url).json(&args).send().await?;
        let response = check_status(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self
            .request(Method::GET, format!("{}/rest/v1/", self.base_url))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}
