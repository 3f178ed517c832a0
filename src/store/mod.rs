//! Access to the clinic's tables and server-side procedures.
//!
//! Handlers talk to a [`Store`]: a small PostgREST-shaped query surface over
//! JSON rows. [`rest::RestStore`] forwards it to the hosted backend,
//! [`local::LocalStore`] keeps everything in an embedded sled database.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{cmp::Ordering, sync::Arc};

use crate::config::{BackendConfig, BackendKind};

pub mod local;
pub mod rest;

pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("local database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("row encoding error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("duplicate key {id} in {table}")]
    Duplicate { table: String, id: String },
    #[error("unknown procedure {0}")]
    UnknownProcedure(String),
    #[error("invalid row: {0}")]
    InvalidRow(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Selection over a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn is_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Whether `row` satisfies every filter of this query.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq(column, expected) => row
                .get(column)
                .is_some_and(|actual| values_match(actual, expected)),
            Filter::In(column, candidates) => row
                .get(column)
                .is_some_and(|actual| candidates.iter().any(|c| values_match(actual, c))),
        })
    }

    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for order in &self.order {
            let ord = compare_values(a.get(&order.column), b.get(&order.column));
            let ord = if order.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Text form of a scalar, as it appears in a URL filter.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Path parameters arrive as text, so `"7"` matches a numeric id of `7`.
fn values_match(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => scalar_text(actual) == scalar_text(expected),
    }
}

/// Nulls compare greater than any value, as in Postgres.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => scalar_text(x).cmp(&scalar_text(y)),
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Inserts `rows` into `table` and returns them as stored.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError>;

    /// Applies `patch` to every row matching `query`; returns the updated rows.
    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError>;

    /// Deletes every row matching `query`; returns the deleted rows.
    async fn delete(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// The standard client plus, when configured, an elevated-privilege client
/// that bypasses row-level restrictions for admin writes.
#[derive(Clone)]
pub struct Database {
    standard: Arc<dyn Store>,
    privileged: Option<Arc<dyn Store>>,
}

impl Database {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            standard: store,
            privileged: None,
        }
    }

    pub fn with_privileged(mut self, privileged: Option<Arc<dyn Store>>) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn client(&self) -> &dyn Store {
        self.standard.as_ref()
    }

    /// Privileged client when available, else the standard one.
    pub fn admin_client(&self) -> &dyn Store {
        self.privileged.as_deref().unwrap_or(self.standard.as_ref())
    }
}

/// Opens the backend selected by configuration. For the hosted backend the
/// service-role key, when present, becomes the privileged client.
pub fn connect(backend: &BackendConfig) -> Result<Database, StoreError> {
    match backend.kind {
        BackendKind::Local => Ok(Database::new(Arc::new(local::LocalStore::open(&backend.db_path)?))),
        BackendKind::Rest => {
            let standard = rest::RestStore::new(&backend.rest_url, &backend.anon_key, backend.timeout)?;
            let privileged = match &backend.service_key {
                Some(key) => Some(Arc::new(rest::RestStore::new(&backend.rest_url, key, backend.timeout)?) as Arc<dyn Store>),
                None => None,
            };
            Ok(Database::new(Arc::new(standard)).with_privileged(privileged))
        }
    }
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidRow(format!("expected an object, got {other}"))),
    }
}

/// `to_row` without null columns, so inserts fall back to column defaults.
pub fn to_insert_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    let mut row = to_row(value)?;
    row.retain(|_, v| !v.is_null());
    Ok(row)
}

/// Patch holding only the fields that were present in a request body.
pub fn patch_of(fields: Vec<(&'static str, Option<Value>)>) -> Row {
    fields
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column.to_string(), v)))
        .collect()
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(StoreError::from))
        .collect()
}

/// First row of a procedure result. Set-returning procedures answer with an
/// array, scalar-row ones with a bare object.
pub fn first_of<T: DeserializeOwned>(result: Value) -> Result<Option<T>, StoreError> {
    let row = match result {
        Value::Array(rows) => rows.into_iter().next(),
        Value::Null => None,
        other => Some(other),
    };
    row.map(serde_json::from_value).transpose().map_err(StoreError::from)
}

pub async fn fetch<T: DeserializeOwned>(store: &dyn Store, query: &Query) -> Result<Vec<T>, StoreError> {
    decode_rows(store.select(query).await?)
}

pub async fn fetch_one<T: DeserializeOwned>(store: &dyn Store, query: Query) -> Result<Option<T>, StoreError> {
    Ok(fetch(store, &query.limit(1)).await?.into_iter().next())
}
