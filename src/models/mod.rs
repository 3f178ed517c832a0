pub mod auth_types;
pub mod booking;
pub mod catalogue;
pub mod gallery;
pub mod settings;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Primary key as the backend hands it out: serial integers for some
/// tables, text for others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(n) => write!(f, "{n}"),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

fn yes() -> bool {
    true
}

/// Postgres `numeric` and `bigint` columns may come back as floats or
/// strings; money amounts here are whole rupiah.
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        _ => None,
    }
}

pub(crate) fn de_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_i64(&value).unwrap_or(0))
}

pub(crate) fn de_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lenient_i64))
}

/// `None` when the field is absent, `Some(None)` for an explicit `null`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A partial update tried to null or blank out a NOT NULL column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("kolom {0} tidak boleh kosong")]
pub struct NullColumn(pub &'static str);

/// Patch value for a nullable column.
pub(crate) fn set_nullable<T: Into<Value>>(value: Option<Option<T>>) -> Option<Value> {
    value.map(Value::from)
}

/// Patch value for a NOT NULL column.
pub(crate) fn set_required<T: Into<Value>>(
    column: &'static str,
    value: Option<Option<T>>,
) -> Result<Option<Value>, NullColumn> {
    match value {
        None => Ok(None),
        Some(None) => Err(NullColumn(column)),
        Some(Some(v)) => Ok(Some(v.into())),
    }
}

/// Like [`set_required`], and a blank string counts as null.
pub(crate) fn set_required_text(
    column: &'static str,
    value: Option<Option<String>>,
) -> Result<Option<Value>, NullColumn> {
    let value = value.map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
    set_required(column, value)
}
