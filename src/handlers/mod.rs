pub mod auth;
pub mod bookings;
pub mod gallery;
pub mod services;
pub mod settings;

use serde_json::Value;

/// PostgREST answers boolean procedures with a bare scalar, but a row or a
/// one-element array is accepted too.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(items) => items.first().is_some_and(is_truthy),
        Value::Object(map) => map.values().next().is_some_and(is_truthy),
    }
}
