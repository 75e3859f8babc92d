use duckdb::types::Value;
use serde_json::{Number, Value as JsonValue};

use crate::Row;

/// Render an engine value for JSON output.
///
/// Types without a natural JSON form (wide integers, decimals, temporal
/// values, blobs) fall back to a string.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(flag) => JsonValue::Bool(*flag),
        Value::TinyInt(v) => JsonValue::from(*v),
        Value::SmallInt(v) => JsonValue::from(*v),
        Value::Int(v) => JsonValue::from(*v),
        Value::BigInt(v) => JsonValue::from(*v),
        Value::UTinyInt(v) => JsonValue::from(*v),
        Value::USmallInt(v) => JsonValue::from(*v),
        Value::UInt(v) => JsonValue::from(*v),
        Value::UBigInt(v) => JsonValue::from(*v),
        Value::HugeInt(v) => JsonValue::String(v.to_string()),
        Value::Float(v) => float_to_json(f64::from(*v)),
        Value::Double(v) => float_to_json(*v),
        Value::Text(text) | Value::Enum(text) => JsonValue::String(text.clone()),
        Value::List(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        other => JsonValue::String(format!("{other:?}")),
    }
}

pub fn row_to_json(row: &Row) -> JsonValue {
    JsonValue::Array(row.iter().map(value_to_json).collect())
}

pub fn rows_to_json(rows: &[Row]) -> JsonValue {
    JsonValue::Array(rows.iter().map(row_to_json).collect())
}

fn float_to_json(value: f64) -> JsonValue {
    Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}
