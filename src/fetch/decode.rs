use serde_json::Value;

use crate::error::{AppError, Result};
use crate::records::Table;

use super::FetchOutcome;

/// Extract a row count from `{"count": n}` or a bare number.
pub fn decode_count(value: &Value) -> Result<u64> {
    let raw = match value {
        Value::Object(map) => map.get("count").ok_or_else(|| {
            AppError::message("count response is missing the `count` field")
        })?,
        other => other,
    };

    match raw {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| AppError::message(format!("count `{n}` is not a row count"))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::message(format!("count `{s}` is not a row count"))),
        other => Err(AppError::message(format!(
            "unexpected count payload: {other}"
        ))),
    }
}

/// Interpret a query response. Anything that is not a well-formed table is unusable.
pub fn decode_query(value: Value) -> FetchOutcome {
    match decode_table(value) {
        Ok(table) => FetchOutcome::Usable(table),
        Err(reason) => FetchOutcome::Unusable(reason),
    }
}

/// Metadata listings must always be tables; a malformed one is an error.
pub fn decode_listing(value: Value, what: &str) -> Result<Table> {
    decode_table(value)
        .map_err(|reason| AppError::message(format!("malformed {what} listing: {reason}")))
}

pub fn decode_table(value: Value) -> std::result::Result<Table, String> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Err(format!("expected a table object, got {}", kind_of(&other))),
    };

    let columns = match map.remove("columns") {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                other => Err(format!("column name {other} is not a string")),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
        Some(other) => return Err(format!("`columns` is {}", kind_of(&other))),
        None => return Err("missing `columns`".to_string()),
    };

    let rows = match map.remove("rows") {
        Some(Value::Array(items)) => items,
        Some(other) => return Err(format!("`rows` is {}", kind_of(&other))),
        None => return Err("missing `rows`".to_string()),
    };

    let mut decoded = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        match row {
            Value::Array(cells) if cells.len() == columns.len() => decoded.push(cells),
            Value::Array(cells) => {
                return Err(format!(
                    "row {idx} has {} cells for {} columns",
                    cells.len(),
                    columns.len()
                ))
            }
            other => return Err(format!("row {idx} is {}", kind_of(&other))),
        }
    }

    Ok(Table::new(columns, decoded))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
