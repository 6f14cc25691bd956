//! Materialized query results.
//!
//! Every engine row is converted into a JSON object keyed by column name.
//! Values are decoded by trying the engine's common Rust types in turn;
//! a value no decoder accepts becomes `null`.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row};
use std::fmt;

/// One result row.
pub type Record = Map<String, Value>;

/// The rows returned by a single query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// Column names in result order.
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
    /// Set when rows were dropped to honour the row cap.
    pub truncated: bool,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw JSON text of the rows, as handed to summarization.
    pub fn to_json(&self) -> String {
        Value::Array(self.rows.iter().cloned().map(Value::Object).collect()).to_string()
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

pub(crate) fn column_names<R: Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn json_or_null<T>(value: Option<T>, convert: impl FnOnce(T) -> Value) -> Value {
    value.map(convert).unwrap_or(Value::Null)
}

fn bytes_to_json(bytes: Vec<u8>) -> Value {
    Value::String(String::from_utf8_lossy(&bytes).into_owned())
}

pub(crate) fn pg_record(row: &PgRow) -> Record {
    let mut record = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            json_or_null(v, Value::Bool)
        } else if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            json_or_null(v, |f| Value::from(f64::from(f)))
        } else if let Ok(v) = row.try_get::<Option<BigDecimal>, _>(idx) {
            json_or_null(v, |d| Value::String(d.to_string()))
        } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            json_or_null(v, Value::String)
        } else if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            json_or_null(v, |t| Value::String(t.to_rfc3339()))
        } else if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            json_or_null(v, |t| Value::String(t.to_string()))
        } else if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
            json_or_null(v, |t| Value::String(t.to_string()))
        } else if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
            json_or_null(v, |t| Value::String(t.to_string()))
        } else if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(idx) {
            json_or_null(v, |u| Value::String(u.to_string()))
        } else if let Ok(v) = row.try_get::<Option<Value>, _>(idx) {
            v.unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            json_or_null(v, bytes_to_json)
        } else {
            Value::Null
        };
        record.insert(col.name().to_string(), value);
    }
    record
}

pub(crate) fn mysql_record(row: &MySqlRow) -> Record {
    let mut record = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<u32>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<u16>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<u8>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            json_or_null(v, Value::Bool)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            json_or_null(v, |f| Value::from(f64::from(f)))
        } else if let Ok(v) = row.try_get::<Option<BigDecimal>, _>(idx) {
            json_or_null(v, |d| Value::String(d.to_string()))
        } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            json_or_null(v, Value::String)
        } else if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            json_or_null(v, |t| Value::String(t.to_rfc3339()))
        } else if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            json_or_null(v, |t| Value::String(t.to_string()))
        } else if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
            json_or_null(v, |t| Value::String(t.to_string()))
        } else if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
            json_or_null(v, |t| Value::String(t.to_string()))
        } else if let Ok(v) = row.try_get::<Option<Value>, _>(idx) {
            v.unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            json_or_null(v, bytes_to_json)
        } else {
            Value::Null
        };
        record.insert(col.name().to_string(), value);
    }
    record
}

pub(crate) fn sqlite_record(row: &SqliteRow) -> Record {
    let mut record = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        // Integers first: SQLite reports booleans as integers.
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            json_or_null(v, Value::from)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            json_or_null(v, Value::String)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            json_or_null(v, Value::Bool)
        } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            json_or_null(v, bytes_to_json)
        } else {
            Value::Null
        };
        record.insert(col.name().to_string(), value);
    }
    record
}
