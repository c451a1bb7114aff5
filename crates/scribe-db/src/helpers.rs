//! Row parsing and value conversion helpers.
//!
//! Converts between libSQL values and `FieldValue`, quotes identifiers taken
//! from the entity registry, and handles the dual datetime format issue
//! (`SQLite`'s `datetime('now')` vs Rust's `to_rfc3339()`).

use chrono::{DateTime, Utc};
use scribe_core::FieldValue;

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Parse a TEXT column with `FromStr`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the text does not parse.
pub fn parse_text<T>(s: &str) -> Result<T, DatabaseError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| DatabaseError::Query(format!("Failed to parse '{s}': {e}")))
}

/// Convert a field value into a bind parameter. Booleans bind as 0/1.
#[must_use]
pub fn to_sql_value(value: &FieldValue) -> libsql::Value {
    match value {
        FieldValue::Null => libsql::Value::Null,
        FieldValue::Bool(b) => libsql::Value::Integer(i64::from(*b)),
        FieldValue::Integer(i) => libsql::Value::Integer(*i),
        FieldValue::Real(r) => libsql::Value::Real(*r),
        FieldValue::Text(s) => libsql::Value::Text(s.clone()),
        FieldValue::Blob(b) => libsql::Value::Blob(b.clone()),
    }
}

/// Convert a column value read from a row.
#[must_use]
pub fn from_sql_value(value: libsql::Value) -> FieldValue {
    match value {
        libsql::Value::Null => FieldValue::Null,
        libsql::Value::Integer(i) => FieldValue::Integer(i),
        libsql::Value::Real(r) => FieldValue::Real(r),
        libsql::Value::Text(s) => FieldValue::Text(s),
        libsql::Value::Blob(b) => FieldValue::Blob(b),
    }
}

/// Quote an identifier for interpolation into SQL.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
