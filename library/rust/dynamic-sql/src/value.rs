//! Typed SQL values and the lenient conversion used for ordinary columns.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{family, SqlTypeFamily};

/// SqlValue is a parameter value or a decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Decimal(Decimal),
    Float(f64),
    Text(String),
    Guid(Uuid),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Short type label, used in SQL logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bit",
            SqlValue::Int(_) => "int",
            SqlValue::BigInt(_) => "bigint",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "nvarchar",
            SqlValue::Guid(_) => "uniqueidentifier",
            SqlValue::Date(_) => "date",
            SqlValue::DateTime(_) => "datetime2",
        }
    }

    /// Textual form without quoting. `None` for NULL.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::BigInt(v) => Some(v.to_string()),
            SqlValue::Decimal(v) => Some(v.normalize().to_string()),
            SqlValue::Float(v) => Some(v.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Guid(u) => Some(u.to_string()),
            SqlValue::Date(d) => Some(d.to_string()),
            SqlValue::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }

    /// Truthiness used when a boolean-producing query returns an arbitrary scalar.
    pub fn is_truthy(&self) -> bool {
        match self {
            SqlValue::Null => false,
            SqlValue::Bool(b) => *b,
            SqlValue::Int(v) => *v != 0,
            SqlValue::BigInt(v) => *v != 0,
            SqlValue::Decimal(v) => !v.is_zero(),
            SqlValue::Float(v) => *v != 0.0,
            SqlValue::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "y" | "yes"),
            SqlValue::Guid(_) | SqlValue::Date(_) | SqlValue::DateTime(_) => true,
        }
    }

    /// JSON representation used by API responses and SQL logs.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Int(v) => Value::from(*v),
            SqlValue::BigInt(v) => Value::from(*v),
            SqlValue::Float(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            other => other.as_text().map_or(Value::Null, Value::String),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Guid(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Converts an untyped input value to a parameter for a column of `sql_type`.
///
/// Ordinary columns are converted leniently: a value that does not parse as
/// the column type becomes [`SqlValue::Null`] instead of aborting the write.
/// Every integer type converts to [`SqlValue::BigInt`].
pub fn convert(sql_type: &str, value: &Value) -> SqlValue {
    if value.is_null() {
        return SqlValue::Null;
    }
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };

    match family(sql_type) {
        SqlTypeFamily::Guid => Uuid::parse_str(&text).map_or(SqlValue::Null, SqlValue::Guid),
        SqlTypeFamily::Integer => match value {
            Value::Number(n) => n.as_i64().map_or(SqlValue::Null, SqlValue::BigInt),
            _ => text.parse::<i64>().map_or(SqlValue::Null, SqlValue::BigInt),
        },
        SqlTypeFamily::Decimal => Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_or(SqlValue::Null, SqlValue::Decimal),
        SqlTypeFamily::Float => text.parse::<f64>().map_or(SqlValue::Null, SqlValue::Float),
        SqlTypeFamily::Bit => match value {
            Value::Bool(b) => SqlValue::Bool(*b),
            _ => match text.to_ascii_lowercase().as_str() {
                "1" | "true" | "y" | "on" => SqlValue::Bool(true),
                "0" | "false" | "n" | "off" => SqlValue::Bool(false),
                _ => SqlValue::Null,
            },
        },
        SqlTypeFamily::Date => parse_date(&text).map_or(SqlValue::Null, SqlValue::Date),
        SqlTypeFamily::DateTime => parse_datetime(&text).map_or(SqlValue::Null, SqlValue::DateTime),
        SqlTypeFamily::Character | SqlTypeFamily::LongText | SqlTypeFamily::Other => {
            if text.is_empty() && !matches!(value, Value::String(_)) {
                SqlValue::Null
            } else {
                SqlValue::Text(match value {
                    Value::String(s) => s.clone(),
                    _ => text,
                })
            }
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y/%m/%d"))
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
