//! Result rows.

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};
use uuid::Uuid;

use crate::value::SqlValue;

/// DbRow is one result row with its column names in select order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DbRow {
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl DbRow {
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Case-insensitive column lookup.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn get_uuid(&self, column: &str) -> Option<Uuid> {
        match self.get(column)? {
            SqlValue::Guid(u) => Some(*u),
            SqlValue::Text(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }

    /// Any non-NULL value rendered as text.
    pub fn get_string(&self, column: &str) -> Option<String> {
        self.get(column).and_then(SqlValue::as_text)
    }

    /// Like [`DbRow::get_string`] but maps an empty string to `None`.
    pub fn get_opt_string(&self, column: &str) -> Option<String> {
        self.get_string(column).filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            SqlValue::Null => None,
            other => Some(other.is_truthy()),
        }
    }

    pub fn get_i32(&self, column: &str) -> Option<i32> {
        match self.get(column)? {
            SqlValue::Int(v) => Some(*v),
            SqlValue::BigInt(v) => i32::try_from(*v).ok(),
            SqlValue::Decimal(d) => d.trunc().to_string().parse().ok(),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            SqlValue::Int(v) => Some(i64::from(*v)),
            SqlValue::BigInt(v) => Some(*v),
            SqlValue::Decimal(d) => d.trunc().to_string().parse().ok(),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_datetime(&self, column: &str) -> Option<NaiveDateTime> {
        match self.get(column)? {
            SqlValue::DateTime(dt) => Some(*dt),
            SqlValue::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    /// Row as a JSON object keyed by column name, in select order.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl Serialize for DbRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (c, v) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(c, v)?;
        }
        map.end()
    }
}
