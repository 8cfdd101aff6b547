//! Primary key conversion and generation.
//!
//! Tables in the target schema use GUID, integer, decimal and character
//! primary keys. A caller-supplied id always arrives as a string and has to
//! be converted to the declared type before it can be bound.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::PkError;
use crate::types::base_type;
use crate::value::SqlValue;

/// ResolvedPk is a table's primary key column together with a typed id value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPk {
    pub name: String,
    pub sql_type: String,
    pub value: SqlValue,
}

/// Converts a caller-supplied id to the declared primary key type.
///
/// Fails fast: an id that does not parse is an error, never NULL.
pub fn convert_pk_type(id: &str, pk_type: &str) -> Result<SqlValue, PkError> {
    let raw = id.trim();
    let invalid = || PkError::InvalidValue {
        pk_type: pk_type.to_string(),
        value: id.to_string(),
    };

    match base_type(pk_type).as_str() {
        "uniqueidentifier" => Uuid::parse_str(raw).map(SqlValue::Guid).map_err(|_| invalid()),
        "int" | "smallint" | "tinyint" => raw.parse::<i32>().map(SqlValue::Int).map_err(|_| invalid()),
        "bigint" => raw.parse::<i64>().map(SqlValue::BigInt).map_err(|_| invalid()),
        "decimal" | "numeric" => Decimal::from_str(raw)
            .map(SqlValue::Decimal)
            .map_err(|_| invalid()),
        _ => Ok(SqlValue::Text(id.to_string())),
    }
}

/// Generates a new primary key value for a table whose key is not database-generated.
pub fn generate_pk_value(pk_type: &str) -> Result<SqlValue, PkError> {
    generate_pk_value_at(pk_type, Utc::now())
}

/// Same as [`generate_pk_value`] with an explicit clock.
///
/// Decimal keys are `yyMMddHHmmssfff * 1000 + r` with `r` in `0..1000`, so two
/// keys generated within the same millisecond collide with probability 1/1000.
/// Integer keys are `(unix_ms << 22) | r22`; `int` keeps only the low 31 bits
/// and is therefore not monotonic.
pub fn generate_pk_value_at(pk_type: &str, now: DateTime<Utc>) -> Result<SqlValue, PkError> {
    let mut rng = rand::thread_rng();
    match base_type(pk_type).as_str() {
        "uniqueidentifier" => Ok(SqlValue::Guid(Uuid::new_v4())),
        "decimal" | "numeric" => {
            let stamp: i64 = now
                .format("%y%m%d%H%M%S%3f")
                .to_string()
                .parse()
                .map_err(|_| PkError::UnsupportedType(pk_type.to_string()))?;
            let value = stamp * 1000 + rng.gen_range(0..1000);
            Ok(SqlValue::Decimal(Decimal::from(value)))
        }
        "bigint" => Ok(SqlValue::BigInt(snowflake(now, &mut rng))),
        "int" => {
            let low = snowflake(now, &mut rng) & 0x7FFF_FFFF;
            Ok(SqlValue::Int(i32::try_from(low).unwrap_or_default()))
        }
        "nvarchar" | "varchar" | "char" | "nchar" => {
            Ok(SqlValue::Text(Uuid::new_v4().simple().to_string()))
        }
        _ => Err(PkError::UnsupportedType(pk_type.to_string())),
    }
}

fn snowflake(now: DateTime<Utc>, rng: &mut impl Rng) -> i64 {
    let ms = now.timestamp_millis();
    let random: i64 = rng.gen_range(0..(1 << 22));
    (ms.wrapping_shl(22) | random) & i64::MAX
}
