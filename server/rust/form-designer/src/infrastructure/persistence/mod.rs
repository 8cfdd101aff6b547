//! Metadata table access.
//!
//! The `*_store` modules are free functions over `&mut dyn SqlExecutor`, so the
//! same call works standalone or inside a caller's unit of work. Rows are soft
//! deleted through `IS_DELETED` except dropdown options, which are replaced
//! wholesale on sync.

pub mod delete_guard_store;
pub mod dropdown_store;
pub mod field_config_store;
pub mod form_master_store;
pub mod permission_repo_impl;
pub mod schema_repo_impl;
pub mod sql_log_repo_impl;
pub mod validation_rule_store;

use chrono::{NaiveDateTime, Utc};
use k1s0_dynamic_sql::{build_update_where, DbRow, Fields, SqlValue, WhereBuilder};
use k1s0_server_common::Described;
use uuid::Uuid;

use crate::domain::error::FormError;
use crate::infrastructure::database::{DbError, SqlExecutor};

pub(crate) const COL_ID: &str = "ID";
pub(crate) const COL_IS_DELETED: &str = "IS_DELETED";

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn missing(column: &str) -> DbError {
    DbError::Other(format!("column {column} is missing or NULL"))
}

pub(crate) fn req_uuid(row: &DbRow, column: &str) -> Result<Uuid, DbError> {
    row.get_uuid(column).ok_or_else(|| missing(column))
}

pub(crate) fn req_string(row: &DbRow, column: &str) -> Result<String, DbError> {
    row.get_string(column).ok_or_else(|| missing(column))
}

pub(crate) fn req_i32(row: &DbRow, column: &str) -> Result<i32, DbError> {
    row.get_i32(column).ok_or_else(|| missing(column))
}

pub(crate) fn req_datetime(row: &DbRow, column: &str) -> Result<NaiveDateTime, DbError> {
    row.get_datetime(column).ok_or_else(|| missing(column))
}

pub(crate) fn flag(row: &DbRow, column: &str) -> bool {
    row.get_bool(column).unwrap_or(false)
}

/// 数値で保存された列挙値を読む。
pub(crate) fn req_enum<T: Described>(row: &DbRow, column: &str) -> Result<T, DbError> {
    let value = req_i32(row, column)?;
    T::from_value(value).ok_or_else(|| {
        DbError::Other(format!("column {column} holds unknown {} value {value}", T::TYPE_NAME))
    })
}

pub(crate) fn opt_enum<T: Described>(row: &DbRow, column: &str) -> Option<T> {
    row.get_i32(column).and_then(T::from_value)
}

pub(crate) fn enum_value<T: Described>(value: Option<T>) -> SqlValue {
    value.map_or(SqlValue::Null, |v| SqlValue::Int(v.value()))
}

/// 新規行の監査列。
pub(crate) fn with_created(fields: Fields, actor: &str, at: NaiveDateTime) -> Fields {
    fields
        .with(COL_IS_DELETED, false)
        .with("CREATE_USER", actor)
        .with("CREATE_TIME", at)
}

/// 更新行の監査列。
pub(crate) fn with_edited(fields: Fields, actor: &str, at: NaiveDateTime) -> Fields {
    fields.with("EDIT_USER", actor).with("EDIT_TIME", at)
}

pub(crate) fn active() -> WhereBuilder {
    WhereBuilder::new().and_eq(COL_IS_DELETED, false)
}

/// `filter` に一致する行を論理削除する。
pub(crate) async fn soft_delete_where(
    exec: &mut dyn SqlExecutor,
    table: &str,
    filter: WhereBuilder,
    actor: &str,
) -> Result<u64, FormError> {
    let set = with_edited(Fields::new().with(COL_IS_DELETED, true), actor, now());
    let stmt = build_update_where(table, &set, filter.and_eq(COL_IS_DELETED, false))?;
    Ok(exec.execute(&stmt).await?)
}

/// ID 群を論理削除する。空なら何もしない。
pub(crate) async fn soft_delete_ids(
    exec: &mut dyn SqlExecutor,
    table: &str,
    ids: &[Uuid],
    actor: &str,
) -> Result<u64, FormError> {
    if ids.is_empty() {
        return Ok(0);
    }
    soft_delete_where(exec, table, WhereBuilder::new().and_in(COL_ID, ids.iter().copied()), actor).await
}

pub(crate) fn ids_of(rows: &[DbRow]) -> Result<Vec<Uuid>, DbError> {
    rows.iter().map(|r| req_uuid(r, COL_ID)).collect()
}
