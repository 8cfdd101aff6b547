use chrono::NaiveDateTime;
use k1s0_dynamic_sql::{build_insert, build_update_where, DbRow, Fields, SelectBuilder};
use k1s0_server_common::Described;
use uuid::Uuid;

use super::{
    active, enum_value, flag, ids_of, opt_enum, req_datetime, req_enum, req_i32, req_string,
    req_uuid, soft_delete_ids, with_created, with_edited, COL_ID,
};
use crate::domain::entity::form_field_config::FormFieldConfig;
use crate::domain::error::FormError;
use crate::infrastructure::database::{DbError, SqlExecutor};

pub const TABLE: &str = "FORM_FIELD_CONFIG";

fn from_row(row: &DbRow) -> Result<FormFieldConfig, DbError> {
    Ok(FormFieldConfig {
        id: req_uuid(row, COL_ID)?,
        form_field_master_id: req_uuid(row, "FORM_FIELD_Master_ID")?,
        table_name: req_string(row, "TABLE_NAME")?,
        column_name: req_string(row, "COLUMN_NAME")?,
        data_type: req_string(row, "DATA_TYPE")?,
        control_type: req_enum(row, "CONTROL_TYPE")?,
        is_visible: flag(row, "IS_VISIBLE"),
        is_editable: flag(row, "IS_EDITABLE"),
        is_required: flag(row, "IS_REQUIRED"),
        query_enabled: flag(row, "QUERY_ENABLED"),
        query_component: opt_enum(row, "QUERY_COMPONENT"),
        query_condition: opt_enum(row, "QUERY_CONDITION"),
        display_name: row.get_opt_string("DISPLAY_NAME"),
        field_order: req_i32(row, "FIELD_ORDER")?,
        create_user: req_string(row, "CREATE_USER")?,
        create_time: req_datetime(row, "CREATE_TIME")?,
        edit_user: row.get_opt_string("EDIT_USER"),
        edit_time: row.get_datetime("EDIT_TIME"),
    })
}

fn body(c: &FormFieldConfig) -> Fields {
    Fields::new()
        .with("CONTROL_TYPE", c.control_type.value())
        .with("IS_VISIBLE", c.is_visible)
        .with("IS_EDITABLE", c.is_editable)
        .with("IS_REQUIRED", c.is_required)
        .with("QUERY_ENABLED", c.query_enabled)
        .with("QUERY_COMPONENT", enum_value(c.query_component))
        .with("QUERY_CONDITION", enum_value(c.query_condition))
        .with("DISPLAY_NAME", c.display_name.clone())
        .with("FIELD_ORDER", c.field_order)
}

pub async fn list_by_master(
    exec: &mut dyn SqlExecutor,
    master_id: Uuid,
) -> Result<Vec<FormFieldConfig>, FormError> {
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_eq("FORM_FIELD_Master_ID", master_id))
        .order_by("FIELD_ORDER", false)
        .build()?;
    let rows = exec.query(&stmt).await?;
    Ok(rows.iter().map(from_row).collect::<Result<_, _>>()?)
}

pub async fn find_by_id(
    exec: &mut dyn SqlExecutor,
    id: Uuid,
) -> Result<Option<FormFieldConfig>, FormError> {
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_eq(COL_ID, id))
        .build()?;
    Ok(exec.query_one(&stmt).await?.map(|r| from_row(&r)).transpose()?)
}

pub async fn get(exec: &mut dyn SqlExecutor, id: Uuid) -> Result<FormFieldConfig, FormError> {
    find_by_id(exec, id)
        .await?
        .ok_or_else(|| FormError::not_found("field config", id))
}

pub async fn insert(exec: &mut dyn SqlExecutor, config: &FormFieldConfig) -> Result<(), FormError> {
    let fields = Fields::new()
        .with(COL_ID, config.id)
        .with("FORM_FIELD_Master_ID", config.form_field_master_id)
        .with("TABLE_NAME", config.table_name.as_str())
        .with("COLUMN_NAME", config.column_name.as_str())
        .with("DATA_TYPE", config.data_type.as_str());
    let fields = body(config)
        .iter()
        .fold(fields, |f, (n, v)| f.with(n, v.clone()));
    let fields = with_created(fields, &config.create_user, config.create_time);
    exec.execute(&build_insert(TABLE, &fields)?).await?;
    Ok(())
}

/// 表示・編集・検索に関する列のみ更新する。テーブル名・列名・型は変えない。
pub async fn update(
    exec: &mut dyn SqlExecutor,
    config: &FormFieldConfig,
    actor: &str,
    at: NaiveDateTime,
) -> Result<(), FormError> {
    let set = with_edited(body(config), actor, at);
    let stmt = build_update_where(TABLE, &set, active().and_eq(COL_ID, config.id))?;
    if exec.execute(&stmt).await? == 0 {
        return Err(FormError::not_found("field config", config.id));
    }
    Ok(())
}

pub async fn soft_delete(
    exec: &mut dyn SqlExecutor,
    ids: &[Uuid],
    actor: &str,
) -> Result<u64, FormError> {
    soft_delete_ids(exec, TABLE, ids, actor).await
}

pub async fn ids_by_masters(
    exec: &mut dyn SqlExecutor,
    master_ids: &[Uuid],
) -> Result<Vec<Uuid>, FormError> {
    if master_ids.is_empty() {
        return Ok(Vec::new());
    }
    let stmt = SelectBuilder::new(TABLE)
        .columns([COL_ID])
        .filter(active().and_in("FORM_FIELD_Master_ID", master_ids.iter().copied()))
        .build()?;
    Ok(ids_of(&exec.query(&stmt).await?)?)
}

#[cfg(test)]
pub(crate) fn to_row(c: &FormFieldConfig) -> DbRow {
    use k1s0_dynamic_sql::SqlValue;

    let mut row = DbRow::from_pairs([
        (COL_ID, SqlValue::Guid(c.id)),
        ("FORM_FIELD_Master_ID", SqlValue::Guid(c.form_field_master_id)),
        ("TABLE_NAME", SqlValue::Text(c.table_name.clone())),
        ("COLUMN_NAME", SqlValue::Text(c.column_name.clone())),
        ("DATA_TYPE", SqlValue::Text(c.data_type.clone())),
        ("CREATE_USER", SqlValue::Text(c.create_user.clone())),
        ("CREATE_TIME", SqlValue::DateTime(c.create_time)),
    ]);
    for (n, v) in body(c).iter() {
        row.columns.push(n.to_string());
        row.values.push(v.clone());
    }
    row
}
