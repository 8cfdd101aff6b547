use k1s0_dynamic_sql::{build_insert, build_update_where, DbRow, Fields, SelectBuilder};
use k1s0_server_common::Described;
use uuid::Uuid;

use super::{
    active, now, req_enum, req_i32, req_uuid, soft_delete_ids, soft_delete_where, with_created,
    with_edited, COL_ID,
};
use crate::domain::entity::validation_rule::FormFieldValidationRule;
use crate::domain::error::FormError;
use crate::infrastructure::database::{DbError, SqlExecutor};

pub const TABLE: &str = "FORM_FIELD_VALIDATION_RULE";

fn from_row(row: &DbRow) -> Result<FormFieldValidationRule, DbError> {
    Ok(FormFieldValidationRule {
        id: req_uuid(row, COL_ID)?,
        field_config_id: req_uuid(row, "FIELD_CONFIG_ID")?,
        validation_type: req_enum(row, "VALIDATION_TYPE")?,
        validation_value: row.get_opt_string("VALIDATION_VALUE"),
        message_zh: row.get_opt_string("MESSAGE_ZH"),
        message_en: row.get_opt_string("MESSAGE_EN"),
        validation_order: req_i32(row, "VALIDATION_ORDER")?,
    })
}

fn body(r: &FormFieldValidationRule) -> Fields {
    Fields::new()
        .with("VALIDATION_TYPE", r.validation_type.value())
        .with("VALIDATION_VALUE", r.validation_value.clone())
        .with("MESSAGE_ZH", r.message_zh.clone())
        .with("MESSAGE_EN", r.message_en.clone())
        .with("VALIDATION_ORDER", r.validation_order)
}

/// 指定項目群の規則を `VALIDATION_ORDER` 順に返す。
pub async fn list_by_fields(
    exec: &mut dyn SqlExecutor,
    field_ids: &[Uuid],
) -> Result<Vec<FormFieldValidationRule>, FormError> {
    if field_ids.is_empty() {
        return Ok(Vec::new());
    }
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_in("FIELD_CONFIG_ID", field_ids.iter().copied()))
        .order_by("FIELD_CONFIG_ID", false)
        .order_by("VALIDATION_ORDER", false)
        .build()?;
    let rows = exec.query(&stmt).await?;
    Ok(rows.iter().map(from_row).collect::<Result<_, _>>()?)
}

pub async fn list_by_field(
    exec: &mut dyn SqlExecutor,
    field_id: Uuid,
) -> Result<Vec<FormFieldValidationRule>, FormError> {
    list_by_fields(exec, &[field_id]).await
}

pub async fn get(
    exec: &mut dyn SqlExecutor,
    id: Uuid,
) -> Result<FormFieldValidationRule, FormError> {
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_eq(COL_ID, id))
        .build()?;
    exec.query_one(&stmt)
        .await?
        .map(|r| from_row(&r))
        .transpose()?
        .ok_or_else(|| FormError::not_found("validation rule", id))
}

pub async fn insert(
    exec: &mut dyn SqlExecutor,
    rule: &FormFieldValidationRule,
    actor: &str,
) -> Result<(), FormError> {
    let fields = Fields::new()
        .with(COL_ID, rule.id)
        .with("FIELD_CONFIG_ID", rule.field_config_id);
    let fields = body(rule)
        .iter()
        .fold(fields, |f, (n, v)| f.with(n, v.clone()));
    let fields = with_created(fields, actor, now());
    exec.execute(&build_insert(TABLE, &fields)?).await?;
    Ok(())
}

pub async fn update(
    exec: &mut dyn SqlExecutor,
    rule: &FormFieldValidationRule,
    actor: &str,
) -> Result<(), FormError> {
    let set = with_edited(body(rule), actor, now());
    let stmt = build_update_where(TABLE, &set, active().and_eq(COL_ID, rule.id))?;
    if exec.execute(&stmt).await? == 0 {
        return Err(FormError::not_found("validation rule", rule.id));
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

pub async fn soft_delete_by_fields(
    exec: &mut dyn SqlExecutor,
    field_ids: &[Uuid],
    actor: &str,
) -> Result<u64, FormError> {
    if field_ids.is_empty() {
        return Ok(0);
    }
    soft_delete_where(
        exec,
        TABLE,
        k1s0_dynamic_sql::WhereBuilder::new().and_in("FIELD_CONFIG_ID", field_ids.iter().copied()),
        actor,
    )
    .await
}

#[cfg(test)]
pub(crate) fn to_row(r: &FormFieldValidationRule) -> DbRow {
    use k1s0_dynamic_sql::SqlValue;

    let mut row = DbRow::from_pairs([
        (COL_ID, SqlValue::Guid(r.id)),
        ("FIELD_CONFIG_ID", SqlValue::Guid(r.field_config_id)),
    ]);
    for (n, v) in body(r).iter() {
        row.columns.push(n.to_string());
        row.values.push(v.clone());
    }
    row
}
