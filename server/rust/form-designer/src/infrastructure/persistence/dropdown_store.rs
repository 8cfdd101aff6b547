use k1s0_dynamic_sql::{
    build_delete_where, build_insert, build_update_where, DbRow, Fields, SelectBuilder,
    WhereBuilder,
};
use uuid::Uuid;

use super::{
    active, flag, ids_of, now, req_i32, req_string, req_uuid, soft_delete_ids, soft_delete_where,
    with_created, with_edited, COL_ID,
};
use crate::domain::entity::dropdown::{DropdownOption, FormFieldDropdown};
use crate::domain::error::FormError;
use crate::infrastructure::database::{DbError, SqlExecutor};

pub const TABLE: &str = "FORM_FIELD_DROPDOWN";
pub const OPTION_TABLE: &str = "FORM_FIELD_DROPDOWN_OPTIONS";

fn from_row(row: &DbRow) -> Result<FormFieldDropdown, DbError> {
    Ok(FormFieldDropdown {
        id: req_uuid(row, COL_ID)?,
        form_field_config_id: req_uuid(row, "FORM_FIELD_CONFIG_ID")?,
        is_use_sql: flag(row, "ISUSESQL"),
        dropdown_sql: row.get_opt_string("DROPDOWNSQL"),
    })
}

fn option_from_row(row: &DbRow) -> Result<DropdownOption, DbError> {
    Ok(DropdownOption {
        id: req_uuid(row, COL_ID)?,
        form_field_dropdown_id: req_uuid(row, "FORM_FIELD_DROPDOWN_ID")?,
        option_table: row.get_opt_string("OPTION_TABLE"),
        option_value: req_string(row, "OPTION_VALUE")?,
        option_text: row.get_string("OPTION_TEXT").unwrap_or_default(),
        option_order: req_i32(row, "OPTION_ORDER")?,
    })
}

pub async fn find_by_field(
    exec: &mut dyn SqlExecutor,
    field_config_id: Uuid,
) -> Result<Option<FormFieldDropdown>, FormError> {
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_eq("FORM_FIELD_CONFIG_ID", field_config_id))
        .build()?;
    Ok(exec.query_one(&stmt).await?.map(|r| from_row(&r)).transpose()?)
}

pub async fn get(exec: &mut dyn SqlExecutor, id: Uuid) -> Result<FormFieldDropdown, FormError> {
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_eq(COL_ID, id))
        .build()?;
    exec.query_one(&stmt)
        .await?
        .map(|r| from_row(&r))
        .transpose()?
        .ok_or_else(|| FormError::not_found("dropdown", id))
}

pub async fn list_by_fields(
    exec: &mut dyn SqlExecutor,
    field_config_ids: &[Uuid],
) -> Result<Vec<FormFieldDropdown>, FormError> {
    if field_config_ids.is_empty() {
        return Ok(Vec::new());
    }
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_in("FORM_FIELD_CONFIG_ID", field_config_ids.iter().copied()))
        .build()?;
    let rows = exec.query(&stmt).await?;
    Ok(rows.iter().map(from_row).collect::<Result<_, _>>()?)
}

/// SQL 同期対象の全ドロップダウン。
pub async fn list_sql_backed(exec: &mut dyn SqlExecutor) -> Result<Vec<FormFieldDropdown>, FormError> {
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_eq("ISUSESQL", true))
        .build()?;
    let rows = exec.query(&stmt).await?;
    Ok(rows.iter().map(from_row).collect::<Result<_, _>>()?)
}

pub async fn insert(
    exec: &mut dyn SqlExecutor,
    dropdown: &FormFieldDropdown,
    actor: &str,
) -> Result<(), FormError> {
    let fields = with_created(
        Fields::new()
            .with(COL_ID, dropdown.id)
            .with("FORM_FIELD_CONFIG_ID", dropdown.form_field_config_id)
            .with("ISUSESQL", dropdown.is_use_sql)
            .with("DROPDOWNSQL", dropdown.dropdown_sql.clone()),
        actor,
        now(),
    );
    exec.execute(&build_insert(TABLE, &fields)?).await?;
    Ok(())
}

pub async fn update_source(
    exec: &mut dyn SqlExecutor,
    dropdown: &FormFieldDropdown,
    actor: &str,
) -> Result<(), FormError> {
    let set = with_edited(
        Fields::new()
            .with("ISUSESQL", dropdown.is_use_sql)
            .with("DROPDOWNSQL", dropdown.dropdown_sql.clone()),
        actor,
        now(),
    );
    let stmt = build_update_where(TABLE, &set, active().and_eq(COL_ID, dropdown.id))?;
    if exec.execute(&stmt).await? == 0 {
        return Err(FormError::not_found("dropdown", dropdown.id));
    }
    Ok(())
}

pub async fn list_options(
    exec: &mut dyn SqlExecutor,
    dropdown_id: Uuid,
) -> Result<Vec<DropdownOption>, FormError> {
    let stmt = SelectBuilder::new(OPTION_TABLE)
        .filter(active().and_eq("FORM_FIELD_DROPDOWN_ID", dropdown_id))
        .order_by("OPTION_ORDER", false)
        .build()?;
    let rows = exec.query(&stmt).await?;
    Ok(rows.iter().map(option_from_row).collect::<Result<_, _>>()?)
}

/// 選択肢を物理削除する。同期時の全置換に使う。
pub async fn delete_options(exec: &mut dyn SqlExecutor, dropdown_id: Uuid) -> Result<u64, FormError> {
    let stmt = build_delete_where(
        OPTION_TABLE,
        WhereBuilder::new().and_eq("FORM_FIELD_DROPDOWN_ID", dropdown_id),
    )?;
    Ok(exec.execute(&stmt).await?)
}

pub async fn insert_option(
    exec: &mut dyn SqlExecutor,
    option: &DropdownOption,
    actor: &str,
) -> Result<(), FormError> {
    let fields = with_created(
        Fields::new()
            .with(COL_ID, option.id)
            .with("FORM_FIELD_DROPDOWN_ID", option.form_field_dropdown_id)
            .with("OPTION_TABLE", option.option_table.clone())
            .with("OPTION_VALUE", option.option_value.as_str())
            .with("OPTION_TEXT", option.option_text.as_str())
            .with("OPTION_ORDER", option.option_order),
        actor,
        now(),
    );
    exec.execute(&build_insert(OPTION_TABLE, &fields)?).await?;
    Ok(())
}

pub async fn ids_by_fields(
    exec: &mut dyn SqlExecutor,
    field_config_ids: &[Uuid],
) -> Result<Vec<Uuid>, FormError> {
    if field_config_ids.is_empty() {
        return Ok(Vec::new());
    }
    let stmt = SelectBuilder::new(TABLE)
        .columns([COL_ID])
        .filter(active().and_in("FORM_FIELD_CONFIG_ID", field_config_ids.iter().copied()))
        .build()?;
    Ok(ids_of(&exec.query(&stmt).await?)?)
}

pub async fn soft_delete(
    exec: &mut dyn SqlExecutor,
    ids: &[Uuid],
    actor: &str,
) -> Result<u64, FormError> {
    soft_delete_ids(exec, TABLE, ids, actor).await
}

pub async fn soft_delete_options_by_dropdowns(
    exec: &mut dyn SqlExecutor,
    dropdown_ids: &[Uuid],
    actor: &str,
) -> Result<u64, FormError> {
    if dropdown_ids.is_empty() {
        return Ok(0);
    }
    soft_delete_where(
        exec,
        OPTION_TABLE,
        WhereBuilder::new().and_in("FORM_FIELD_DROPDOWN_ID", dropdown_ids.iter().copied()),
        actor,
    )
    .await
}

#[cfg(test)]
pub(crate) fn to_row(d: &FormFieldDropdown) -> DbRow {
    DbRow::from_pairs([
        (COL_ID, k1s0_dynamic_sql::SqlValue::Guid(d.id)),
        ("FORM_FIELD_CONFIG_ID", d.form_field_config_id.into()),
        ("ISUSESQL", d.is_use_sql.into()),
        ("DROPDOWNSQL", d.dropdown_sql.clone().into()),
    ])
}
