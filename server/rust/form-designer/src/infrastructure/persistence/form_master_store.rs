use chrono::NaiveDateTime;
use k1s0_dynamic_sql::{
    build_exists_where, build_insert, build_update_where, DbRow, Fields, SelectBuilder,
    SqlStatement,
};
use k1s0_server_common::Described;
use uuid::Uuid;

use super::{
    active, flag, ids_of, req_datetime, req_enum, req_string, req_uuid, soft_delete_ids,
    with_created, with_edited, COL_ID,
};
use crate::domain::entity::form_field_master::FormFieldMaster;
use crate::domain::error::FormError;
use crate::domain::value_object::{FormFieldStatus, FormFunctionType, TableSchemaQueryType};
use crate::infrastructure::database::{DbError, SqlExecutor};

pub const TABLE: &str = "FORM_FIELD_Master";

/// 一覧の絞り込み条件。`schema_type` 未指定時は確定済みのみ。
#[derive(Debug, Clone, Default)]
pub struct MasterFilter {
    pub form_name: Option<String>,
    pub schema_type: Option<TableSchemaQueryType>,
    pub status: Option<FormFieldStatus>,
    pub function_type: Option<FormFunctionType>,
}

fn from_row(row: &DbRow) -> Result<FormFieldMaster, DbError> {
    Ok(FormFieldMaster {
        id: req_uuid(row, COL_ID)?,
        form_name: req_string(row, "FORM_NAME")?,
        base_table_name: row.get_opt_string("BASE_TABLE_NAME"),
        detail_table_name: row.get_opt_string("DETAIL_TABLE_NAME"),
        view_table_name: row.get_opt_string("VIEW_TABLE_NAME"),
        mapping_table_name: row.get_opt_string("MAPPING_TABLE_NAME"),
        base_table_id: row.get_uuid("BASE_TABLE_ID"),
        detail_table_id: row.get_uuid("DETAIL_TABLE_ID"),
        view_table_id: row.get_uuid("VIEW_TABLE_ID"),
        mapping_table_id: row.get_uuid("MAPPING_TABLE_ID"),
        target_table_name: row.get_opt_string("TARGET_TABLE_NAME"),
        mapping_base_fk_column: row.get_opt_string("MAPPING_BASE_FK_COLUMN"),
        mapping_target_fk_column: row.get_opt_string("MAPPING_TARGET_FK_COLUMN"),
        detail_relation_column: row.get_opt_string("DETAIL_RELATION_COLUMN"),
        function_type: req_enum(row, "FUNCTION_TYPE")?,
        status: req_enum(row, "STATUS")?,
        schema_type: req_enum(row, "SCHEMA_TYPE")?,
        is_deleted: flag(row, "IS_DELETED"),
        create_user: req_string(row, "CREATE_USER")?,
        create_time: req_datetime(row, "CREATE_TIME")?,
        edit_user: row.get_opt_string("EDIT_USER"),
        edit_time: row.get_datetime("EDIT_TIME"),
    })
}

/// 変更可能な列。
fn body(m: &FormFieldMaster) -> Fields {
    Fields::new()
        .with("FORM_NAME", m.form_name.as_str())
        .with("BASE_TABLE_NAME", m.base_table_name.clone())
        .with("DETAIL_TABLE_NAME", m.detail_table_name.clone())
        .with("VIEW_TABLE_NAME", m.view_table_name.clone())
        .with("MAPPING_TABLE_NAME", m.mapping_table_name.clone())
        .with("BASE_TABLE_ID", m.base_table_id)
        .with("DETAIL_TABLE_ID", m.detail_table_id)
        .with("VIEW_TABLE_ID", m.view_table_id)
        .with("MAPPING_TABLE_ID", m.mapping_table_id)
        .with("TARGET_TABLE_NAME", m.target_table_name.clone())
        .with("MAPPING_BASE_FK_COLUMN", m.mapping_base_fk_column.clone())
        .with("MAPPING_TARGET_FK_COLUMN", m.mapping_target_fk_column.clone())
        .with("DETAIL_RELATION_COLUMN", m.detail_relation_column.clone())
        .with("FUNCTION_TYPE", m.function_type.value())
        .with("STATUS", m.status.value())
        .with("SCHEMA_TYPE", m.schema_type.value())
}

pub async fn find_by_id(
    exec: &mut dyn SqlExecutor,
    id: Uuid,
) -> Result<Option<FormFieldMaster>, FormError> {
    let stmt = SelectBuilder::new(TABLE)
        .filter(active().and_eq(COL_ID, id))
        .build()?;
    Ok(exec.query_one(&stmt).await?.map(|r| from_row(&r)).transpose()?)
}

pub async fn get(exec: &mut dyn SqlExecutor, id: Uuid) -> Result<FormFieldMaster, FormError> {
    find_by_id(exec, id)
        .await?
        .ok_or_else(|| FormError::not_found("form master", id))
}

pub async fn list(
    exec: &mut dyn SqlExecutor,
    filter: &MasterFilter,
) -> Result<Vec<FormFieldMaster>, FormError> {
    let schema_type = filter.schema_type.unwrap_or(TableSchemaQueryType::All);
    let mut w = active().and_eq("SCHEMA_TYPE", schema_type.value());
    if let Some(name) = filter.form_name.as_deref().filter(|n| !n.is_empty()) {
        w = w.and_like("FORM_NAME", name);
    }
    if let Some(status) = filter.status {
        w = w.and_eq("STATUS", status.value());
    }
    if let Some(function_type) = filter.function_type {
        w = w.and_eq("FUNCTION_TYPE", function_type.value());
    }
    let stmt = SelectBuilder::new(TABLE)
        .filter(w)
        .order_by("FORM_NAME", false)
        .build()?;
    let rows = exec.query(&stmt).await?;
    Ok(rows.iter().map(from_row).collect::<Result<_, _>>()?)
}

/// 確定済みフォームに同名があるか。`exclude` は自身の ID。
pub async fn form_name_exists(
    exec: &mut dyn SqlExecutor,
    form_name: &str,
    exclude: Option<Uuid>,
) -> Result<bool, FormError> {
    let mut w = active()
        .and_eq("FORM_NAME", form_name)
        .and_eq("SCHEMA_TYPE", TableSchemaQueryType::All.value());
    if let Some(id) = exclude {
        w = w.and_not_eq(COL_ID, id);
    }
    let stmt = build_exists_where(TABLE, w)?;
    Ok(exec.query_one(&stmt).await?.is_some())
}

/// 確定済みマスタから `[m]` への参照が無いことを表す条件。
const UNREFERENCED: &str = "NOT EXISTS (SELECT 1 FROM [FORM_FIELD_Master] [f] \
     WHERE [f].[IS_DELETED]=@deleted AND [f].[SCHEMA_TYPE]=@all \
     AND ([f].[BASE_TABLE_ID]=[m].[ID] OR [f].[DETAIL_TABLE_ID]=[m].[ID] \
     OR [f].[VIEW_TABLE_ID]=[m].[ID] OR [f].[MAPPING_TABLE_ID]=[m].[ID]))";

/// 同じテーブル・役割で、どのフォームにも使われていない下書き。
pub async fn find_draft(
    exec: &mut dyn SqlExecutor,
    role: TableSchemaQueryType,
    table_name: &str,
) -> Result<Option<FormFieldMaster>, FormError> {
    let column = match role {
        TableSchemaQueryType::Table | TableSchemaQueryType::All => "BASE_TABLE_NAME",
        TableSchemaQueryType::Detail => "DETAIL_TABLE_NAME",
        TableSchemaQueryType::View => "VIEW_TABLE_NAME",
        TableSchemaQueryType::Mapping => "MAPPING_TABLE_NAME",
    };
    let stmt = SqlStatement::new(format!(
        "SELECT [m].* FROM [{TABLE}] [m] \
         WHERE [m].[IS_DELETED]=@deleted AND [m].[SCHEMA_TYPE]=@role AND [m].[{column}]=@table \
         AND {UNREFERENCED} ORDER BY [m].[CREATE_TIME] DESC"
    ))
    .bind("deleted", false)
    .bind("all", TableSchemaQueryType::All.value())
    .bind("role", role.value())
    .bind("table", table_name);
    Ok(exec.query_one(&stmt).await?.map(|r| from_row(&r)).transpose()?)
}

pub async fn insert(
    exec: &mut dyn SqlExecutor,
    master: &FormFieldMaster,
) -> Result<(), FormError> {
    let fields = with_created(
        Fields::new().with(COL_ID, master.id),
        &master.create_user,
        master.create_time,
    );
    let fields = body(master)
        .iter()
        .fold(fields, |f, (n, v)| f.with(n, v.clone()));
    exec.execute(&build_insert(TABLE, &fields)?).await?;
    Ok(())
}

pub async fn update(
    exec: &mut dyn SqlExecutor,
    master: &FormFieldMaster,
    actor: &str,
    at: NaiveDateTime,
) -> Result<(), FormError> {
    let set = with_edited(body(master), actor, at);
    let stmt = build_update_where(TABLE, &set, active().and_eq(COL_ID, master.id))?;
    if exec.execute(&stmt).await? == 0 {
        return Err(FormError::not_found("form master", master.id));
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

/// 確定済みマスタから参照されていない、`cutoff` より前に作成された下書き。
pub async fn find_orphan_ids(
    exec: &mut dyn SqlExecutor,
    cutoff: NaiveDateTime,
) -> Result<Vec<Uuid>, FormError> {
    let stmt = SqlStatement::new(format!(
        "SELECT [m].[ID] FROM [{TABLE}] [m] \
         WHERE [m].[IS_DELETED]=@deleted AND [m].[SCHEMA_TYPE]<>@all AND [m].[CREATE_TIME]<@cutoff \
         AND {UNREFERENCED}"
    ))
    .bind("deleted", false)
    .bind("all", TableSchemaQueryType::All.value())
    .bind("cutoff", cutoff);
    let rows = exec.query(&stmt).await?;
    Ok(ids_of(&rows)?)
}

/// 役割別下書きの ID（自身を含む）。
pub fn owned_master_ids(master: &FormFieldMaster) -> Vec<Uuid> {
    let mut ids = vec![master.id];
    for id in [
        master.base_table_id,
        master.detail_table_id,
        master.view_table_id,
        master.mapping_table_id,
    ]
    .into_iter()
    .flatten()
    {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// `from_row` が読める形の行。
#[cfg(test)]
pub(crate) fn to_row(m: &FormFieldMaster) -> DbRow {
    use k1s0_dynamic_sql::SqlValue;

    let mut columns = vec![COL_ID.to_string()];
    let mut values = vec![SqlValue::Guid(m.id)];
    for (n, v) in body(m).iter() {
        columns.push(n.to_string());
        values.push(v.clone());
    }
    for (n, v) in [
        ("IS_DELETED", SqlValue::Bool(m.is_deleted)),
        ("CREATE_USER", SqlValue::Text(m.create_user.clone())),
        ("CREATE_TIME", SqlValue::DateTime(m.create_time)),
        ("EDIT_USER", m.edit_user.clone().into()),
        ("EDIT_TIME", m.edit_time.into()),
    ] {
        columns.push(n.to_string());
        values.push(v);
    }
    DbRow::new(columns, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k1s0_dynamic_sql::SqlValue;
    use crate::infrastructure::database::scripted::ScriptedDatabase;

    fn sample() -> FormFieldMaster {
        FormFieldMaster::new_draft(
            "orders".to_string(),
            TableSchemaQueryType::Table,
            "ORDERS".to_string(),
            FormFunctionType::MasterMaintenance,
            "alice",
            chrono::NaiveDateTime::default(),
        )
    }

    #[tokio::test]
    async fn test_row_mapping_round_trips_through_store() {
        let master = sample();
        let mut db = ScriptedDatabase::new();
        db.on_query("FROM [FORM_FIELD_Master]", vec![to_row(&master)]);
        let found = find_by_id(&mut db, master.id).await.unwrap().unwrap();
        assert_eq!(found, master);

        let stmt = &db.statements()[0];
        assert!(stmt.sql.contains("[IS_DELETED]=@w_IS_DELETED"));
        assert_eq!(stmt.param("w_ID"), Some(&SqlValue::Guid(master.id)));
    }

    #[tokio::test]
    async fn test_insert_writes_audit_columns() {
        let master = sample();
        let mut db = ScriptedDatabase::new();
        insert(&mut db, &master).await.unwrap();
        let stmt = &db.statements()[0];
        assert!(stmt.sql.starts_with("INSERT INTO [FORM_FIELD_Master] ([ID],[IS_DELETED],[CREATE_USER],[CREATE_TIME],[FORM_NAME]"));
        assert_eq!(stmt.param("SCHEMA_TYPE"), Some(&SqlValue::Int(0)));
        assert_eq!(stmt.param("DETAIL_TABLE_NAME"), Some(&SqlValue::Null));
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_not_found() {
        let mut db = ScriptedDatabase::new();
        db.on_execute("UPDATE [FORM_FIELD_Master]", 0);
        let result = update(&mut db, &sample(), "bob", chrono::NaiveDateTime::default()).await;
        assert!(matches!(result, Err(FormError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_orphan_query_excludes_referenced_drafts() {
        let mut db = ScriptedDatabase::new();
        let id = Uuid::new_v4();
        db.on_query("NOT EXISTS", vec![DbRow::from_pairs([("ID", id)])]);
        let ids = find_orphan_ids(&mut db, chrono::NaiveDateTime::default()).await.unwrap();
        assert_eq!(ids, vec![id]);
        let stmt = &db.statements()[0];
        assert_eq!(stmt.param("all"), Some(&SqlValue::Int(4)));
    }

    #[test]
    fn test_owned_master_ids_dedups() {
        let mut m = sample();
        let draft = Uuid::new_v4();
        m.base_table_id = Some(draft);
        m.view_table_id = Some(draft);
        assert_eq!(owned_master_ids(&m), vec![m.id, draft]);
    }
}
