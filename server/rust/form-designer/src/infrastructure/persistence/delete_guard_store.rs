use k1s0_dynamic_sql::{build_insert, DbRow, Fields, SelectBuilder, WhereBuilder};
use uuid::Uuid;

use super::{
    active, flag, now, req_i32, req_string, req_uuid, soft_delete_ids, soft_delete_where,
    with_created, COL_ID,
};
use crate::domain::entity::delete_guard::FormDeleteGuard;
use crate::domain::error::FormError;
use crate::infrastructure::database::{DbError, SqlExecutor};

pub const TABLE: &str = "FORM_DELETE_GUARD";

fn from_row(row: &DbRow) -> Result<FormDeleteGuard, DbError> {
    Ok(FormDeleteGuard {
        id: req_uuid(row, COL_ID)?,
        form_field_master_id: req_uuid(row, "FORM_FIELD_Master_ID")?,
        guard_sql: req_string(row, "GUARD_SQL")?,
        error_message: req_string(row, "ERROR_MESSAGE")?,
        rule_order: req_i32(row, "RULE_ORDER")?,
        is_enabled: flag(row, "IS_ENABLED"),
    })
}

async fn select(
    exec: &mut dyn SqlExecutor,
    master_id: Uuid,
    enabled_only: bool,
) -> Result<Vec<FormDeleteGuard>, FormError> {
    let mut w = active().and_eq("FORM_FIELD_Master_ID", master_id);
    if enabled_only {
        w = w.and_eq("IS_ENABLED", true);
    }
    let stmt = SelectBuilder::new(TABLE)
        .filter(w)
        .order_by("RULE_ORDER", false)
        .build()?;
    let rows = exec.query(&stmt).await?;
    Ok(rows.iter().map(from_row).collect::<Result<_, _>>()?)
}

pub async fn list(
    exec: &mut dyn SqlExecutor,
    master_id: Uuid,
) -> Result<Vec<FormDeleteGuard>, FormError> {
    select(exec, master_id, false).await
}

/// 評価対象のガードを `RULE_ORDER` 順に返す。
pub async fn list_enabled(
    exec: &mut dyn SqlExecutor,
    master_id: Uuid,
) -> Result<Vec<FormDeleteGuard>, FormError> {
    select(exec, master_id, true).await
}

pub async fn insert(
    exec: &mut dyn SqlExecutor,
    guard: &FormDeleteGuard,
    actor: &str,
) -> Result<(), FormError> {
    let fields = with_created(
        Fields::new()
            .with(COL_ID, guard.id)
            .with("FORM_FIELD_Master_ID", guard.form_field_master_id)
            .with("GUARD_SQL", guard.guard_sql.as_str())
            .with("ERROR_MESSAGE", guard.error_message.as_str())
            .with("RULE_ORDER", guard.rule_order)
            .with("IS_ENABLED", guard.is_enabled),
        actor,
        now(),
    );
    exec.execute(&build_insert(TABLE, &fields)?).await?;
    Ok(())
}

pub async fn soft_delete(exec: &mut dyn SqlExecutor, id: Uuid, actor: &str) -> Result<(), FormError> {
    if soft_delete_ids(exec, TABLE, &[id], actor).await? == 0 {
        return Err(FormError::not_found("delete guard", id));
    }
    Ok(())
}

pub async fn soft_delete_by_masters(
    exec: &mut dyn SqlExecutor,
    master_ids: &[Uuid],
    actor: &str,
) -> Result<u64, FormError> {
    if master_ids.is_empty() {
        return Ok(0);
    }
    soft_delete_where(
        exec,
        TABLE,
        WhereBuilder::new().and_in("FORM_FIELD_Master_ID", master_ids.iter().copied()),
        actor,
    )
    .await
}

#[cfg(test)]
pub(crate) fn to_row(g: &FormDeleteGuard) -> DbRow {
    DbRow::from_pairs([
        (COL_ID, k1s0_dynamic_sql::SqlValue::Guid(g.id)),
        ("FORM_FIELD_Master_ID", g.form_field_master_id.into()),
        ("GUARD_SQL", g.guard_sql.as_str().into()),
        ("ERROR_MESSAGE", g.error_message.as_str().into()),
        ("RULE_ORDER", g.rule_order.into()),
        ("IS_ENABLED", g.is_enabled.into()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::scripted::ScriptedDatabase;

    #[tokio::test]
    async fn test_list_enabled_filters_and_orders() {
        let guard = FormDeleteGuard {
            id: Uuid::new_v4(),
            form_field_master_id: Uuid::new_v4(),
            guard_sql: "SELECT COUNT(1) FROM [ORDER_LINE] WHERE [ORDER_NO]=@ORDER_NO".to_string(),
            error_message: "order has lines".to_string(),
            rule_order: 1,
            is_enabled: true,
        };
        let db = ScriptedDatabase::new();
        db.on_query("FROM [FORM_DELETE_GUARD]", vec![to_row(&guard)]);
        let mut exec = db.clone();
        let guards = list_enabled(&mut exec, guard.form_field_master_id).await.unwrap();
        assert_eq!(guards, vec![guard]);
        let stmt = &db.statements()[0];
        assert!(stmt.sql.contains("[IS_ENABLED]=@w_IS_ENABLED"));
        assert!(stmt.sql.ends_with("ORDER BY [RULE_ORDER] ASC"));
    }

    #[tokio::test]
    async fn test_soft_delete_of_missing_guard_is_not_found() {
        let db = ScriptedDatabase::new();
        db.on_execute("UPDATE [FORM_DELETE_GUARD]", 0);
        let mut exec = db.clone();
        let err = soft_delete(&mut exec, Uuid::new_v4(), "alice").await.unwrap_err();
        assert!(matches!(err, FormError::NotFound(_)));
    }
}
