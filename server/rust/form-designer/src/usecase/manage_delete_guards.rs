use std::sync::Arc;

use k1s0_dynamic_sql::readonly::ensure_select_only;
use k1s0_dynamic_sql::{is_valid_identifier, DbRow, ResolvedPk, SqlStatement};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::finish;
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::delete_guard::FormDeleteGuard;
use crate::domain::error::{FieldError, FormError};
use crate::infrastructure::database::{Database, SqlExecutor};
use crate::infrastructure::persistence::{delete_guard_store, form_master_store};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteGuardInput {
    pub guard_sql: String,
    pub error_message: String,
    #[serde(default)]
    pub rule_order: Option<i32>,
    #[serde(default = "enabled")]
    pub is_enabled: bool,
}

fn enabled() -> bool {
    true
}

/// ManageDeleteGuardsUseCase はフォームに紐づく削除ガード SQL を管理する。
pub struct ManageDeleteGuardsUseCase {
    db: Arc<dyn Database>,
}

impl ManageDeleteGuardsUseCase {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self, form_id: Uuid, user: &CurrentUser) -> Result<Vec<FormDeleteGuard>, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        form_master_store::get(conn.as_mut(), form_id).await?;
        delete_guard_store::list(conn.as_mut(), form_id).await
    }

    pub async fn create(
        &self,
        form_id: Uuid,
        input: &DeleteGuardInput,
        user: &CurrentUser,
    ) -> Result<FormDeleteGuard, FormError> {
        ensure_select_only(&input.guard_sql)?;
        if input.error_message.trim().is_empty() {
            return Err(FormError::validation_with(
                "error message is required",
                vec![FieldError::new("ErrorMessage", "error message is required")],
            ));
        }

        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            form_master_store::get(exec, form_id).await?;
            let rule_order = match input.rule_order {
                Some(order) => order,
                None => {
                    let guards = delete_guard_store::list(exec, form_id).await?;
                    guards.iter().map(|g| g.rule_order).max().unwrap_or(0) + 1
                }
            };
            let guard = FormDeleteGuard {
                id: Uuid::new_v4(),
                form_field_master_id: form_id,
                guard_sql: input.guard_sql.trim().to_string(),
                error_message: input.error_message.trim().to_string(),
                rule_order,
                is_enabled: input.is_enabled,
            };
            delete_guard_store::insert(exec, &guard, user.actor()).await?;
            Ok(guard)
        }
        .await;
        let guard = finish(uow, result).await?;
        info!(form_master_id = %form_id, guard_id = %guard.id, "delete guard created");
        Ok(guard)
    }

    pub async fn delete(&self, id: Uuid, user: &CurrentUser) -> Result<(), FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = delete_guard_store::soft_delete(uow.executor(), id, user.actor()).await;
        finish(uow, result).await
    }
}

/// 有効なガードを順に評価し、最初に真を返したガードのメッセージで削除を拒否する。
///
/// ガード SQL からは削除対象行の各列を `@列名` で参照できる。
/// 残りのガードは評価しない。
pub(crate) async fn check_delete_guards(
    exec: &mut dyn SqlExecutor,
    form_id: Uuid,
    row: &DbRow,
    pk: &ResolvedPk,
) -> Result<(), FormError> {
    for guard in delete_guard_store::list_enabled(exec, form_id).await? {
        ensure_select_only(&guard.guard_sql)?;
        let stmt = bind_row(SqlStatement::new(guard.guard_sql.as_str()), row, pk);
        let blocked = exec
            .query_scalar(&stmt)
            .await?
            .is_some_and(|v| v.is_truthy());
        if blocked {
            debug!(guard_id = %guard.id, "delete blocked by guard");
            return Err(FormError::DeleteBlocked(guard.error_message));
        }
    }
    Ok(())
}

fn bind_row(mut stmt: SqlStatement, row: &DbRow, pk: &ResolvedPk) -> SqlStatement {
    let mut bound: Vec<String> = Vec::new();
    let mut bind = |stmt: &mut SqlStatement, name: String, value: &k1s0_dynamic_sql::SqlValue| {
        if is_valid_identifier(&name) && !bound.contains(&name) {
            stmt.push_param(name.clone(), value.clone());
            bound.push(name);
        }
    };
    for (column, value) in row.columns.iter().zip(&row.values) {
        bind(&mut stmt, column.clone(), value);
        bind(&mut stmt, column.to_ascii_uppercase(), value);
        bind(&mut stmt, column.to_ascii_lowercase(), value);
    }
    bind(&mut stmt, pk.name.clone(), &pk.value);
    bind(&mut stmt, "id".to_string(), &pk.value);
    stmt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::scripted::ScriptedDatabase;
    use crate::infrastructure::persistence::delete_guard_store::to_row;
    use crate::usecase::test_support::{db, user};
    use k1s0_dynamic_sql::SqlValue;

    fn guard(sql: &str, message: &str, order: i32) -> FormDeleteGuard {
        FormDeleteGuard {
            id: Uuid::new_v4(),
            form_field_master_id: Uuid::new_v4(),
            guard_sql: sql.to_string(),
            error_message: message.to_string(),
            rule_order: order,
            is_enabled: true,
        }
    }

    fn pk() -> ResolvedPk {
        ResolvedPk {
            name: "ORDER_NO".to_string(),
            sql_type: "varchar".to_string(),
            value: SqlValue::Text("A-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_first_true_guard_blocks_and_short_circuits() {
        let mut exec = ScriptedDatabase::new();
        let first = guard("SELECT COUNT(1) FROM [ORDER_LINE] WHERE [ORDER_NO]=@ORDER_NO", "has lines", 1);
        let second = guard("SELECT 1 FROM [INVOICE] WHERE [ORDER_NO]=@order_no", "invoiced", 2);
        exec.on_query("FROM [FORM_DELETE_GUARD]", vec![to_row(&first), to_row(&second)]);
        exec.on_query("FROM [ORDER_LINE]", vec![DbRow::from_pairs([("count", 2_i64)])]);

        let row = DbRow::from_pairs([("Order_No", "A-1")]);
        let err = check_delete_guards(&mut exec, first.form_field_master_id, &row, &pk())
            .await
            .unwrap_err();
        match err {
            FormError::DeleteBlocked(message) => assert_eq!(message, "has lines"),
            e => unreachable!("unexpected error in test: {e:?}"),
        }
        let evaluated = exec.statements_matching("[ORDER_LINE]");
        assert_eq!(evaluated[0].param("ORDER_NO"), Some(&SqlValue::Text("A-1".into())));
        assert!(exec.statements_matching("[INVOICE]").is_empty());
    }

    #[tokio::test]
    async fn test_false_guards_allow_delete() {
        let mut exec = ScriptedDatabase::new();
        let g = guard("SELECT 0", "never", 1);
        exec.on_query("FROM [FORM_DELETE_GUARD]", vec![to_row(&g)]);
        exec.on_query("SELECT 0", vec![DbRow::from_pairs([("x", 0)])]);
        let row = DbRow::from_pairs([("ORDER_NO", "A-1")]);
        check_delete_guards(&mut exec, g.form_field_master_id, &row, &pk())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_rejects_write_sql() {
        let (script, db) = db();
        let uc = ManageDeleteGuardsUseCase::new(db);
        let input = DeleteGuardInput {
            guard_sql: "UPDATE [ORDERS] SET [X]=1".to_string(),
            error_message: "nope".to_string(),
            rule_order: None,
            is_enabled: true,
        };
        let result = uc.create(Uuid::new_v4(), &input, &user()).await;
        assert!(matches!(result, Err(FormError::InvalidSql(_))));
        assert_eq!(script.begins(), 0);
    }
}
