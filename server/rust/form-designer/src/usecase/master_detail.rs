use std::collections::HashSet;
use std::sync::Arc;

use k1s0_dynamic_sql::{build_delete_where, DbRow, ResolvedPk, SelectBuilder, SqlValue, WhereBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use super::form_data::{base_table, fetch_row, insert_row, load_form, update_row_in, update_row_scoped, RowRules};
use super::manage_delete_guards::check_delete_guards;
use super::{finish, load_schema};
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::form_field_master::FormFieldMaster;
use crate::domain::error::{FieldError, FormError};
use crate::domain::repository::SchemaRepository;
use crate::domain::service::{TableSchema, WriteMode};
use crate::domain::value_object::{FormFunctionType, TableSchemaQueryType};
use crate::infrastructure::database::{Database, SqlExecutor};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveMasterDetailRequest {
    /// 既存の親行の主キー。未指定なら新規作成。
    #[serde(default)]
    pub id: Option<String>,
    pub master: Map<String, Value>,
    #[serde(default)]
    pub details: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MasterDetailView {
    pub master: DbRow,
    pub details: Vec<DbRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveResult {
    pub id: SqlValue,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// 親テーブルと明細テーブルの両方のスキーマと、明細が親を参照する列。
struct Tables {
    parent: TableSchema,
    detail: TableSchema,
    relation: Vec<String>,
}

/// MasterDetailUseCase は親行と明細行を 1 トランザクションで読み書きする。
pub struct MasterDetailUseCase {
    db: Arc<dyn Database>,
    schema_repo: Arc<dyn SchemaRepository>,
    relation_suffixes: Vec<String>,
}

impl MasterDetailUseCase {
    pub fn new(
        db: Arc<dyn Database>,
        schema_repo: Arc<dyn SchemaRepository>,
        relation_suffixes: Vec<String>,
    ) -> Self {
        Self {
            db,
            schema_repo,
            relation_suffixes,
        }
    }

    async fn tables(&self, master: &FormFieldMaster) -> Result<Tables, FormError> {
        if master.function_type != FormFunctionType::MasterDetail {
            return Err(FormError::validation(format!(
                "form '{}' is not a master/detail form",
                master.form_name
            )));
        }
        let detail_table = master
            .detail_table_name
            .as_deref()
            .ok_or_else(|| FormError::validation(format!("form '{}' has no detail table", master.form_name)))?;
        let parent = load_schema(self.schema_repo.as_ref(), base_table(master)?).await?;
        let detail = load_schema(self.schema_repo.as_ref(), detail_table).await?;
        let relation = detail.relation_columns(
            &parent,
            master.detail_relation_column.as_deref(),
            &self.relation_suffixes,
        );
        if relation.is_empty() {
            return Err(FormError::validation(format!(
                "no column of {} refers to {}",
                detail.table, parent.table
            )));
        }
        Ok(Tables {
            parent,
            detail,
            relation,
        })
    }

    pub async fn get(&self, form_id: Uuid, id: &str, user: &CurrentUser) -> Result<MasterDetailView, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        let exec = conn.as_mut();
        let master = load_form(exec, form_id).await?;
        let tables = self.tables(&master).await?;
        let pk = tables.parent.resolve_pk(id)?;
        let parent_row = fetch_row(exec, &tables.parent, &pk).await?;
        let links = link_values(&tables, &parent_row, &pk);

        let mut select = SelectBuilder::new(tables.detail.table.as_str()).filter(link_filter(&links));
        if let Some(detail_pk) = tables.detail.primary_key() {
            select = select.order_by(detail_pk.name.as_str(), false);
        }
        let details = exec.query(&select.build()?).await?;
        Ok(MasterDetailView {
            master: parent_row,
            details,
        })
    }

    /// 親行を保存し、明細を送信内容に合わせる。
    ///
    /// 親 → 明細削除 → 明細更新 → 明細追加 の順で同じ作業単位に発行する。
    /// 送信されなかった既存明細は削除される。
    pub async fn save(
        &self,
        form_id: Uuid,
        request: &SaveMasterDetailRequest,
        user: &CurrentUser,
    ) -> Result<SaveResult, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = load_form(exec, form_id).await?;
            let tables = self.tables(&master).await?;
            let parent_rules = RowRules::load(exec, master.config_master_id(TableSchemaQueryType::Table)).await?;
            let detail_rules = RowRules::load(exec, master.config_master_id(TableSchemaQueryType::Detail)).await?;

            let parent_mode = if request.id.is_some() { WriteMode::Update } else { WriteMode::Insert };
            let mut errors = match parent_rules.validate(&request.master, parent_mode) {
                Err(FormError::Validation { details, .. }) => details,
                Err(e) => return Err(e),
                Ok(()) => Vec::new(),
            };
            let detail_pk = tables.detail.require_primary_key()?.name.clone();
            let mut submitted = Vec::with_capacity(request.details.len());
            for (i, row) in request.details.iter().enumerate() {
                let key = match row_key(row, &detail_pk) {
                    Some(raw) => Some(tables.detail.resolve_pk(&raw)?),
                    None => None,
                };
                let mode = if key.is_some() { WriteMode::Update } else { WriteMode::Insert };
                if let Err(FormError::Validation { details, .. }) = detail_rules.validate(row, mode) {
                    errors.extend(
                        details
                            .into_iter()
                            .map(|e| FieldError::new(format!("Details[{i}].{}", e.field), e.message)),
                    );
                }
                submitted.push((key, row));
            }
            if !errors.is_empty() {
                return Err(FormError::validation_with("input is invalid", errors));
            }

            // 親
            let pk = match request.id.as_deref() {
                Some(id) => {
                    let pk = tables.parent.resolve_pk(id)?;
                    let fields = parent_rules.editable(tables.parent.to_fields(&request.master, WriteMode::Update));
                    update_row_in(exec, &tables.parent, &pk, &fields).await?;
                    pk
                }
                None => {
                    insert_row(exec, &tables.parent, tables.parent.to_fields(&request.master, WriteMode::Insert))
                        .await?
                }
            };
            let parent_row = fetch_row(exec, &tables.parent, &pk).await?;
            let links = link_values(&tables, &parent_row, &pk);

            // 明細
            let existing = existing_keys(exec, &tables, &links).await?;
            let kept: HashSet<String> = submitted
                .iter()
                .filter_map(|(key, _)| key.as_ref().map(|k| key_text(&k.value)))
                .collect();
            let removed: Vec<SqlValue> = existing
                .iter()
                .filter(|v| !kept.contains(&key_text(v)))
                .cloned()
                .collect();
            let mut outcome = SaveResult {
                id: pk.value.clone(),
                inserted: 0,
                updated: 0,
                deleted: 0,
            };
            if !removed.is_empty() {
                let filter = link_filter(&links).and_in(&detail_pk, removed.iter().cloned());
                let stmt = build_delete_where(&tables.detail.table, filter)?;
                outcome.deleted = usize::try_from(exec.execute(&stmt).await?).unwrap_or(usize::MAX);
            }

            let existing: HashSet<String> = existing.iter().map(key_text).collect();
            let mut inserts = Vec::new();
            for (key, row) in &submitted {
                match key {
                    Some(key) if existing.contains(&key_text(&key.value)) => {
                        let mut fields = detail_rules.editable(tables.detail.to_fields(row, WriteMode::Update));
                        for (column, value) in &links {
                            fields.push(column.clone(), value.clone());
                        }
                        update_row_scoped(exec, &tables.detail, key, &fields, link_filter(&links)).await?;
                        outcome.updated += 1;
                    }
                    _ => inserts.push(*row),
                }
            }
            for row in inserts {
                let mut fields = tables.detail.to_fields(row, WriteMode::Insert);
                for (column, value) in &links {
                    fields.push(column.clone(), value.clone());
                }
                insert_row(exec, &tables.detail, fields).await?;
                outcome.inserted += 1;
            }
            Ok(outcome)
        }
        .await;
        let outcome = finish(uow, result).await?;
        info!(
            form_master_id = %form_id,
            inserted = outcome.inserted,
            updated = outcome.updated,
            deleted = outcome.deleted,
            "master/detail saved"
        );
        Ok(outcome)
    }

    /// 削除ガードを評価し、明細、親の順に削除する。
    pub async fn delete(&self, form_id: Uuid, id: &str, user: &CurrentUser) -> Result<(), FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = load_form(exec, form_id).await?;
            let tables = self.tables(&master).await?;
            let pk = tables.parent.resolve_pk(id)?;
            let parent_row = fetch_row(exec, &tables.parent, &pk).await?;
            check_delete_guards(exec, master.id, &parent_row, &pk).await?;

            let links = link_values(&tables, &parent_row, &pk);
            exec.execute(&build_delete_where(&tables.detail.table, link_filter(&links))?)
                .await?;
            super::form_data::delete_by_pk(exec, &tables.parent, &pk).await
        }
        .await;
        finish(uow, result).await?;
        info!(form_master_id = %form_id, id, "master/detail deleted");
        Ok(())
    }
}

/// 明細の参照列ごとの値。親に同名列があればその値、無ければ親の主キー。
fn link_values(tables: &Tables, parent_row: &DbRow, pk: &ResolvedPk) -> Vec<(String, SqlValue)> {
    tables
        .relation
        .iter()
        .map(|column| {
            let value = parent_row
                .get(column)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| pk.value.clone());
            (column.clone(), value)
        })
        .collect()
}

fn link_filter(links: &[(String, SqlValue)]) -> WhereBuilder {
    links
        .iter()
        .fold(WhereBuilder::new(), |w, (column, value)| w.and_eq(column, value.clone()))
}

async fn existing_keys(
    exec: &mut dyn SqlExecutor,
    tables: &Tables,
    links: &[(String, SqlValue)],
) -> Result<Vec<SqlValue>, FormError> {
    let detail_pk = tables.detail.require_primary_key()?;
    let stmt = SelectBuilder::new(tables.detail.table.as_str())
        .columns([detail_pk.name.as_str()])
        .filter(link_filter(links))
        .build()?;
    Ok(exec
        .query(&stmt)
        .await?
        .iter()
        .filter_map(|row| row.get(&detail_pk.name).cloned())
        .filter(|v| !v.is_null())
        .collect())
}

/// 送信行の主キー値。空なら新規行。
fn row_key(row: &Map<String, Value>, pk: &str) -> Option<String> {
    let value = row.iter().find(|(k, _)| k.eq_ignore_ascii_case(pk)).map(|(_, v)| v)?;
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn key_text(value: &SqlValue) -> String {
    value.as_text().unwrap_or_default().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::form_master_store;
    use crate::usecase::test_support::{col, db, finalized_master, schema_repo, user};
    use serde_json::json;

    fn repo() -> crate::domain::repository::schema_repository::MockSchemaRepository {
        schema_repo(vec![
            (
                "ORDER_HEAD",
                vec![col("ORDER_NO", "varchar", true, false), col("CUSTOMER", "nvarchar", false, false)],
            ),
            (
                "ORDER_LINE",
                vec![
                    col("LINE_ID", "uniqueidentifier", true, false),
                    col("ORDER_NO", "varchar", false, false),
                    col("QTY", "int", false, false),
                ],
            ),
        ])
    }

    fn use_case(db: Arc<crate::infrastructure::database::scripted::ScriptedDatabase>) -> MasterDetailUseCase {
        MasterDetailUseCase::new(db, Arc::new(repo()), vec!["_NO".to_string()])
    }

    #[tokio::test]
    async fn test_save_deletes_omitted_detail_only() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterDetail, "ORDER_HEAD", Some("ORDER_LINE"), None);
        let kept = Uuid::new_v4();
        let omitted = Uuid::new_v4();
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query(
            "SELECT * FROM [ORDER_HEAD]",
            vec![DbRow::from_pairs([("ORDER_NO", "A-1"), ("CUSTOMER", "acme")])],
        );
        script.on_query(
            "SELECT [LINE_ID] FROM [ORDER_LINE]",
            vec![
                DbRow::from_pairs([("LINE_ID", kept)]),
                DbRow::from_pairs([("LINE_ID", omitted)]),
            ],
        );

        let request = SaveMasterDetailRequest {
            id: Some("A-1".to_string()),
            master: json!({ "CUSTOMER": "acme" }).as_object().cloned().unwrap(),
            details: vec![json!({ "LINE_ID": kept.to_string(), "QTY": 2 }).as_object().cloned().unwrap()],
        };
        let result = use_case(db).save(master.id, &request, &user()).await.unwrap();
        assert_eq!(result, SaveResult {
            id: SqlValue::Text("A-1".to_string()),
            inserted: 0,
            updated: 1,
            deleted: 1,
        });

        let deletes = script.statements_matching("DELETE FROM [ORDER_LINE]");
        assert_eq!(deletes.len(), 1);
        assert_eq!(
            deletes[0].sql,
            "DELETE FROM [ORDER_LINE] WHERE [ORDER_NO]=@w_ORDER_NO AND [LINE_ID] IN (@w_LINE_ID)"
        );
        assert_eq!(deletes[0].param("w_LINE_ID"), Some(&SqlValue::Guid(omitted)));
        assert_eq!(deletes[0].param("w_ORDER_NO"), Some(&SqlValue::Text("A-1".into())));

        let updates = script.statements_matching("UPDATE [ORDER_LINE]");
        assert_eq!(updates.len(), 1);
        assert!(updates[0].sql.ends_with("WHERE [ORDER_NO]=@w_ORDER_NO AND [LINE_ID]=@w_LINE_ID"));
        assert_eq!(updates[0].param("w_ORDER_NO"), Some(&SqlValue::Text("A-1".into())));
        assert_eq!(updates[0].param("w_LINE_ID"), Some(&SqlValue::Guid(kept)));
        assert!(script.statements_matching("INSERT").is_empty());
        assert!(script.statements_matching("DELETE FROM [ORDER_HEAD]").is_empty());

        // 親 → 削除 → 更新 の順
        let sql: Vec<String> = script.statements().into_iter().map(|s| s.sql).collect();
        let head = sql.iter().position(|s| s.starts_with("UPDATE [ORDER_HEAD]")).unwrap();
        let delete = sql.iter().position(|s| s.starts_with("DELETE FROM [ORDER_LINE]")).unwrap();
        let update = sql.iter().position(|s| s.starts_with("UPDATE [ORDER_LINE]")).unwrap();
        assert!(head < delete && delete < update);
        assert_eq!(script.commits(), 1);
    }

    #[tokio::test]
    async fn test_save_new_master_links_inserted_details() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterDetail, "ORDER_HEAD", Some("ORDER_LINE"), None);
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query(
            "SELECT * FROM [ORDER_HEAD]",
            vec![DbRow::from_pairs([("ORDER_NO", "B-7"), ("CUSTOMER", "acme")])],
        );

        let request = SaveMasterDetailRequest {
            id: None,
            master: json!({ "ORDER_NO": "B-7", "CUSTOMER": "acme" }).as_object().cloned().unwrap(),
            details: vec![
                json!({ "QTY": 1 }).as_object().cloned().unwrap(),
                json!({ "QTY": 2, "LINE_ID": "" }).as_object().cloned().unwrap(),
            ],
        };
        let result = use_case(db).save(master.id, &request, &user()).await.unwrap();
        assert_eq!(result.inserted, 2);
        assert_eq!(result.deleted, 0);

        let inserts = script.statements_matching("INSERT INTO [ORDER_LINE]");
        assert_eq!(inserts.len(), 2);
        for insert in inserts {
            assert_eq!(insert.param("ORDER_NO"), Some(&SqlValue::Text("B-7".into())));
            assert!(matches!(insert.param("LINE_ID"), Some(SqlValue::Guid(_))));
        }
    }

    #[tokio::test]
    async fn test_save_on_single_table_form_is_rejected() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterMaintenance, "ORDER_HEAD", None, None);
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        let request = SaveMasterDetailRequest {
            id: None,
            master: Map::new(),
            details: Vec::new(),
        };
        let result = use_case(db).save(master.id, &request, &user()).await;
        assert!(matches!(result, Err(FormError::Validation { .. })));
        assert_eq!(script.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_details_then_master() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterDetail, "ORDER_HEAD", Some("ORDER_LINE"), None);
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query("SELECT * FROM [ORDER_HEAD]", vec![DbRow::from_pairs([("ORDER_NO", "A-1")])]);

        use_case(db).delete(master.id, "A-1", &user()).await.unwrap();
        let sql: Vec<String> = script.statements().into_iter().map(|s| s.sql).collect();
        let lines = sql.iter().position(|s| s.starts_with("DELETE FROM [ORDER_LINE]")).unwrap();
        let head = sql.iter().position(|s| s.starts_with("DELETE FROM [ORDER_HEAD]")).unwrap();
        assert!(lines < head);
    }
}
