use std::collections::HashMap;
use std::sync::Arc;

use k1s0_dynamic_sql::{
    build_delete_where, build_insert, build_insert_returning, build_update_where, convert,
    CompareOp, DbRow, Fields, ResolvedPk, SelectBuilder, SqlValue, WhereBuilder,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use super::manage_delete_guards::check_delete_guards;
use super::{finish, load_schema, page_offset};
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::form_field_config::FormFieldConfig;
use crate::domain::entity::form_field_master::FormFieldMaster;
use crate::domain::entity::validation_rule::FormFieldValidationRule;
use crate::domain::error::{FieldError, FormError};
use crate::domain::repository::SchemaRepository;
use crate::domain::service::{FieldValidator, TableSchema, WriteMode};
use crate::domain::value_object::{ConditionType, FormFieldStatus, TableSchemaQueryType};
use crate::infrastructure::database::{Database, SqlExecutor};
use crate::infrastructure::persistence::{field_config_store, form_master_store, validation_rule_store};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 500;

/// 検索条件 1 件。`condition` 未指定時は項目設定の条件を使う。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryCondition {
    pub column: String,
    #[serde(default)]
    pub condition: Option<ConditionType>,
    #[serde(default)]
    pub value: Value,
    /// Between の上限。
    #[serde(default)]
    pub value_to: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub conditions: Vec<QueryCondition>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_desc: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResult {
    pub rows: Vec<DbRow>,
    pub total: i64,
    pub page: u64,
    pub page_size: u64,
}

/// FormDataUseCase は単一テーブルフォームの業務データを読み書きする。
pub struct FormDataUseCase {
    db: Arc<dyn Database>,
    schema_repo: Arc<dyn SchemaRepository>,
}

impl FormDataUseCase {
    pub fn new(db: Arc<dyn Database>, schema_repo: Arc<dyn SchemaRepository>) -> Self {
        Self { db, schema_repo }
    }

    /// 検索可能な項目の条件だけで絞り込み、ページングして件数と共に返す。
    pub async fn search(
        &self,
        form_id: Uuid,
        request: &SearchRequest,
        user: &CurrentUser,
    ) -> Result<SearchResult, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        let exec = conn.as_mut();
        let master = load_form(exec, form_id).await?;
        let (table, role) = match master.view_table_name.as_deref() {
            Some(view) => (view.to_string(), TableSchemaQueryType::View),
            None => (base_table(&master)?.to_string(), TableSchemaQueryType::Table),
        };
        let schema = load_schema(self.schema_repo.as_ref(), &table).await?;
        let configs = field_config_store::list_by_master(exec, master.config_master_id(role)).await?;
        let filter = build_filter(&configs, &request.conditions)?;

        let page = request.page.unwrap_or(1).max(1);
        let page_size = request
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = page_offset(page, page_size)?;
        let (sort, desc) = sort_column(&schema, request.sort_by.as_deref(), request.sort_desc);

        let select = SelectBuilder::new(schema.table.as_str()).filter(filter);
        let total = scalar_i64(exec.query_scalar(&select.build_count()?).await?);
        let rows = exec
            .query(
                &select
                    .order_by(sort, desc)
                    .page(offset, page_size)
                    .build()?,
            )
            .await?;
        Ok(SearchResult {
            rows,
            total,
            page,
            page_size,
        })
    }

    pub async fn get_row(&self, form_id: Uuid, id: &str, user: &CurrentUser) -> Result<DbRow, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        let exec = conn.as_mut();
        let master = load_form(exec, form_id).await?;
        let schema = load_schema(self.schema_repo.as_ref(), base_table(&master)?).await?;
        let pk = schema.resolve_pk(id)?;
        fetch_row(exec, &schema, &pk).await
    }

    pub async fn create_row(
        &self,
        form_id: Uuid,
        data: &Map<String, Value>,
        user: &CurrentUser,
    ) -> Result<DbRow, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = load_form(exec, form_id).await?;
            let schema = load_schema(self.schema_repo.as_ref(), base_table(&master)?).await?;
            let rules = RowRules::load(exec, master.config_master_id(TableSchemaQueryType::Table)).await?;
            rules.validate(data, WriteMode::Insert)?;
            let pk = insert_row(exec, &schema, schema.to_fields(data, WriteMode::Insert)).await?;
            fetch_row(exec, &schema, &pk).await
        }
        .await;
        let row = finish(uow, result).await?;
        info!(form_master_id = %form_id, "row created");
        Ok(row)
    }

    pub async fn update_row(
        &self,
        form_id: Uuid,
        id: &str,
        data: &Map<String, Value>,
        user: &CurrentUser,
    ) -> Result<DbRow, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = load_form(exec, form_id).await?;
            let schema = load_schema(self.schema_repo.as_ref(), base_table(&master)?).await?;
            let pk = schema.resolve_pk(id)?;
            let rules = RowRules::load(exec, master.config_master_id(TableSchemaQueryType::Table)).await?;
            rules.validate(data, WriteMode::Update)?;
            let fields = rules.editable(schema.to_fields(data, WriteMode::Update));
            update_row_in(exec, &schema, &pk, &fields).await?;
            fetch_row(exec, &schema, &pk).await
        }
        .await;
        finish(uow, result).await
    }

    /// 削除ガードを評価してから行を削除する。
    pub async fn delete_row(&self, form_id: Uuid, id: &str, user: &CurrentUser) -> Result<(), FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = load_form(exec, form_id).await?;
            let schema = load_schema(self.schema_repo.as_ref(), base_table(&master)?).await?;
            let pk = schema.resolve_pk(id)?;
            let row = fetch_row(exec, &schema, &pk).await?;
            check_delete_guards(exec, master.id, &row, &pk).await?;
            delete_by_pk(exec, &schema, &pk).await
        }
        .await;
        finish(uow, result).await?;
        info!(form_master_id = %form_id, id, "row deleted");
        Ok(())
    }
}

/// 確定済みで、無効化されていないフォーム。
pub(crate) async fn load_form(exec: &mut dyn SqlExecutor, form_id: Uuid) -> Result<FormFieldMaster, FormError> {
    let master = form_master_store::get(exec, form_id).await?;
    if !master.is_finalized() {
        return Err(FormError::validation(format!("form '{}' is not finalized", master.form_name)));
    }
    if master.status == FormFieldStatus::Disabled {
        return Err(FormError::validation(format!("form '{}' is disabled", master.form_name)));
    }
    Ok(master)
}

pub(crate) fn base_table(master: &FormFieldMaster) -> Result<&str, FormError> {
    master
        .base_table_name
        .as_deref()
        .ok_or_else(|| FormError::validation(format!("form '{}' has no base table", master.form_name)))
}

/// 1 テーブル分の項目設定と検証ルール。
pub(crate) struct RowRules {
    configs: Vec<FormFieldConfig>,
    rules: HashMap<Uuid, Vec<FormFieldValidationRule>>,
}

impl RowRules {
    pub(crate) async fn load(exec: &mut dyn SqlExecutor, config_master_id: Uuid) -> Result<Self, FormError> {
        let configs = field_config_store::list_by_master(exec, config_master_id).await?;
        let ids: Vec<Uuid> = configs.iter().map(|c| c.id).collect();
        let mut rules: HashMap<Uuid, Vec<FormFieldValidationRule>> = HashMap::new();
        for rule in validation_rule_store::list_by_fields(exec, &ids).await? {
            rules.entry(rule.field_config_id).or_default().push(rule);
        }
        Ok(Self { configs, rules })
    }

    pub(crate) fn validate(&self, data: &Map<String, Value>, mode: WriteMode) -> Result<(), FormError> {
        let errors = FieldValidator::new(&self.configs, &self.rules).validate(data, mode);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FormError::validation_with("input is invalid", errors))
        }
    }

    /// 編集不可と設定された列を更新対象から外す。
    pub(crate) fn editable(&self, mut fields: Fields) -> Fields {
        for config in self.configs.iter().filter(|c| !c.is_editable) {
            fields.remove(&config.column_name);
        }
        fields
    }
}

/// 行を挿入して主キーを返す。自動採番でない主キーが無ければ生成する。
pub(crate) async fn insert_row(
    exec: &mut dyn SqlExecutor,
    schema: &TableSchema,
    mut fields: Fields,
) -> Result<ResolvedPk, FormError> {
    let pk_column = schema.require_primary_key()?;
    let resolved = |value: SqlValue| ResolvedPk {
        name: pk_column.name.clone(),
        sql_type: pk_column.data_type.clone(),
        value,
    };

    if pk_column.is_identity {
        let stmt = build_insert_returning(&schema.table, &fields, &pk_column.name)?;
        let value = exec
            .query_scalar(&stmt)
            .await?
            .ok_or_else(|| FormError::Internal(anyhow::anyhow!("insert into {} returned no key", schema.table)))?;
        return Ok(resolved(value));
    }

    let value = match fields.get(&pk_column.name) {
        Some(v) if !v.is_null() => v.clone(),
        _ => {
            let generated = schema.new_pk_value()?.unwrap_or(SqlValue::Null);
            fields.push(pk_column.name.clone(), generated.clone());
            generated
        }
    };
    exec.execute(&build_insert(&schema.table, &fields)?).await?;
    Ok(resolved(value))
}

pub(crate) async fn update_row_in(
    exec: &mut dyn SqlExecutor,
    schema: &TableSchema,
    pk: &ResolvedPk,
    fields: &Fields,
) -> Result<(), FormError> {
    update_row_scoped(exec, schema, pk, fields, WhereBuilder::new()).await
}

/// `scope` の条件と主キーの両方に一致する行だけを更新する。
pub(crate) async fn update_row_scoped(
    exec: &mut dyn SqlExecutor,
    schema: &TableSchema,
    pk: &ResolvedPk,
    fields: &Fields,
    scope: WhereBuilder,
) -> Result<(), FormError> {
    if fields.is_empty() {
        return Ok(());
    }
    let stmt = build_update_where(&schema.table, fields, scope.and_eq(&pk.name, pk.value.clone()))?;
    if exec.execute(&stmt).await? == 0 {
        return Err(FormError::not_found(&schema.table, pk.value.as_text().unwrap_or_default()));
    }
    Ok(())
}

pub(crate) async fn delete_by_pk(
    exec: &mut dyn SqlExecutor,
    schema: &TableSchema,
    pk: &ResolvedPk,
) -> Result<(), FormError> {
    let stmt = build_delete_where(&schema.table, WhereBuilder::new().and_eq(&pk.name, pk.value.clone()))?;
    if exec.execute(&stmt).await? == 0 {
        return Err(FormError::not_found(&schema.table, pk.value.as_text().unwrap_or_default()));
    }
    Ok(())
}

pub(crate) async fn fetch_row(
    exec: &mut dyn SqlExecutor,
    schema: &TableSchema,
    pk: &ResolvedPk,
) -> Result<DbRow, FormError> {
    let stmt = SelectBuilder::new(schema.table.as_str())
        .filter(WhereBuilder::new().and_eq(&pk.name, pk.value.clone()))
        .build()?;
    exec.query_one(&stmt)
        .await?
        .ok_or_else(|| FormError::not_found(&schema.table, pk.value.as_text().unwrap_or_default()))
}

/// 検索条件を WHERE に変換する。検索可能でない項目への条件は拒否する。
fn build_filter(configs: &[FormFieldConfig], conditions: &[QueryCondition]) -> Result<WhereBuilder, FormError> {
    let mut w = WhereBuilder::new();
    let mut rejected = Vec::new();
    for cond in conditions {
        let Some(config) = configs
            .iter()
            .find(|c| c.query_enabled && c.column_name.eq_ignore_ascii_case(&cond.column))
        else {
            rejected.push(FieldError::new(&cond.column, "column is not searchable"));
            continue;
        };
        let column = config.column_name.as_str();
        let kind = cond
            .condition
            .or(config.query_condition)
            .unwrap_or(ConditionType::Equal);
        let convert_value = |raw: &Value| match non_blank(raw) {
            None => Ok(None),
            Some(v) => match convert(&config.data_type, v) {
                SqlValue::Null => Err(FieldError::new(column, format!("'{v}' is not a valid {}", config.data_type))),
                converted => Ok(Some(converted)),
            },
        };
        let (value, value_to) = match (convert_value(&cond.value), convert_value(&cond.value_to)) {
            (Ok(value), Ok(value_to)) => (value, value_to),
            (Err(e), _) | (_, Err(e)) => {
                rejected.push(e);
                continue;
            }
        };
        w = match (kind, value, value_to) {
            (ConditionType::Between, Some(lo), Some(hi)) => w.and_between(column, lo, hi),
            (ConditionType::Between | ConditionType::GreaterThanOrEqual, Some(lo), _) => {
                w.and_compare(column, CompareOp::Ge, lo)
            }
            (ConditionType::Between, None, Some(hi)) => w.and_compare(column, CompareOp::Le, hi),
            (ConditionType::LessThanOrEqual, Some(hi), _) => w.and_compare(column, CompareOp::Le, hi),
            (ConditionType::Like, Some(v), _) => w.and_like(column, &v.as_text().unwrap_or_default()),
            (ConditionType::NotEqual, Some(v), _) => w.and_not_eq(column, v),
            (ConditionType::Equal, Some(v), _) => w.and_eq(column, v),
            // 値の無い条件は無視する
            _ => w,
        };
    }
    if rejected.is_empty() {
        Ok(w)
    } else {
        Err(FormError::validation_with("search conditions are invalid", rejected))
    }
}

fn non_blank(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        v => Some(v),
    }
}

/// 並び順の列。未知の列名は主キー（無ければ先頭列）に置き換える。
fn sort_column(schema: &TableSchema, requested: Option<&str>, desc: bool) -> (String, bool) {
    if let Some(column) = requested.and_then(|r| schema.column(r)) {
        return (column.name.clone(), desc);
    }
    let fallback = schema
        .primary_key()
        .or_else(|| schema.columns.first())
        .map(|c| c.name.clone())
        .unwrap_or_default();
    (fallback, false)
}

fn scalar_i64(value: Option<SqlValue>) -> i64 {
    match value {
        Some(SqlValue::Int(v)) => i64::from(v),
        Some(SqlValue::BigInt(v)) => v,
        Some(other) => other.as_text().and_then(|t| t.parse().ok()).unwrap_or(0),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::delete_guard::FormDeleteGuard;
    use crate::domain::value_object::{FormControlType, FormFunctionType, QueryComponentType};
    use crate::infrastructure::persistence::delete_guard_store;
    use crate::usecase::test_support::{col, config, db, finalized_master, schema_repo, user};
    use serde_json::json;

    fn items_repo() -> crate::domain::repository::schema_repository::MockSchemaRepository {
        schema_repo(vec![(
            "ITEMS",
            vec![
                col("ID", "uniqueidentifier", true, false),
                col("NAME", "nvarchar", false, false),
                col("QTY", "int", false, false),
            ],
        )])
    }

    fn searchable(master_id: Uuid, column: &str, data_type: &str, condition: ConditionType) -> FormFieldConfig {
        let mut c = config(master_id, "ITEMS", column, data_type, FormControlType::Text);
        c.query_enabled = true;
        c.query_component = Some(QueryComponentType::Input);
        c.query_condition = Some(condition);
        c
    }

    #[tokio::test]
    async fn test_search_pages_and_counts_with_searchable_conditions() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterMaintenance, "ITEMS", None, None);
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query(
            "FROM [FORM_FIELD_CONFIG]",
            vec![
                field_config_store::to_row(&searchable(master.id, "NAME", "nvarchar", ConditionType::Like)),
                field_config_store::to_row(&searchable(master.id, "QTY", "int", ConditionType::Between)),
            ],
        );
        script.on_query("SELECT COUNT(1) FROM [ITEMS]", vec![DbRow::from_pairs([("count", 42_i64)])]);
        script.on_query("SELECT * FROM [ITEMS]", vec![DbRow::from_pairs([("NAME", "bolt")])]);

        let uc = FormDataUseCase::new(db, Arc::new(items_repo()));
        let request = SearchRequest {
            conditions: vec![
                QueryCondition { column: "name".to_string(), condition: None, value: json!("bo"), value_to: Value::Null },
                QueryCondition { column: "QTY".to_string(), condition: None, value: json!(1), value_to: json!("9") },
            ],
            page: Some(3),
            page_size: Some(10),
            sort_by: Some("qty".to_string()),
            sort_desc: true,
        };
        let result = uc.search(master.id, &request, &user()).await.unwrap();
        assert_eq!(result.total, 42);
        assert_eq!(result.rows.len(), 1);

        let select = &script.statements_matching("SELECT * FROM [ITEMS]")[0];
        assert!(select.sql.contains("[NAME] LIKE @w_NAME"));
        assert!(select.sql.contains("[QTY] BETWEEN @w_QTY AND @w_QTY_1"));
        assert!(select.sql.ends_with("ORDER BY [QTY] DESC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"));
        assert_eq!(select.param("w_NAME"), Some(&SqlValue::Text("%bo%".into())));
        assert_eq!(select.param("w_QTY_1"), Some(&SqlValue::BigInt(9)));
    }

    #[tokio::test]
    async fn test_search_rejects_non_searchable_column() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterMaintenance, "ITEMS", None, None);
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query(
            "FROM [FORM_FIELD_CONFIG]",
            vec![field_config_store::to_row(&config(master.id, "ITEMS", "NAME", "nvarchar", FormControlType::Text))],
        );

        let uc = FormDataUseCase::new(db, Arc::new(items_repo()));
        let request = SearchRequest {
            conditions: vec![QueryCondition {
                column: "NAME".to_string(),
                condition: None,
                value: json!("x"),
                value_to: Value::Null,
            }],
            ..SearchRequest::default()
        };
        match uc.search(master.id, &request, &user()).await.unwrap_err() {
            FormError::Validation { details, .. } => assert_eq!(details[0].field, "NAME"),
            e => unreachable!("unexpected error in test: {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_rejects_page_past_offset_range() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterMaintenance, "ITEMS", None, None);
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query("FROM [FORM_FIELD_CONFIG]", vec![]);

        let uc = FormDataUseCase::new(db, Arc::new(items_repo()));
        let request = SearchRequest {
            page: Some(u64::MAX),
            ..SearchRequest::default()
        };
        let result = uc.search(master.id, &request, &user()).await;
        assert!(matches!(result, Err(FormError::Validation { .. })));
        assert!(script.statements_matching("FROM [ITEMS]").is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_value_not_matching_column_type() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterMaintenance, "ITEMS", None, None);
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query(
            "FROM [FORM_FIELD_CONFIG]",
            vec![field_config_store::to_row(&searchable(master.id, "QTY", "int", ConditionType::Equal))],
        );

        let uc = FormDataUseCase::new(db, Arc::new(items_repo()));
        let request = SearchRequest {
            conditions: vec![QueryCondition {
                column: "QTY".to_string(),
                condition: None,
                value: json!("abc"),
                value_to: Value::Null,
            }],
            ..SearchRequest::default()
        };
        match uc.search(master.id, &request, &user()).await.unwrap_err() {
            FormError::Validation { details, .. } => assert_eq!(details[0].field, "QTY"),
            e => unreachable!("unexpected error in test: {e:?}"),
        }
        assert!(script.statements_matching("FROM [ITEMS]").is_empty());
    }

    #[tokio::test]
    async fn test_create_generates_guid_key_and_enforces_required() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterMaintenance, "ITEMS", None, None);
        let mut name = config(master.id, "ITEMS", "NAME", "nvarchar", FormControlType::Text);
        name.is_required = true;
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query("FROM [FORM_FIELD_CONFIG]", vec![field_config_store::to_row(&name)]);
        let uc = FormDataUseCase::new(db, Arc::new(items_repo()));

        let missing = json!({ "QTY": 1 });
        let result = uc.create_row(master.id, missing.as_object().unwrap(), &user()).await;
        assert!(matches!(result, Err(FormError::Validation { .. })));
        assert!(script.statements_matching("INSERT INTO [ITEMS]").is_empty());

        script.on_query("SELECT * FROM [ITEMS]", vec![DbRow::from_pairs([("NAME", "bolt")])]);
        let data = json!({ "name": "bolt", "qty": "3", "ignored": true });
        uc.create_row(master.id, data.as_object().unwrap(), &user()).await.unwrap();
        let insert = &script.statements_matching("INSERT INTO [ITEMS]")[0];
        assert_eq!(insert.sql, "INSERT INTO [ITEMS] ([NAME],[QTY],[ID]) VALUES (@NAME,@QTY,@ID)");
        assert!(matches!(insert.param("ID"), Some(SqlValue::Guid(_))));
    }

    #[tokio::test]
    async fn test_update_skips_non_editable_columns() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterMaintenance, "ITEMS", None, None);
        let mut qty = config(master.id, "ITEMS", "QTY", "int", FormControlType::Number);
        qty.is_editable = false;
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query("FROM [FORM_FIELD_CONFIG]", vec![field_config_store::to_row(&qty)]);
        script.on_query("SELECT * FROM [ITEMS]", vec![DbRow::from_pairs([("NAME", "nut")])]);

        let uc = FormDataUseCase::new(db, Arc::new(items_repo()));
        let id = Uuid::new_v4().to_string();
        let data = json!({ "NAME": "nut", "QTY": 5 });
        uc.update_row(master.id, &id, data.as_object().unwrap(), &user()).await.unwrap();
        let update = &script.statements_matching("UPDATE [ITEMS]")[0];
        assert_eq!(update.sql, "UPDATE [ITEMS] SET [NAME]=@set_NAME WHERE [ID]=@w_ID");
    }

    #[tokio::test]
    async fn test_delete_blocked_by_guard_rolls_back() {
        let (script, db) = db();
        let master = finalized_master(FormFunctionType::MasterMaintenance, "ITEMS", None, None);
        let guard = FormDeleteGuard {
            id: Uuid::new_v4(),
            form_field_master_id: master.id,
            guard_sql: "SELECT 1 FROM [STOCK] WHERE [ITEM_ID]=@ID".to_string(),
            error_message: "item has stock".to_string(),
            rule_order: 1,
            is_enabled: true,
        };
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        script.on_query("SELECT * FROM [ITEMS]", vec![DbRow::from_pairs([("ID", Uuid::new_v4())])]);
        script.on_query("FROM [FORM_DELETE_GUARD]", vec![delete_guard_store::to_row(&guard)]);
        script.on_query("FROM [STOCK]", vec![DbRow::from_pairs([("x", 1)])]);

        let uc = FormDataUseCase::new(db, Arc::new(items_repo()));
        let result = uc.delete_row(master.id, &Uuid::new_v4().to_string(), &user()).await;
        match result.unwrap_err() {
            FormError::DeleteBlocked(message) => assert_eq!(message, "item has stock"),
            e => unreachable!("unexpected error in test: {e:?}"),
        }
        assert!(script.statements_matching("DELETE FROM [ITEMS]").is_empty());
        assert_eq!(script.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_draft_form_cannot_be_used_for_data() {
        let (script, db) = db();
        let draft = FormFieldMaster::new_draft(
            "items".to_string(),
            TableSchemaQueryType::Table,
            "ITEMS".to_string(),
            FormFunctionType::MasterMaintenance,
            "alice",
            crate::usecase::test_support::ts(),
        );
        script.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&draft)]);
        let uc = FormDataUseCase::new(db, Arc::new(items_repo()));
        let result = uc.get_row(draft.id, "x", &user()).await;
        assert!(matches!(result, Err(FormError::Validation { .. })));
    }
}
