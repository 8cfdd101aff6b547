use std::sync::Arc;

use k1s0_dynamic_sql::{
    build_delete_where, build_exists_where, build_insert, safe_ident, DbRow, Fields, SqlStatement, SqlValue,
    WhereBuilder,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::form_data::{base_table, fetch_row, load_form};
use super::{finish, load_schema, page_offset};
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::form_field_master::FormFieldMaster;
use crate::domain::error::FormError;
use crate::domain::repository::SchemaRepository;
use crate::domain::service::TableSchema;
use crate::domain::value_object::FormFunctionType;
use crate::infrastructure::database::{Database, SqlExecutor};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 500;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkPageRequest {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkPage {
    pub rows: Vec<DbRow>,
    pub total: i64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchLinkRequest {
    pub target_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchLinkResult {
    pub affected: usize,
    /// 既に紐付いていた、または重複指定された件数。
    pub skipped: usize,
}

/// 多対多フォームを構成する 3 テーブルと中間テーブルの外部キー列。
struct Mapping {
    base: TableSchema,
    target: TableSchema,
    mapping: TableSchema,
    base_fk: String,
    target_fk: String,
}

/// ManyToManyUseCase は中間テーブルを介した基本行と対象行の紐付けを管理する。
pub struct ManyToManyUseCase {
    db: Arc<dyn Database>,
    schema_repo: Arc<dyn SchemaRepository>,
}

impl ManyToManyUseCase {
    pub fn new(db: Arc<dyn Database>, schema_repo: Arc<dyn SchemaRepository>) -> Self {
        Self { db, schema_repo }
    }

    async fn mapping(&self, master: &FormFieldMaster) -> Result<Mapping, FormError> {
        if master.function_type != FormFunctionType::MultipleMapping {
            return Err(FormError::validation(format!(
                "form '{}' is not a many-to-many form",
                master.form_name
            )));
        }
        let required = |value: &Option<String>, what: &str| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| FormError::validation(format!("form '{}' has no {what}", master.form_name)))
        };
        let mapping_table = required(&master.mapping_table_name, "mapping table")?;
        let target_table = required(&master.target_table_name, "target table")?;
        let base_fk = required(&master.mapping_base_fk_column, "mapping base key column")?;
        let target_fk = required(&master.mapping_target_fk_column, "mapping target key column")?;

        let base = load_schema(self.schema_repo.as_ref(), base_table(master)?).await?;
        let target = load_schema(self.schema_repo.as_ref(), &target_table).await?;
        let mapping = load_schema(self.schema_repo.as_ref(), &mapping_table).await?;
        for column in [&base_fk, &target_fk] {
            if mapping.column(column).is_none() {
                return Err(FormError::validation(format!("column {column} not found in {mapping_table}")));
            }
        }
        Ok(Mapping {
            base,
            target,
            mapping,
            base_fk,
            target_fk,
        })
    }

    /// 基本行に紐付いている対象行。
    pub async fn list_linked(
        &self,
        form_id: Uuid,
        base_id: &str,
        request: &LinkPageRequest,
        user: &CurrentUser,
    ) -> Result<LinkPage, FormError> {
        self.list(form_id, base_id, request, true, user).await
    }

    /// 基本行にまだ紐付いていない対象行。
    pub async fn list_unlinked(
        &self,
        form_id: Uuid,
        base_id: &str,
        request: &LinkPageRequest,
        user: &CurrentUser,
    ) -> Result<LinkPage, FormError> {
        self.list(form_id, base_id, request, false, user).await
    }

    async fn list(
        &self,
        form_id: Uuid,
        base_id: &str,
        request: &LinkPageRequest,
        linked: bool,
        user: &CurrentUser,
    ) -> Result<LinkPage, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        let exec = conn.as_mut();
        let master = load_form(exec, form_id).await?;
        let m = self.mapping(&master).await?;
        let base_pk = m.base.resolve_pk(base_id)?;
        let target_pk = m.target.require_primary_key()?.name.clone();

        let page = request.page.unwrap_or(1).max(1);
        let page_size = request
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = page_offset(page, page_size)?;

        let target_table = safe_ident(&m.target.table)?;
        let mapping_table = safe_ident(&m.mapping.table)?;
        let predicate = format!(
            "{}EXISTS (SELECT 1 FROM {mapping_table} WHERE {mapping_table}.{}=@base_id AND {mapping_table}.{}={target_table}.{})",
            if linked { "" } else { "NOT " },
            safe_ident(&m.base_fk)?,
            safe_ident(&m.target_fk)?,
            safe_ident(&target_pk)?,
        );
        let from = format!("FROM {target_table} WHERE {predicate}");
        let count = SqlStatement::new(format!("SELECT COUNT(1) {from}")).bind("base_id", base_pk.value.clone());
        let select = SqlStatement::new(format!(
            "SELECT * {from} ORDER BY {} ASC OFFSET {} ROWS FETCH NEXT {page_size} ROWS ONLY",
            safe_ident(&target_pk)?,
            offset,
        ))
        .bind("base_id", base_pk.value);

        let total = exec
            .query_scalar(&count)
            .await?
            .and_then(|v| v.as_text())
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let rows = exec.query(&select).await?;
        Ok(LinkPage {
            rows,
            total,
            page,
            page_size,
        })
    }

    /// 対象行をまとめて紐付ける。既存の紐付けは飛ばす。
    pub async fn batch_add(
        &self,
        form_id: Uuid,
        base_id: &str,
        request: &BatchLinkRequest,
        user: &CurrentUser,
    ) -> Result<BatchLinkResult, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = load_form(exec, form_id).await?;
            let m = self.mapping(&master).await?;
            let base_pk = m.base.resolve_pk(base_id)?;
            fetch_row(exec, &m.base, &base_pk).await?;

            let mut outcome = BatchLinkResult { affected: 0, skipped: 0 };
            let mut seen: Vec<SqlValue> = Vec::new();
            for raw in &request.target_ids {
                let target_pk = m.target.resolve_pk(raw)?;
                if seen.contains(&target_pk.value) {
                    outcome.skipped += 1;
                    continue;
                }
                seen.push(target_pk.value.clone());
                fetch_row(exec, &m.target, &target_pk).await?;

                let link = WhereBuilder::new()
                    .and_eq(&m.base_fk, base_pk.value.clone())
                    .and_eq(&m.target_fk, target_pk.value.clone());
                if exec.query_scalar(&build_exists_where(&m.mapping.table, link)?).await?.is_some() {
                    outcome.skipped += 1;
                    continue;
                }
                let fields = Fields::new()
                    .with(m.base_fk.clone(), base_pk.value.clone())
                    .with(m.target_fk.clone(), target_pk.value);
                insert_link(exec, &m.mapping, fields).await?;
                outcome.affected += 1;
            }
            Ok(outcome)
        }
        .await;
        let outcome = finish(uow, result).await?;
        info!(form_master_id = %form_id, base_id, added = outcome.affected, "targets linked");
        Ok(outcome)
    }

    /// 指定した対象行との紐付けを解除する。対象行自体は削除しない。
    pub async fn batch_remove(
        &self,
        form_id: Uuid,
        base_id: &str,
        request: &BatchLinkRequest,
        user: &CurrentUser,
    ) -> Result<BatchLinkResult, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = load_form(exec, form_id).await?;
            let m = self.mapping(&master).await?;
            let base_pk = m.base.resolve_pk(base_id)?;
            let mut targets: Vec<SqlValue> = Vec::with_capacity(request.target_ids.len());
            for raw in &request.target_ids {
                let value = m.target.resolve_pk(raw)?.value;
                if !targets.contains(&value) {
                    targets.push(value);
                }
            }
            if targets.is_empty() {
                return Ok(BatchLinkResult { affected: 0, skipped: 0 });
            }
            let requested = targets.len();
            let filter = WhereBuilder::new()
                .and_eq(&m.base_fk, base_pk.value)
                .and_in(&m.target_fk, targets);
            let affected = usize::try_from(exec.execute(&build_delete_where(&m.mapping.table, filter)?).await?)
                .unwrap_or(usize::MAX);
            Ok(BatchLinkResult {
                affected,
                skipped: requested.saturating_sub(affected),
            })
        }
        .await;
        let outcome = finish(uow, result).await?;
        info!(form_master_id = %form_id, base_id, removed = outcome.affected, "targets unlinked");
        Ok(outcome)
    }
}

/// 中間テーブルに 1 行追加する。独自の主キー列があれば値を生成する。
async fn insert_link(exec: &mut dyn SqlExecutor, mapping: &TableSchema, mut fields: Fields) -> Result<(), FormError> {
    if let Some(pk) = mapping.primary_key() {
        if !pk.is_identity && !fields.contains(&pk.name) {
            if let Some(value) = mapping.new_pk_value()? {
                fields.push(pk.name.clone(), value);
            }
        }
    }
    exec.execute(&build_insert(&mapping.table, &fields)?).await?;
    Ok(())
}
