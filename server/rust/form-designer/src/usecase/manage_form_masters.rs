use std::sync::Arc;

use k1s0_server_common::Described;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::manage_field_configs::{cascade_fields, ensure_configs};
use super::{finish, load_schema};
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::form_field_config::FormFieldConfig;
use crate::domain::entity::form_field_master::FormFieldMaster;
use crate::domain::error::{FieldError, FormError};
use crate::domain::repository::SchemaRepository;
use crate::domain::value_object::{FormFieldStatus, FormFunctionType, TableSchemaQueryType};
use crate::infrastructure::database::{Database, SqlExecutor};
use crate::infrastructure::persistence::form_master_store::{self, MasterFilter};
use crate::infrastructure::persistence::{delete_guard_store, field_config_store, now};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveHeaderInput {
    pub form_name: String,
    pub role: TableSchemaQueryType,
    pub table_name: String,
    pub function_type: FormFunctionType,
    /// 編集中の確定済みフォーム。重複名チェックから除外し、その下書きを再利用する。
    #[serde(default)]
    pub form_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FinalizeInput {
    #[serde(default)]
    pub form_id: Option<Uuid>,
    pub form_name: String,
    pub function_type: FormFunctionType,
    pub base_draft_id: Uuid,
    #[serde(default)]
    pub detail_draft_id: Option<Uuid>,
    #[serde(default)]
    pub view_draft_id: Option<Uuid>,
    #[serde(default)]
    pub mapping_draft_id: Option<Uuid>,
    #[serde(default)]
    pub target_table_name: Option<String>,
    #[serde(default)]
    pub mapping_base_fk_column: Option<String>,
    #[serde(default)]
    pub mapping_target_fk_column: Option<String>,
    #[serde(default)]
    pub detail_relation_column: Option<String>,
}

/// 下書きとその項目設定。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DraftView {
    pub master: FormFieldMaster,
    pub fields: Vec<FormFieldConfig>,
}

/// ManageFormMastersUseCase はフォーム定義（マスタ）の作成から確定・削除までを扱う。
pub struct ManageFormMastersUseCase {
    db: Arc<dyn Database>,
    schema_repo: Arc<dyn SchemaRepository>,
}

impl ManageFormMastersUseCase {
    pub fn new(db: Arc<dyn Database>, schema_repo: Arc<dyn SchemaRepository>) -> Self {
        Self { db, schema_repo }
    }

    pub async fn list(
        &self,
        filter: &MasterFilter,
        user: &CurrentUser,
    ) -> Result<Vec<FormFieldMaster>, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        form_master_store::list(conn.as_mut(), filter).await
    }

    pub async fn get(&self, id: Uuid, user: &CurrentUser) -> Result<FormFieldMaster, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        form_master_store::get(conn.as_mut(), id).await
    }

    pub async fn search_tables(
        &self,
        pattern: &str,
        query_type: TableSchemaQueryType,
    ) -> Result<Vec<String>, FormError> {
        Ok(self.schema_repo.search_tables(pattern.trim(), query_type).await?)
    }

    /// 役割ごとの下書きを取得または作成し、列設定を揃える。
    pub async fn save_header(
        &self,
        input: &SaveHeaderInput,
        user: &CurrentUser,
    ) -> Result<DraftView, FormError> {
        let form_name = required_name(&input.form_name)?;
        if input.role == TableSchemaQueryType::All {
            return Err(FormError::validation("a draft needs a concrete table role"));
        }
        let schema = load_schema(self.schema_repo.as_ref(), &input.table_name).await?;

        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            if form_master_store::form_name_exists(exec, &form_name, input.form_id).await? {
                return Err(FormError::DuplicateName(form_name.clone()));
            }
            let mut master = match self.editing_draft(exec, input, &schema.table).await? {
                Some(draft) => draft,
                None => match form_master_store::find_draft(exec, input.role, &schema.table).await? {
                    Some(draft) => draft,
                    None => {
                        let draft = FormFieldMaster::new_draft(
                            form_name.clone(),
                            input.role,
                            schema.table.clone(),
                            input.function_type,
                            user.actor(),
                            now(),
                        );
                        form_master_store::insert(exec, &draft).await?;
                        info!(form_master_id = %draft.id, table = %schema.table, "draft created");
                        draft
                    }
                },
            };
            if master.form_name != form_name || master.function_type != input.function_type {
                master.form_name = form_name.clone();
                master.function_type = input.function_type;
                let at = now();
                form_master_store::update(exec, &master, user.actor(), at).await?;
                master.touch(user.actor(), at);
            }
            let fields = ensure_configs(exec, self.schema_repo.as_ref(), &master, user.actor()).await?;
            Ok(DraftView { master, fields })
        }
        .await;
        finish(uow, result).await
    }

    /// 編集中フォームが同じテーブルの下書きを参照していればそれを返す。
    async fn editing_draft(
        &self,
        exec: &mut dyn SqlExecutor,
        input: &SaveHeaderInput,
        table: &str,
    ) -> Result<Option<FormFieldMaster>, FormError> {
        let Some(form_id) = input.form_id else {
            return Ok(None);
        };
        let form = form_master_store::get(exec, form_id).await?;
        let draft_id = form.config_master_id(input.role);
        if draft_id == form.id {
            return Ok(None);
        }
        let draft = form_master_store::find_by_id(exec, draft_id).await?;
        Ok(draft.filter(|d| {
            d.table_for(input.role)
                .is_some_and(|t| t.eq_ignore_ascii_case(table))
        }))
    }

    /// 下書きを束ねて確定済みフォームを作成（または更新）し、有効化する。
    pub async fn finalize(
        &self,
        input: &FinalizeInput,
        user: &CurrentUser,
    ) -> Result<FormFieldMaster, FormError> {
        let form_name = required_name(&input.form_name)?;
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            if form_master_store::form_name_exists(exec, &form_name, input.form_id).await? {
                return Err(FormError::DuplicateName(form_name.clone()));
            }
            let base = load_draft(exec, input.base_draft_id, TableSchemaQueryType::Table).await?;
            let detail = load_optional_draft(exec, input.detail_draft_id, TableSchemaQueryType::Detail).await?;
            let view = load_optional_draft(exec, input.view_draft_id, TableSchemaQueryType::View).await?;
            let mapping = load_optional_draft(exec, input.mapping_draft_id, TableSchemaQueryType::Mapping).await?;

            let mut master = match input.form_id {
                Some(id) => {
                    let existing = form_master_store::get(exec, id).await?;
                    if !existing.is_finalized() {
                        return Err(FormError::validation(format!("form master '{id}' is a draft")));
                    }
                    existing
                }
                None => FormFieldMaster::new_draft(
                    form_name.clone(),
                    TableSchemaQueryType::All,
                    String::new(),
                    input.function_type,
                    user.actor(),
                    now(),
                ),
            };
            master.form_name = form_name.clone();
            master.function_type = input.function_type;
            master.status = FormFieldStatus::Active;
            master.base_table_name = base.base_table_name.clone();
            master.base_table_id = Some(base.id);
            master.detail_table_name = detail.as_ref().and_then(|d| d.detail_table_name.clone());
            master.detail_table_id = detail.as_ref().map(|d| d.id);
            master.view_table_name = view.as_ref().and_then(|d| d.view_table_name.clone());
            master.view_table_id = view.as_ref().map(|d| d.id);
            master.mapping_table_name = mapping.as_ref().and_then(|d| d.mapping_table_name.clone());
            master.mapping_table_id = mapping.as_ref().map(|d| d.id);
            master.target_table_name = non_empty(input.target_table_name.as_deref());
            master.mapping_base_fk_column = non_empty(input.mapping_base_fk_column.as_deref());
            master.mapping_target_fk_column = non_empty(input.mapping_target_fk_column.as_deref());
            master.detail_relation_column = non_empty(input.detail_relation_column.as_deref());
            self.check_function_requirements(&master).await?;

            if input.form_id.is_some() {
                let at = now();
                form_master_store::update(exec, &master, user.actor(), at).await?;
                master.touch(user.actor(), at);
            } else {
                form_master_store::insert(exec, &master).await?;
            }
            Ok(master)
        }
        .await;
        let master = finish(uow, result).await?;
        info!(form_master_id = %master.id, form_name = %master.form_name, "form finalized");
        Ok(master)
    }

    /// 機能種別ごとに必要なテーブルと列が揃っているか。
    async fn check_function_requirements(&self, master: &FormFieldMaster) -> Result<(), FormError> {
        let mut details = Vec::new();
        match master.function_type {
            FormFunctionType::MasterMaintenance => {}
            FormFunctionType::MasterDetail => {
                match master.detail_table_name.as_deref() {
                    None => details.push(FieldError::new("DetailDraftId", "a detail table is required")),
                    Some(table) => {
                        if let Some(column) = master.detail_relation_column.as_deref() {
                            let schema = load_schema(self.schema_repo.as_ref(), table).await?;
                            if schema.column(column).is_none() {
                                details.push(FieldError::new(
                                    "DetailRelationColumn",
                                    format!("{table} has no column {column}"),
                                ));
                            }
                        }
                    }
                }
            }
            FormFunctionType::MultipleMapping => {
                if master.target_table_name.is_none() {
                    details.push(FieldError::new("TargetTableName", "a target table is required"));
                }
                match master.mapping_table_name.as_deref() {
                    None => details.push(FieldError::new("MappingDraftId", "a mapping table is required")),
                    Some(table) => {
                        let schema = load_schema(self.schema_repo.as_ref(), table).await?;
                        for (field, column) in [
                            ("MappingBaseFkColumn", master.mapping_base_fk_column.as_deref()),
                            ("MappingTargetFkColumn", master.mapping_target_fk_column.as_deref()),
                        ] {
                            match column {
                                None => details.push(FieldError::new(field, "column is required")),
                                Some(c) if schema.column(c).is_none() => {
                                    details.push(FieldError::new(field, format!("{table} has no column {c}")));
                                }
                                Some(_) => {}
                            }
                        }
                    }
                }
            }
            FormFunctionType::TableValueFunction => {
                if master.view_table_name.is_none() {
                    details.push(FieldError::new("ViewDraftId", "a table-valued function is required"));
                }
            }
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(FormError::validation_with(
                format!("form is incomplete for {}", master.function_type.code()),
                details,
            ))
        }
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: FormFieldStatus,
        user: &CurrentUser,
    ) -> Result<FormFieldMaster, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let mut master = form_master_store::get(exec, id).await?;
            if !master.is_finalized() {
                return Err(FormError::validation("status can only be changed on a finalized form"));
            }
            master.status = status;
            let at = now();
            form_master_store::update(exec, &master, user.actor(), at).await?;
            master.touch(user.actor(), at);
            Ok(master)
        }
        .await;
        finish(uow, result).await
    }

    /// フォームと、その下書き・項目設定・検証ルール・ドロップダウン・削除ガードを論理削除する。
    pub async fn delete(&self, id: Uuid, user: &CurrentUser) -> Result<(), FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = form_master_store::get(exec, id).await?;
            cascade_masters(exec, &form_master_store::owned_master_ids(&master), user.actor()).await
        }
        .await;
        finish(uow, result).await?;
        info!(form_master_id = %id, "form master deleted");
        Ok(())
    }
}

/// マスタ群と従属する設定行をまとめて論理削除する。
pub(crate) async fn cascade_masters(
    exec: &mut dyn SqlExecutor,
    master_ids: &[Uuid],
    actor: &str,
) -> Result<(), FormError> {
    let field_ids = field_config_store::ids_by_masters(exec, master_ids).await?;
    cascade_fields(exec, &field_ids, actor).await?;
    delete_guard_store::soft_delete_by_masters(exec, master_ids, actor).await?;
    form_master_store::soft_delete(exec, master_ids, actor).await?;
    Ok(())
}

fn required_name(name: &str) -> Result<String, FormError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FormError::validation_with(
            "form name is required",
            vec![FieldError::new("FormName", "form name is required")],
        ));
    }
    Ok(name.to_string())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

async fn load_draft(
    exec: &mut dyn SqlExecutor,
    id: Uuid,
    role: TableSchemaQueryType,
) -> Result<FormFieldMaster, FormError> {
    let draft = form_master_store::get(exec, id).await?;
    if draft.schema_type != role {
        return Err(FormError::validation(format!(
            "form master '{id}' is not a {} draft",
            role.code()
        )));
    }
    Ok(draft)
}

async fn load_optional_draft(
    exec: &mut dyn SqlExecutor,
    id: Option<Uuid>,
    role: TableSchemaQueryType,
) -> Result<Option<FormFieldMaster>, FormError> {
    match id {
        Some(id) => Ok(Some(load_draft(exec, id, role).await?)),
        None => Ok(None),
    }
}
