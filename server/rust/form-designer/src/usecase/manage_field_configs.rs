use std::sync::Arc;

use k1s0_server_common::Described;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{finish, load_schema};
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::form_field_config::FormFieldConfig;
use crate::domain::entity::form_field_master::FormFieldMaster;
use crate::domain::error::{FieldError, FormError};
use crate::domain::repository::SchemaRepository;
use crate::domain::value_object::{
    allowed_validation_types, control_type_whitelist, is_control_allowed, ConditionType,
    FormControlType, QueryComponentType, TableSchemaQueryType,
};
use crate::infrastructure::database::{Database, SqlExecutor};
use crate::infrastructure::persistence::{
    dropdown_store, field_config_store, form_master_store, now, validation_rule_store,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateFieldInput {
    pub control_type: FormControlType,
    pub is_visible: bool,
    pub is_editable: bool,
    pub is_required: bool,
    #[serde(default)]
    pub query_enabled: bool,
    #[serde(default)]
    pub query_component: Option<QueryComponentType>,
    #[serde(default)]
    pub query_condition: Option<ConditionType>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub field_order: Option<i32>,
}

/// ManageFieldConfigsUseCase はフォームに公開する列の設定を管理する。
pub struct ManageFieldConfigsUseCase {
    db: Arc<dyn Database>,
    schema_repo: Arc<dyn SchemaRepository>,
}

impl ManageFieldConfigsUseCase {
    pub fn new(db: Arc<dyn Database>, schema_repo: Arc<dyn SchemaRepository>) -> Self {
        Self { db, schema_repo }
    }

    /// 実テーブルにあって設定の無い列の設定行を作成し、全設定を返す。
    pub async fn ensure_field_configs(
        &self,
        master_id: Uuid,
        user: &CurrentUser,
    ) -> Result<Vec<FormFieldConfig>, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let master = form_master_store::get(uow.executor(), master_id).await?;
            ensure_configs(uow.executor(), self.schema_repo.as_ref(), &master, user.actor()).await
        }
        .await;
        finish(uow, result).await
    }

    /// 設定一覧。確定済みフォームでは `role` の下書きが持つ設定を返す。
    pub async fn list(
        &self,
        master_id: Uuid,
        role: Option<TableSchemaQueryType>,
        user: &CurrentUser,
    ) -> Result<Vec<FormFieldConfig>, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        let master = form_master_store::get(conn.as_mut(), master_id).await?;
        let role = role.unwrap_or(master.schema_type);
        field_config_store::list_by_master(conn.as_mut(), master.config_master_id(role)).await
    }

    pub async fn update_field(
        &self,
        id: Uuid,
        input: &UpdateFieldInput,
        user: &CurrentUser,
    ) -> Result<FormFieldConfig, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = update_in(uow.executor(), id, input, user.actor()).await;
        finish(uow, result).await
    }

    pub async fn delete_field(&self, id: Uuid, user: &CurrentUser) -> Result<(), FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            field_config_store::get(uow.executor(), id).await?;
            cascade_fields(uow.executor(), &[id], user.actor()).await
        }
        .await;
        finish(uow, result).await?;
        info!(field_config_id = %id, "field config deleted");
        Ok(())
    }
}

async fn update_in(
    exec: &mut dyn SqlExecutor,
    id: Uuid,
    input: &UpdateFieldInput,
    actor: &str,
) -> Result<FormFieldConfig, FormError> {
    let mut config = field_config_store::get(exec, id).await?;
    if !is_control_allowed(&config.data_type, input.control_type) {
        let allowed: Vec<&str> = control_type_whitelist(&config.data_type)
            .iter()
            .map(|c| c.code())
            .collect();
        return Err(FormError::validation_with(
            format!(
                "control type {} is not allowed for column {}",
                input.control_type.code(),
                config.column_name
            ),
            vec![FieldError::new(
                "ControlType",
                format!("{} columns accept {}", config.data_type, allowed.join(", ")),
            )],
        ));
    }

    let previous = config.control_type;
    config.control_type = input.control_type;
    config.is_visible = input.is_visible;
    config.is_editable = input.is_editable;
    config.is_required = input.is_required;
    config.query_enabled = input.query_enabled;
    if input.query_enabled {
        config.query_component = Some(input.query_component.unwrap_or(QueryComponentType::Input));
        config.query_condition = Some(input.query_condition.unwrap_or(ConditionType::Equal));
    } else {
        config.query_component = None;
        config.query_condition = None;
    }
    config.display_name = input.display_name.clone().filter(|n| !n.trim().is_empty());
    if let Some(order) = input.field_order {
        config.field_order = order;
    }

    if previous != config.control_type {
        // 新しいコントロールで使えない検証ルールを外す
        let allowed = allowed_validation_types(config.control_type);
        let stale: Vec<Uuid> = validation_rule_store::list_by_field(exec, id)
            .await?
            .into_iter()
            .filter(|r| !allowed.contains(&r.validation_type))
            .map(|r| r.id)
            .collect();
        validation_rule_store::soft_delete(exec, &stale, actor).await?;

        if previous == FormControlType::Dropdown {
            let dropdowns = dropdown_store::ids_by_fields(exec, &[id]).await?;
            dropdown_store::soft_delete_options_by_dropdowns(exec, &dropdowns, actor).await?;
            dropdown_store::soft_delete(exec, &dropdowns, actor).await?;
        }
    }

    let at = now();
    field_config_store::update(exec, &config, actor, at).await?;
    config.edit_user = Some(actor.to_string());
    config.edit_time = Some(at);
    Ok(config)
}

/// 下書きの対象テーブルの列から、不足している設定行を作る。
pub(crate) async fn ensure_configs(
    exec: &mut dyn SqlExecutor,
    schema_repo: &dyn SchemaRepository,
    master: &FormFieldMaster,
    actor: &str,
) -> Result<Vec<FormFieldConfig>, FormError> {
    let table = master
        .table_for(master.schema_type)
        .ok_or_else(|| FormError::validation("form master has no table for its role"))?
        .to_string();
    let schema = load_schema(schema_repo, &table).await?;
    let mut configs = field_config_store::list_by_master(exec, master.id).await?;
    let mut next_order = configs.iter().map(|c| c.field_order).max().unwrap_or(0);

    let at = now();
    let mut created = 0usize;
    for column in &schema.columns {
        if configs
            .iter()
            .any(|c| c.column_name.eq_ignore_ascii_case(&column.name))
        {
            continue;
        }
        next_order += 1;
        let config = FormFieldConfig {
            id: Uuid::new_v4(),
            form_field_master_id: master.id,
            table_name: schema.table.clone(),
            column_name: column.name.clone(),
            data_type: column.data_type.clone(),
            control_type: control_type_whitelist(&column.data_type)
                .first()
                .copied()
                .unwrap_or(FormControlType::Text),
            is_visible: true,
            is_editable: !column.is_identity,
            is_required: !column.is_nullable && !column.is_identity,
            query_enabled: false,
            query_component: None,
            query_condition: None,
            display_name: None,
            field_order: next_order,
            create_user: actor.to_string(),
            create_time: at,
            edit_user: None,
            edit_time: None,
        };
        field_config_store::insert(exec, &config).await?;
        configs.push(config);
        created += 1;
    }
    if created > 0 {
        info!(form_master_id = %master.id, table = %table, created, "field configs created");
    }
    Ok(configs)
}

/// 項目設定と、その検証ルール・ドロップダウン・選択肢を論理削除する。
pub(crate) async fn cascade_fields(
    exec: &mut dyn SqlExecutor,
    field_ids: &[Uuid],
    actor: &str,
) -> Result<(), FormError> {
    if field_ids.is_empty() {
        return Ok(());
    }
    let dropdowns = dropdown_store::ids_by_fields(exec, field_ids).await?;
    dropdown_store::soft_delete_options_by_dropdowns(exec, &dropdowns, actor).await?;
    dropdown_store::soft_delete(exec, &dropdowns, actor).await?;
    validation_rule_store::soft_delete_by_fields(exec, field_ids, actor).await?;
    field_config_store::soft_delete(exec, field_ids, actor).await?;
    Ok(())
}
