use std::sync::Arc;

use k1s0_server_common::Described;
use serde::Deserialize;
use uuid::Uuid;

use super::finish;
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::form_field_config::FormFieldConfig;
use crate::domain::entity::validation_rule::FormFieldValidationRule;
use crate::domain::error::{FieldError, FormError};
use crate::domain::service::check_rule_value;
use crate::domain::value_object::{allowed_validation_types, ValidationType};
use crate::infrastructure::database::{Database, SqlExecutor};
use crate::infrastructure::persistence::{field_config_store, validation_rule_store};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationRuleInput {
    pub validation_type: ValidationType,
    #[serde(default)]
    pub validation_value: Option<String>,
    #[serde(default)]
    pub message_zh: Option<String>,
    #[serde(default)]
    pub message_en: Option<String>,
    /// 未指定なら末尾に追加する。
    #[serde(default)]
    pub validation_order: Option<i32>,
}

/// ManageValidationRulesUseCase は項目ごとの検証ルールを管理する。
pub struct ManageValidationRulesUseCase {
    db: Arc<dyn Database>,
}

impl ManageValidationRulesUseCase {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        field_config_id: Uuid,
        user: &CurrentUser,
    ) -> Result<Vec<FormFieldValidationRule>, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        field_config_store::get(conn.as_mut(), field_config_id).await?;
        validation_rule_store::list_by_field(conn.as_mut(), field_config_id).await
    }

    pub async fn create(
        &self,
        field_config_id: Uuid,
        input: &ValidationRuleInput,
        user: &CurrentUser,
    ) -> Result<FormFieldValidationRule, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let config = field_config_store::get(exec, field_config_id).await?;
            check_input(&config, input)?;
            let order = match input.validation_order {
                Some(order) => order,
                None => next_order(exec, field_config_id).await?,
            };
            let rule = FormFieldValidationRule {
                id: Uuid::new_v4(),
                field_config_id,
                validation_type: input.validation_type,
                validation_value: trimmed(input.validation_value.as_deref()),
                message_zh: trimmed(input.message_zh.as_deref()),
                message_en: trimmed(input.message_en.as_deref()),
                validation_order: order,
            };
            validation_rule_store::insert(exec, &rule, user.actor()).await?;
            Ok(rule)
        }
        .await;
        finish(uow, result).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: &ValidationRuleInput,
        user: &CurrentUser,
    ) -> Result<FormFieldValidationRule, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let mut rule = validation_rule_store::get(exec, id).await?;
            let config = field_config_store::get(exec, rule.field_config_id).await?;
            check_input(&config, input)?;
            rule.validation_type = input.validation_type;
            rule.validation_value = trimmed(input.validation_value.as_deref());
            rule.message_zh = trimmed(input.message_zh.as_deref());
            rule.message_en = trimmed(input.message_en.as_deref());
            if let Some(order) = input.validation_order {
                rule.validation_order = order;
            }
            validation_rule_store::update(exec, &rule, user.actor()).await?;
            Ok(rule)
        }
        .await;
        finish(uow, result).await
    }

    pub async fn delete(&self, id: Uuid, user: &CurrentUser) -> Result<(), FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            validation_rule_store::get(exec, id).await?;
            validation_rule_store::soft_delete(exec, &[id], user.actor()).await?;
            Ok(())
        }
        .await;
        finish(uow, result).await
    }
}

/// コントロール種別で使える型か、値が型に合っているかを確認する。
fn check_input(config: &FormFieldConfig, input: &ValidationRuleInput) -> Result<(), FormError> {
    let allowed = allowed_validation_types(config.control_type);
    if !allowed.contains(&input.validation_type) {
        return Err(FormError::validation_with(
            format!(
                "{} rules are not available for {} controls",
                input.validation_type.code(),
                config.control_type.code()
            ),
            vec![FieldError::new("ValidationType", "not allowed for this control type")],
        ));
    }
    check_rule_value(input.validation_type, input.validation_value.as_deref()).map_err(|message| {
        FormError::validation_with(
            message.clone(),
            vec![FieldError::new("ValidationValue", message)],
        )
    })
}

async fn next_order(exec: &mut dyn SqlExecutor, field_config_id: Uuid) -> Result<i32, FormError> {
    let rules = validation_rule_store::list_by_field(exec, field_config_id).await?;
    Ok(rules.iter().map(|r| r.validation_order).max().unwrap_or(0) + 1)
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
