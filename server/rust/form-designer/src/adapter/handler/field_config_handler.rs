use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use k1s0_server_common::ApiResponse;
use serde::Deserialize;
use uuid::Uuid;

use crate::adapter::handler::error::AppError;
use crate::adapter::handler::AppState;
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::form_field_config::FormFieldConfig;
use crate::domain::entity::validation_rule::FormFieldValidationRule;
use crate::domain::value_object::TableSchemaQueryType;
use crate::usecase::manage_field_configs::UpdateFieldInput;
use crate::usecase::manage_validation_rules::ValidationRuleInput;

#[derive(Debug, Deserialize)]
pub struct ListFieldsQuery {
    pub role: Option<TableSchemaQueryType>,
}

pub async fn ensure_fields(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(master_id): Path<Uuid>,
) -> Result<ApiResponse<Vec<FormFieldConfig>>, AppError> {
    Ok(ApiResponse::ok(
        state.field_configs_uc.ensure_field_configs(master_id, &user).await?,
    ))
}

pub async fn list_fields(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(master_id): Path<Uuid>,
    Query(query): Query<ListFieldsQuery>,
) -> Result<ApiResponse<Vec<FormFieldConfig>>, AppError> {
    Ok(ApiResponse::ok(
        state.field_configs_uc.list(master_id, query.role, &user).await?,
    ))
}

pub async fn update_field(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateFieldInput>,
) -> Result<ApiResponse<FormFieldConfig>, AppError> {
    Ok(ApiResponse::ok(state.field_configs_uc.update_field(id, &input, &user).await?))
}

pub async fn delete_field(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    state.field_configs_uc.delete_field(id, &user).await?;
    Ok(ApiResponse::success())
}

pub async fn list_rules(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(field_id): Path<Uuid>,
) -> Result<ApiResponse<Vec<FormFieldValidationRule>>, AppError> {
    Ok(ApiResponse::ok(state.validation_rules_uc.list(field_id, &user).await?))
}

pub async fn create_rule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Json(input): Json<ValidationRuleInput>,
) -> Result<(StatusCode, ApiResponse<FormFieldValidationRule>), AppError> {
    let rule = state.validation_rules_uc.create(field_id, &input, &user).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(rule)))
}

pub async fn update_rule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ValidationRuleInput>,
) -> Result<ApiResponse<FormFieldValidationRule>, AppError> {
    Ok(ApiResponse::ok(state.validation_rules_uc.update(id, &input, &user).await?))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    state.validation_rules_uc.delete(id, &user).await?;
    Ok(ApiResponse::success())
}
