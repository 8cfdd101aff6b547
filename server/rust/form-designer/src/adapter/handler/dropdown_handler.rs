use axum::{
    extract::{Path, State},
    Json,
};
use k1s0_server_common::ApiResponse;
use serde::Deserialize;
use uuid::Uuid;

use crate::adapter::handler::error::AppError;
use crate::adapter::handler::AppState;
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::dropdown::DropdownOption;
use crate::usecase::manage_dropdowns::{DropdownView, OptionPreview, StaticOptionInput, SyncResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SqlRequest {
    #[serde(default)]
    pub sql: Option<String>,
}

pub async fn get_or_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(field_id): Path<Uuid>,
) -> Result<ApiResponse<DropdownView>, AppError> {
    Ok(ApiResponse::ok(state.dropdowns_uc.get_or_create(field_id, &user).await?))
}

pub async fn list_options(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Vec<DropdownOption>>, AppError> {
    Ok(ApiResponse::ok(state.dropdowns_uc.list_options(id, &user).await?))
}

pub async fn replace_options(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(options): Json<Vec<StaticOptionInput>>,
) -> Result<ApiResponse<Vec<DropdownOption>>, AppError> {
    Ok(ApiResponse::ok(
        state.dropdowns_uc.replace_static_options(id, &options, &user).await?,
    ))
}

pub async fn preview_sql(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<SqlRequest>,
) -> Result<ApiResponse<Vec<OptionPreview>>, AppError> {
    let sql = input.sql.unwrap_or_default();
    Ok(ApiResponse::ok(state.dropdowns_uc.preview_sql(&sql, &user).await?))
}

/// `Sql` を指定すると保存済みの SQL を置き換えてから同期する。
pub async fn sync(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SqlRequest>,
) -> Result<ApiResponse<SyncResult>, AppError> {
    Ok(ApiResponse::ok(
        state.dropdowns_uc.sync(id, input.sql.as_deref(), &user).await?,
    ))
}

pub async fn sync_all(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(form_id): Path<Uuid>,
) -> Result<ApiResponse<Vec<SyncResult>>, AppError> {
    Ok(ApiResponse::ok(state.dropdowns_uc.sync_all(form_id, &user).await?))
}
