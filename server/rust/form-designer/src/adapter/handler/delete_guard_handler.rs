use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use k1s0_server_common::ApiResponse;
use uuid::Uuid;

use crate::adapter::handler::error::AppError;
use crate::adapter::handler::AppState;
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::delete_guard::FormDeleteGuard;
use crate::usecase::manage_delete_guards::DeleteGuardInput;

pub async fn list_guards(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(form_id): Path<Uuid>,
) -> Result<ApiResponse<Vec<FormDeleteGuard>>, AppError> {
    Ok(ApiResponse::ok(state.delete_guards_uc.list(form_id, &user).await?))
}

pub async fn create_guard(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(form_id): Path<Uuid>,
    Json(input): Json<DeleteGuardInput>,
) -> Result<(StatusCode, ApiResponse<FormDeleteGuard>), AppError> {
    let guard = state.delete_guards_uc.create(form_id, &input, &user).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(guard)))
}

pub async fn delete_guard(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    state.delete_guards_uc.delete(id, &user).await?;
    Ok(ApiResponse::success())
}
