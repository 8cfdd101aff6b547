use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use k1s0_dynamic_sql::DbRow;
use k1s0_server_common::ApiResponse;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::adapter::handler::error::AppError;
use crate::adapter::handler::AppState;
use crate::domain::entity::current_user::CurrentUser;
use crate::usecase::form_data::{SearchRequest, SearchResult};
use crate::usecase::many_to_many::{BatchLinkRequest, BatchLinkResult, LinkPage, LinkPageRequest};
use crate::usecase::master_detail::{MasterDetailView, SaveMasterDetailRequest, SaveResult};

// --- 単一テーブル ---

pub async fn search(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(form_id): Path<Uuid>,
    Json(request): Json<SearchRequest>,
) -> Result<ApiResponse<SearchResult>, AppError> {
    Ok(ApiResponse::ok(state.form_data_uc.search(form_id, &request, &user).await?))
}

pub async fn get_row(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, id)): Path<(Uuid, String)>,
) -> Result<ApiResponse<DbRow>, AppError> {
    Ok(ApiResponse::ok(state.form_data_uc.get_row(form_id, &id, &user).await?))
}

pub async fn create_row(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(form_id): Path<Uuid>,
    Json(data): Json<Map<String, Value>>,
) -> Result<(StatusCode, ApiResponse<DbRow>), AppError> {
    let row = state.form_data_uc.create_row(form_id, &data, &user).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(row)))
}

pub async fn update_row(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, id)): Path<(Uuid, String)>,
    Json(data): Json<Map<String, Value>>,
) -> Result<ApiResponse<DbRow>, AppError> {
    Ok(ApiResponse::ok(
        state.form_data_uc.update_row(form_id, &id, &data, &user).await?,
    ))
}

pub async fn delete_row(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, id)): Path<(Uuid, String)>,
) -> Result<ApiResponse<()>, AppError> {
    state.form_data_uc.delete_row(form_id, &id, &user).await?;
    Ok(ApiResponse::success())
}

// --- マスタ / 明細 ---

pub async fn get_master_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, id)): Path<(Uuid, String)>,
) -> Result<ApiResponse<MasterDetailView>, AppError> {
    Ok(ApiResponse::ok(state.master_detail_uc.get(form_id, &id, &user).await?))
}

pub async fn save_master_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(form_id): Path<Uuid>,
    Json(request): Json<SaveMasterDetailRequest>,
) -> Result<ApiResponse<SaveResult>, AppError> {
    Ok(ApiResponse::ok(
        state.master_detail_uc.save(form_id, &request, &user).await?,
    ))
}

pub async fn delete_master_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, id)): Path<(Uuid, String)>,
) -> Result<ApiResponse<()>, AppError> {
    state.master_detail_uc.delete(form_id, &id, &user).await?;
    Ok(ApiResponse::success())
}

// --- 多対多 ---

pub async fn list_linked(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, base_id)): Path<(Uuid, String)>,
    Query(request): Query<LinkPageRequest>,
) -> Result<ApiResponse<LinkPage>, AppError> {
    Ok(ApiResponse::ok(
        state.many_to_many_uc.list_linked(form_id, &base_id, &request, &user).await?,
    ))
}

pub async fn list_unlinked(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, base_id)): Path<(Uuid, String)>,
    Query(request): Query<LinkPageRequest>,
) -> Result<ApiResponse<LinkPage>, AppError> {
    Ok(ApiResponse::ok(
        state.many_to_many_uc.list_unlinked(form_id, &base_id, &request, &user).await?,
    ))
}

pub async fn add_links(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, base_id)): Path<(Uuid, String)>,
    Json(request): Json<BatchLinkRequest>,
) -> Result<ApiResponse<BatchLinkResult>, AppError> {
    Ok(ApiResponse::ok(
        state.many_to_many_uc.batch_add(form_id, &base_id, &request, &user).await?,
    ))
}

pub async fn remove_links(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((form_id, base_id)): Path<(Uuid, String)>,
    Json(request): Json<BatchLinkRequest>,
) -> Result<ApiResponse<BatchLinkResult>, AppError> {
    Ok(ApiResponse::ok(
        state.many_to_many_uc.batch_remove(form_id, &base_id, &request, &user).await?,
    ))
}
