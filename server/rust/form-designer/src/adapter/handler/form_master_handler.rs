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
use crate::domain::entity::form_field_master::FormFieldMaster;
use crate::domain::value_object::{FormFieldStatus, FormFunctionType, TableSchemaQueryType};
use crate::infrastructure::persistence::form_master_store::MasterFilter;
use crate::usecase::manage_form_masters::{DraftView, FinalizeInput, SaveHeaderInput};

#[derive(Debug, Deserialize)]
pub struct ListFormsQuery {
    pub form_name: Option<String>,
    pub schema_type: Option<TableSchemaQueryType>,
    pub status: Option<FormFieldStatus>,
    pub function_type: Option<FormFunctionType>,
}

#[derive(Debug, Deserialize)]
pub struct SearchTablesQuery {
    #[serde(default)]
    pub pattern: String,
    #[serde(default = "default_query_type")]
    pub query_type: TableSchemaQueryType,
}

fn default_query_type() -> TableSchemaQueryType {
    TableSchemaQueryType::Table
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetStatusRequest {
    pub status: FormFieldStatus,
}

pub async fn list_forms(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListFormsQuery>,
) -> Result<ApiResponse<Vec<FormFieldMaster>>, AppError> {
    let filter = MasterFilter {
        form_name: query.form_name,
        schema_type: query.schema_type,
        status: query.status,
        function_type: query.function_type,
    };
    Ok(ApiResponse::ok(state.form_masters_uc.list(&filter, &user).await?))
}

pub async fn get_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<FormFieldMaster>, AppError> {
    Ok(ApiResponse::ok(state.form_masters_uc.get(id, &user).await?))
}

pub async fn search_tables(
    State(state): State<AppState>,
    Query(query): Query<SearchTablesQuery>,
) -> Result<ApiResponse<Vec<String>>, AppError> {
    let tables = state
        .form_masters_uc
        .search_tables(&query.pattern, query.query_type)
        .await?;
    Ok(ApiResponse::ok(tables))
}

pub async fn save_header(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<SaveHeaderInput>,
) -> Result<ApiResponse<DraftView>, AppError> {
    Ok(ApiResponse::ok(state.form_masters_uc.save_header(&input, &user).await?))
}

pub async fn finalize(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<FinalizeInput>,
) -> Result<(StatusCode, ApiResponse<FormFieldMaster>), AppError> {
    let status = if input.form_id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let master = state.form_masters_uc.finalize(&input, &user).await?;
    Ok((status, ApiResponse::ok(master)))
}

pub async fn set_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SetStatusRequest>,
) -> Result<ApiResponse<FormFieldMaster>, AppError> {
    Ok(ApiResponse::ok(
        state.form_masters_uc.set_status(id, input.status, &user).await?,
    ))
}

pub async fn delete_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    state.form_masters_uc.delete(id, &user).await?;
    Ok(ApiResponse::success())
}
