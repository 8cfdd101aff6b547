use std::collections::BTreeMap;

use axum::{extract::Path, extract::State, http::StatusCode};
use k1s0_server_common::{ApiResponse, Described, EnumDescriptor, ReturnCode};

use crate::adapter::handler::error::AppError;
use crate::adapter::handler::AppState;
use crate::domain::value_object::{
    ConditionType, FormControlType, FormFieldStatus, FormFunctionType, QueryComponentType,
    TableSchemaQueryType, ValidationType,
};
use crate::usecase::orphan_cleanup::CleanupOutcome;

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match state.db.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// クライアントに公開する列挙型。
fn enum_table() -> BTreeMap<&'static str, Vec<EnumDescriptor>> {
    fn entry<T: Described>() -> (&'static str, Vec<EnumDescriptor>) {
        (T::TYPE_NAME, T::descriptors())
    }
    BTreeMap::from([
        entry::<FormControlType>(),
        entry::<FormFieldStatus>(),
        entry::<FormFunctionType>(),
        entry::<TableSchemaQueryType>(),
        entry::<ValidationType>(),
        entry::<QueryComponentType>(),
        entry::<ConditionType>(),
        entry::<ReturnCode>(),
    ])
}

pub async fn enum_list() -> ApiResponse<BTreeMap<&'static str, Vec<EnumDescriptor>>> {
    ApiResponse::ok(enum_table())
}

pub async fn enum_by_name(Path(name): Path<String>) -> Result<ApiResponse<Vec<EnumDescriptor>>, AppError> {
    enum_table()
        .into_iter()
        .find(|(type_name, _)| type_name.eq_ignore_ascii_case(&name))
        .map(|(_, descriptors)| ApiResponse::ok(descriptors))
        .ok_or_else(|| AppError(k1s0_server_common::ServiceError::not_found(format!("enum '{name}' not found"))))
}

/// 孤立下書きの掃除を手動で実行する。定期実行と同じく、実行中なら何もしない。
pub async fn run_orphan_cleanup(State(state): State<AppState>) -> Result<ApiResponse<CleanupOutcome>, AppError> {
    Ok(ApiResponse::ok(state.orphan_cleanup_uc.run().await?))
}
