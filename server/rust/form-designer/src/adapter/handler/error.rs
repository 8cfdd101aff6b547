use axum::response::{IntoResponse, Response};
use k1s0_server_common::{ErrorDump, ReturnCode, ServiceError};

use crate::domain::error::FormError;
use crate::infrastructure::database::DbError;

/// AppError はハンドラーが返すエラー。`ServiceError` の封筒形式で応答する。
#[derive(Debug)]
pub struct AppError(pub ServiceError);

impl AppError {
    pub fn unauthorized(message: &str) -> Self {
        Self(ServiceError::unauthorized(message))
    }

    pub fn forbidden(message: &str) -> Self {
        Self(ServiceError::forbidden(message))
    }

    pub fn bad_request(code: ReturnCode, message: &str) -> Self {
        Self(ServiceError::bad_request(code, message))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<FormError> for AppError {
    fn from(err: FormError) -> Self {
        let service = match &err {
            FormError::NotFound(message) => ServiceError::not_found(message),
            FormError::Validation { message, details } => {
                ServiceError::validation(message, serde_json::to_value(details).unwrap_or_default())
            }
            FormError::DuplicateName(_) => ServiceError::conflict(ReturnCode::DataAlreadyExists, err.to_string()),
            FormError::DeleteBlocked(message) => ServiceError::conflict(ReturnCode::DeleteBlocked, message),
            FormError::InvalidSql(e) => ServiceError::bad_request(ReturnCode::InvalidSql, e.to_string()),
            FormError::SqlBuild(e) => ServiceError::bad_request(ReturnCode::InvalidIdentifier, e.to_string()),
            FormError::Pk(e) => ServiceError::bad_request(ReturnCode::UnsupportedType, e.to_string()),
            FormError::Database(e) => {
                tracing::error!(error = %e, "database error");
                ServiceError::database_dump(database_dump(e))
            }
            FormError::Internal(e) => {
                tracing::error!(error = %e, "unhandled error");
                ServiceError::unhandled(&**e)
            }
        };
        Self(service)
    }
}

/// DB エラーのダンプ。ドライバーのエラーなら SQLSTATE・制約・テーブル・SQL 本文を添える。
fn database_dump(err: &DbError) -> ErrorDump {
    let mut dump = ErrorDump::from_error(err);
    let (sql, source) = match err {
        DbError::Statement { sql, source } => (Some(sql.as_str()), source),
        DbError::Driver(source) => (None, source),
        _ => return dump,
    };
    if let Some(sql) = sql {
        dump = dump.with_data("Sql", sql);
    }
    if let sqlx::Error::Database(db) = source {
        if let Some(code) = db.code() {
            dump = dump.with_data("SqlState", code.into_owned());
        }
        if let Some(constraint) = db.constraint() {
            dump = dump.with_data("Constraint", constraint);
        }
        if let Some(table) = db.table() {
            dump = dump.with_data("Table", table);
        }
    }
    dump
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "unhandled error");
        Self(ServiceError::unhandled(&*err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}
