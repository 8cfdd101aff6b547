use k1s0_dynamic_sql::{PkError, ReadOnlySqlError, SqlBuildError};
use serde::Serialize;

use crate::infrastructure::database::DbError;

/// 項目単位の検証エラー。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },

    #[error("form name '{0}' already exists")]
    DuplicateName(String),

    #[error("{0}")]
    DeleteBlocked(String),

    #[error(transparent)]
    InvalidSql(#[from] ReadOnlySqlError),

    #[error(transparent)]
    SqlBuild(#[from] SqlBuildError),

    #[error(transparent)]
    Pk(#[from] PkError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FormError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        FormError::NotFound(format!("{what} '{id}' not found"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        FormError::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn validation_with(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        FormError::Validation {
            message: message.into(),
            details,
        }
    }
}
