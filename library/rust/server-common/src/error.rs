//! Structured service errors and error dumps.
//!
//! Every error response uses the [`ApiResponse`] envelope. `Code` is always a
//! [`ReturnCode`] name; `ErrorData` carries either field details or an
//! [`ErrorDump`] of the failing error chain.
//!
//! The dump is meant for an internal tool on a trusted network.

use serde::Serialize;

use crate::descriptor::Described;
use crate::envelope::ApiResponse;
use crate::return_code::ReturnCode;

/// Maximum number of chained sources recorded in a dump.
const MAX_DUMP_DEPTH: usize = 16;

/// ErrorDump is a serializable snapshot of an error and its source chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDump {
    pub r#type: String,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner: Option<Box<ErrorDump>>,
}

impl ErrorDump {
    /// Dumps `err` and its `source()` chain.
    ///
    /// The chain stops at [`MAX_DUMP_DEPTH`] or when a source repeats.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain: Vec<&(dyn std::error::Error + 'static)> = vec![err];
        let mut seen: Vec<*const ()> = vec![std::ptr::from_ref(err).cast::<()>()];
        let mut current = err.source();
        while let Some(source) = current {
            let ptr = std::ptr::from_ref(source).cast::<()>();
            if chain.len() >= MAX_DUMP_DEPTH || seen.contains(&ptr) {
                break;
            }
            seen.push(ptr);
            chain.push(source);
            current = source.source();
        }

        chain.into_iter().rev().fold(None, |inner, e| {
            Some(ErrorDump {
                r#type: type_label(e),
                message: e.to_string(),
                data: serde_json::Map::new(),
                inner: inner.map(Box::new),
            })
        })
        .unwrap_or_else(|| ErrorDump::new("Error", err.to_string()))
    }

    pub fn new(r#type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            message: message.into(),
            data: serde_json::Map::new(),
            inner: None,
        }
    }

    /// Attaches an extra field such as the failing SQL text.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Variant name taken from the Debug form, e.g. `Database(..)` -> `Database`.
fn type_label(err: &dyn std::error::Error) -> String {
    let debug = format!("{err:?}");
    let end = debug
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .unwrap_or(debug.len());
    if end == 0 {
        "Error".to_string()
    } else {
        debug[..end].to_string()
    }
}

/// ServiceError is a high-level error type that maps to HTTP status codes.
///
/// When the `axum` feature is enabled, ServiceError implements `IntoResponse`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// 400 Bad Request
    #[error("{message}")]
    BadRequest {
        code: ReturnCode,
        message: String,
        error_data: Option<serde_json::Value>,
    },

    /// 401 Unauthorized
    #[error("{message}")]
    Unauthorized { code: ReturnCode, message: String },

    /// 403 Forbidden
    #[error("{message}")]
    Forbidden { code: ReturnCode, message: String },

    /// 404 Not Found
    #[error("{message}")]
    NotFound { code: ReturnCode, message: String },

    /// 409 Conflict
    #[error("{message}")]
    Conflict { code: ReturnCode, message: String },

    /// 422 Unprocessable Entity (business rule violation)
    #[error("{message}")]
    UnprocessableEntity {
        code: ReturnCode,
        message: String,
        error_data: Option<serde_json::Value>,
    },

    /// 500 Internal Server Error
    #[error("{message}")]
    Internal {
        code: ReturnCode,
        message: String,
        error_data: Option<serde_json::Value>,
    },
}

impl ServiceError {
    pub fn bad_request(code: ReturnCode, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
            error_data: None,
        }
    }

    pub fn validation(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::BadRequest {
            code: ReturnCode::ValidationError,
            message: message.into(),
            error_data: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: ReturnCode::Unauthorized,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: ReturnCode::Forbidden,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            code: ReturnCode::NotFound,
            message: message.into(),
        }
    }

    pub fn conflict(code: ReturnCode, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn unprocessable_entity(code: ReturnCode, message: impl Into<String>) -> Self {
        Self::UnprocessableEntity {
            code,
            message: message.into(),
            error_data: None,
        }
    }

    /// 500 with `DatabaseError` and a dump of `err`.
    pub fn database(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::database_dump(ErrorDump::from_error(err))
    }

    /// 500 with `DatabaseError` and a caller-built dump, e.g. one carrying the SQL text.
    pub fn database_dump(dump: ErrorDump) -> Self {
        Self::Internal {
            code: ReturnCode::DatabaseError,
            message: ReturnCode::DatabaseError.display_name().to_string(),
            error_data: Some(dump.to_value()),
        }
    }

    /// 500 with `UnhandledException` and a dump of `err`.
    pub fn unhandled(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::Internal {
            code: ReturnCode::UnhandledException,
            message: ReturnCode::UnhandledException.display_name().to_string(),
            error_data: Some(ErrorDump::from_error(err).to_value()),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::BadRequest { .. } => 400,
            ServiceError::Unauthorized { .. } => 401,
            ServiceError::Forbidden { .. } => 403,
            ServiceError::NotFound { .. } => 404,
            ServiceError::Conflict { .. } => 409,
            ServiceError::UnprocessableEntity { .. } => 422,
            ServiceError::Internal { .. } => 500,
        }
    }

    pub fn code(&self) -> ReturnCode {
        match self {
            ServiceError::BadRequest { code, .. }
            | ServiceError::Unauthorized { code, .. }
            | ServiceError::Forbidden { code, .. }
            | ServiceError::NotFound { code, .. }
            | ServiceError::Conflict { code, .. }
            | ServiceError::UnprocessableEntity { code, .. }
            | ServiceError::Internal { code, .. } => *code,
        }
    }

    /// Convert to the response envelope.
    pub fn to_response(&self) -> ApiResponse<()> {
        let response = ApiResponse::fail(self.code(), self.to_string());
        match self {
            ServiceError::BadRequest { error_data, .. }
            | ServiceError::UnprocessableEntity { error_data, .. }
            | ServiceError::Internal { error_data, .. } => match error_data {
                Some(data) => response.with_error_data(data.clone()),
                None => response,
            },
            _ => response,
        }
    }
}

// --- axum integration ---

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self.to_response())).into_response()
    }
}
