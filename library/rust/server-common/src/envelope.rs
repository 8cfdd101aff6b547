//! Response envelope shared by every endpoint.

use serde::Serialize;

use crate::descriptor::Described;
use crate::return_code::ReturnCode;

/// ApiResponse serializes as `{ IsSuccess, Code, Message, Data?, ErrorData? }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiResponse<T> {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            is_success: true,
            code: ReturnCode::Success.code().to_string(),
            message: ReturnCode::Success.display_name().to_string(),
            data: Some(data),
            error_data: None,
        }
    }

    pub fn fail(code: ReturnCode, message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            code: code.code().to_string(),
            message: message.into(),
            data: None,
            error_data: None,
        }
    }

    #[must_use]
    pub fn with_error_data(mut self, error_data: serde_json::Value) -> Self {
        self.error_data = Some(error_data);
        self
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn success() -> Self {
        Self {
            data: None,
            ..Self::ok(())
        }
    }
}

#[cfg(feature = "axum")]
impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        axum::Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(json["IsSuccess"], true);
        assert_eq!(json["Code"], "Success");
        assert_eq!(json["Data"], serde_json::json!([1, 2]));
        assert!(json.get("ErrorData").is_none());
    }

    #[test]
    fn test_success_has_no_data() {
        let json = serde_json::to_value(ApiResponse::success()).unwrap();
        assert!(json.get("Data").is_none());
    }

    #[test]
    fn test_fail_envelope() {
        let resp: ApiResponse<()> = ApiResponse::fail(ReturnCode::DeleteBlocked, "in use")
            .with_error_data(serde_json::json!({"Guard": 1}));
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["IsSuccess"], false);
        assert_eq!(json["Code"], "DeleteBlocked");
        assert_eq!(json["Message"], "in use");
        assert_eq!(json["ErrorData"]["Guard"], 1);
    }
}
