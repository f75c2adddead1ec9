//! Shared API types and error handling
//!
//! Request and response bodies for every endpoint, plus the [`ApiError`]
//! type whose JSON body all error responses share.

use axum::{http::StatusCode, response::Json};
use email_hygiene_core::ValidationResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Query parameters for `GET /v1/validate`
#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub email: Option<String>,
}

/// Request body for `POST /v1/validate`
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub email: String,
    /// Optional request ID for tracking
    pub request_id: Option<String>,
}

/// Single validation response: the full result plus a request ID
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub result: ValidationResult,
}

/// Request body for `POST /v1/validate/batch`
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub emails: Vec<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub request_id: String,
    pub count: usize,
    /// One result per input email, in input order
    pub results: Vec<ValidationResult>,
}

/// Contact event delivered by the CRM
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub contact_id: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub request_id: String,
    pub contact_id: String,
    /// Whether the verdict was written back to the contact
    pub crm_updated: bool,
    #[serde(flatten)]
    pub result: ValidationResult,
}

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    pub request_id: String,
    pub timestamp: String,
}

/// Result type for API handlers
pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("batch of {got} emails exceeds the limit of {max}")]
    BatchTooLarge { got: usize, max: usize },
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::BatchTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "BATCH_TOO_LARGE"),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = self.status_and_code();

        let error_response = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            request_id: new_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(error_response)).into_response()
    }
}

pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Use the caller's request ID when it supplied a non-empty one
pub fn request_id_or_new(supplied: Option<String>) -> String {
    supplied
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use email_hygiene_core::ValidationStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_id_fallback() {
        assert_eq!(request_id_or_new(Some("req-1".to_string())), "req-1");
        assert_eq!(request_id_or_new(Some("  ".to_string())).len(), 36);
        assert_eq!(request_id_or_new(None).len(), 36);
    }

    #[test]
    fn test_error_status_codes() {
        let response = ApiError::BatchTooLarge { got: 101, max: 100 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = ApiError::InvalidRequest("missing email".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validate_response_is_flat() {
        let response = ValidateResponse {
            request_id: "req-1".to_string(),
            result: ValidationResult::failure("a@b.com", "boom"),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["request_id"], "req-1");
        assert_eq!(value["status"], "check_failed");
        assert_eq!(value["correction_type"], serde_json::Value::Null);

        let back: ValidateResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back.result.status, ValidationStatus::CheckFailed);
    }
}
